//! Stateful `<think>…</think>` stream transducer: swallows content
//! between a matching open and close tag, tolerates the tags being split across
//! chunk boundaries by holding back a small trailing window instead of scanning
//! each chunk in isolation, and discards the newline immediately following a
//! close tag.

const OPEN_TAG: &str = "<think>";
const CLOSE_TAG: &str = "</think>";
const TRAILING_WINDOW_CHARS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InsideThink,
}

/// Feed text chunks in with [`Self::push`]; call [`Self::flush`] once the
/// underlying stream ends to release anything still held in the trailing window.
pub struct ThinkFilter {
    state: State,
    buffer: String,
    swallow_newline: bool,
}

impl Default for ThinkFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkFilter {
    pub fn new() -> Self {
        Self {
            state: State::Normal,
            buffer: String::new(),
            swallow_newline: false,
        }
    }

    /// Returns the visible (non-thinking) text released by this chunk, which may
    /// be empty if everything so far is held in the trailing window or inside a
    /// think region.
    pub fn push(&mut self, chunk: &str) -> String {
        self.buffer.push_str(chunk);
        let mut out = String::new();

        loop {
            match self.state {
                State::Normal => {
                    if self.swallow_newline {
                        if self.buffer.is_empty() {
                            break;
                        }
                        if let Some(rest) = self.buffer.strip_prefix("\r\n") {
                            self.buffer = rest.to_string();
                        } else if let Some(rest) = self.buffer.strip_prefix('\n') {
                            self.buffer = rest.to_string();
                        }
                        self.swallow_newline = false;
                        continue;
                    }

                    match self.buffer.find(OPEN_TAG) {
                        Some(idx) => {
                            out.push_str(&self.buffer[..idx]);
                            self.buffer = self.buffer[idx + OPEN_TAG.len()..].to_string();
                            self.state = State::InsideThink;
                        }
                        None => {
                            let keep = trailing_window_bytes(&self.buffer, TRAILING_WINDOW_CHARS);
                            let flush_len = self.buffer.len() - keep;
                            out.push_str(&self.buffer[..flush_len]);
                            self.buffer = self.buffer[flush_len..].to_string();
                            break;
                        }
                    }
                }
                State::InsideThink => match self.buffer.find(CLOSE_TAG) {
                    Some(idx) => {
                        self.buffer = self.buffer[idx + CLOSE_TAG.len()..].to_string();
                        self.state = State::Normal;
                        self.swallow_newline = true;
                    }
                    None => {
                        let keep = trailing_window_bytes(&self.buffer, TRAILING_WINDOW_CHARS);
                        let discard_len = self.buffer.len() - keep;
                        self.buffer = self.buffer[discard_len..].to_string();
                        break;
                    }
                },
            }
        }

        out
    }

    /// Releases whatever remains held back once the underlying stream has ended.
    /// Content still inside an unterminated think region is discarded rather than
    /// surfaced, since it was never closed.
    pub fn flush(&mut self) -> String {
        let released = match self.state {
            State::Normal => std::mem::take(&mut self.buffer),
            State::InsideThink => {
                self.buffer.clear();
                String::new()
            }
        };
        self.swallow_newline = false;
        released
    }
}

fn trailing_window_bytes(s: &str, max_chars: usize) -> usize {
    let mut bytes = 0;
    for ch in s.chars().rev().take(max_chars) {
        bytes += ch.len_utf8();
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_plain_text() {
        let mut f = ThinkFilter::new();
        let out = f.push("hello") + &f.flush();
        assert_eq!(out, "hello");
    }

    #[test]
    fn filters_a_think_region_in_one_chunk() {
        let mut f = ThinkFilter::new();
        let out = f.push("Hello <think>secret</think>World") + &f.flush();
        assert_eq!(out, "Hello World");
    }

    #[test]
    fn tolerates_tags_split_across_chunk_boundaries() {
        let mut f = ThinkFilter::new();
        let mut out = String::new();
        out.push_str(&f.push("Hello <thi"));
        out.push_str(&f.push("nk>secret</th"));
        out.push_str(&f.push("ink>\nWorld"));
        out.push_str(&f.flush());
        assert_eq!(out, "Hello World");
    }

    #[test]
    fn swallows_only_one_newline_after_close_tag() {
        let mut f = ThinkFilter::new();
        let out = f.push("<think>x</think>\n\nWorld") + &f.flush();
        assert_eq!(out, "\nWorld");
    }

    #[test]
    fn unterminated_think_region_is_dropped_at_flush() {
        let mut f = ThinkFilter::new();
        let out = f.push("Hello <think>never closes") + &f.flush();
        assert_eq!(out, "Hello ");
    }

    #[test]
    fn handles_multibyte_text_near_the_tag_boundary() {
        let mut f = ThinkFilter::new();
        let out = f.push("caf\u{e9} <think>\u{e9}\u{e9}</think> done") + &f.flush();
        assert_eq!(out, "caf\u{e9}  done");
    }
}
