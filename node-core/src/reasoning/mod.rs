//! C4: drive an LLM provider through a bounded tool-use loop, streaming text and
//! tool calls, executing tools, feeding results back.

mod loop_;
mod mock_provider;
mod provider;
mod think_filter;
mod types;

pub use loop_::{ReasoningLoop, MAX_ITERATIONS};
pub use mock_provider::EchoProvider;
pub use provider::LlmProvider;
pub use think_filter::ThinkFilter;
pub use types::{ReasoningMessage, ReasoningOutcome, Role, StreamEvent};
