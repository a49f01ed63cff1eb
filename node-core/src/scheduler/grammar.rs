//! `parseSchedule`: `@every <N><unit>`, `@hourly`,
//! `@daily`, `@weekly`, `*/<N> * * * *`, or an unrecognized string defaulting to
//! 300s with a warning.

use tracing::warn;

const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Parses a schedule string into an interval in seconds. Never fails: anything
/// unrecognized falls back to the 300s default, logging a warning so
/// the operator can fix a typo'd `schedule` field.
pub fn parse_schedule(schedule: &str) -> u64 {
    if let Some(rest) = schedule.strip_prefix("@every ") {
        if let Some(secs) = parse_every(rest) {
            return secs;
        }
        warn!(schedule, "unrecognized @every duration, defaulting to 300s");
        return DEFAULT_INTERVAL_SECS;
    }

    match schedule {
        "@hourly" => return 3600,
        "@daily" => return 86400,
        "@weekly" => return 604800,
        _ => {}
    }

    if let Some(secs) = parse_star_slash_minutes(schedule) {
        return secs;
    }

    warn!(schedule, "unrecognized schedule, defaulting to 300s");
    DEFAULT_INTERVAL_SECS
}

/// `<N><unit>` where `unit ∈ {s,m,h}`.
fn parse_every(spec: &str) -> Option<u64> {
    let spec = spec.trim();
    let unit = spec.chars().last()?;
    let (digits, multiplier) = match unit {
        's' => (&spec[..spec.len() - 1], 1),
        'm' => (&spec[..spec.len() - 1], 60),
        'h' => (&spec[..spec.len() - 1], 3600),
        _ => return None,
    };
    let n: u64 = digits.parse().ok()?;
    Some(n * multiplier)
}

/// `*/<N> * * * *` → N minutes. Only the minute field's step form is recognized;
/// every other cron-lite shape falls through to the default.
fn parse_star_slash_minutes(spec: &str) -> Option<u64> {
    let mut fields = spec.split_whitespace();
    let minute_field = fields.next()?;
    let rest: Vec<&str> = fields.collect();
    if rest.len() != 4 || rest.iter().any(|f| *f != "*") {
        return None;
    }
    let n: u64 = minute_field.strip_prefix("*/")?.parse().ok()?;
    Some(n * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_seconds() {
        assert_eq!(parse_schedule("@every 30s"), 30);
    }

    #[test]
    fn every_minutes() {
        assert_eq!(parse_schedule("@every 5m"), 300);
    }

    #[test]
    fn every_hours() {
        assert_eq!(parse_schedule("@every 2h"), 7200);
    }

    #[test]
    fn hourly_daily_weekly() {
        assert_eq!(parse_schedule("@hourly"), 3600);
        assert_eq!(parse_schedule("@daily"), 86400);
        assert_eq!(parse_schedule("@weekly"), 604800);
    }

    #[test]
    fn star_slash_minutes() {
        assert_eq!(parse_schedule("*/15 * * * *"), 900);
    }

    #[test]
    fn unrecognized_defaults_to_300() {
        assert_eq!(parse_schedule("whenever"), 300);
        assert_eq!(parse_schedule("@every nonsense"), 300);
        assert_eq!(parse_schedule("1 2 3 4 5"), 300);
    }
}
