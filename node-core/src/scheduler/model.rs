//! Data model for C7.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Responses are truncated to this many characters before being persisted.
pub const MAX_RESPONSE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskResult {
    Success,
    Error,
    Skipped,
    Handoff,
}

/// Per-task persisted state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskState {
    #[serde(default)]
    pub last_run: Option<i64>,
    #[serde(default)]
    pub last_result: Option<TaskResult>,
    #[serde(default)]
    pub last_response: String,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub error_count: u64,
}

/// `{tasks:{...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerState {
    #[serde(default)]
    pub tasks: HashMap<String, TaskState>,
}

pub fn truncate_response(s: &str) -> String {
    if s.chars().count() <= MAX_RESPONSE_CHARS {
        s.to_string()
    } else {
        s.chars().take(MAX_RESPONSE_CHARS).collect()
    }
}
