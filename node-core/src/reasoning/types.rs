//! Message and streaming types for the Reasoning Loop.

use serde::{Deserialize, Serialize};

use crate::tools::{ToolCall, ToolCallOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn in the conversation fed to and produced by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

impl ReasoningMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// One element of a provider's lazy chunk sequence: plain text, or a
/// tool call emitted whole rather than streamed piece-by-piece at this layer.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Text(String),
    ToolCall(ToolCall),
}

/// Final result of running the bounded tool-use loop to completion or to
/// `MAX_ITERATIONS`.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningOutcome {
    pub final_text: String,
    pub tools_executed: Vec<ToolCallOutcome>,
}
