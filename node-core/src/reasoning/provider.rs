//! `LlmProvider`: the abstract model collaborator the Reasoning Loop drives.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ReasoningError;
use crate::tools::ToolDefinition;

use super::types::{ReasoningMessage, StreamEvent};

/// One model turn: stream `{text}` and whole `{tool_call}` events through `tx` as
/// they are produced. Returning `Ok(())` means the provider believes it has
/// finished this turn; the loop has already collected everything it needs from
/// the channel by the time this resolves.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn stream(
        &self,
        messages: &[ReasoningMessage],
        tools: &[ToolDefinition],
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ReasoningError>;
}
