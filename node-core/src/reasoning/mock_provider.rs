//! `EchoProvider`: a fixed-response [`LlmProvider`] that answers without
//! calling out anywhere, useful for smoke-testing a node's own plumbing before
//! a real provider is plugged in.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ReasoningError;
use crate::tools::ToolDefinition;

use super::provider::LlmProvider;
use super::types::{ReasoningMessage, StreamEvent};

/// Always answers with a fixed string and never emits tool calls.
pub struct EchoProvider {
    reply: String,
}

impl EchoProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

impl Default for EchoProvider {
    fn default() -> Self {
        Self::new(
            "no LLM provider configured for this node; wire one in via the LlmProvider trait",
        )
    }
}

#[async_trait]
impl LlmProvider for EchoProvider {
    async fn stream(
        &self,
        _messages: &[ReasoningMessage],
        _tools: &[ToolDefinition],
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ReasoningError> {
        let _ = tx.send(StreamEvent::Text(self.reply.clone())).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_configured_reply() {
        let provider = EchoProvider::new("hi there");
        let (tx, mut rx) = mpsc::channel(4);
        provider.stream(&[], &[], tx).await.unwrap();
        match rx.recv().await.unwrap() {
            StreamEvent::Text(t) => assert_eq!(t, "hi there"),
            _ => panic!("expected text event"),
        }
    }
}
