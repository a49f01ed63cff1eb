//! The bounded tool-use loop itself:
//!
//! ```text
//! for iteration in 1..MAX_ITERATIONS (MAX_ITERATIONS = 10):
//!     (text, toolCalls) = consume provider.stream(messages, tools)
//!     append assistant message (text, toolCalls) to messages
//!     if toolCalls is empty: return text
//!     for each call in toolCalls (in order): execute, append tool-result message
//! ```
//!
//! The loop terminates at `MAX_ITERATIONS` even if the model keeps requesting
//! tools; the partial text accumulated so far is returned.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ReasoningError;
use crate::tools::{execute_tool, ConfirmFn, ToolCall, ToolDefinition, ToolRegistry};

use super::provider::LlmProvider;
use super::think_filter::ThinkFilter;
use super::types::{ReasoningMessage, ReasoningOutcome, Role, StreamEvent};

/// Not configurable: the same constant appears in the
/// scheduler's handoff-guard reasoning and the event-hook prompt execution, all
/// of which route through this loop.
pub const MAX_ITERATIONS: u32 = 10;

pub struct ReasoningLoop {
    registry: Arc<ToolRegistry>,
    confirm: Option<ConfirmFn>,
}

impl ReasoningLoop {
    pub fn new(registry: Arc<ToolRegistry>, confirm: Option<ConfirmFn>) -> Self {
        Self { registry, confirm }
    }

    pub async fn run(
        &self,
        provider: &(dyn LlmProvider + 'static),
        mut messages: Vec<ReasoningMessage>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ReasoningOutcome, ReasoningError> {
        let mut tools_executed = Vec::new();
        let mut final_text = String::new();

        for _ in 0..MAX_ITERATIONS {
            let (text, tool_calls) = consume_stream(provider, &messages, &tools).await?;
            final_text = text.clone();

            messages.push(ReasoningMessage {
                role: Role::Assistant,
                content: text,
                tool_calls: tool_calls.clone(),
                tool_call_id: None,
            });

            if tool_calls.is_empty() {
                return Ok(ReasoningOutcome {
                    final_text,
                    tools_executed,
                });
            }

            for call in &tool_calls {
                let outcome = execute_tool(&self.registry, call, self.confirm.as_ref()).await;
                messages.push(ReasoningMessage {
                    role: Role::Tool,
                    content: outcome.result.clone(),
                    tool_calls: Vec::new(),
                    tool_call_id: Some(call.id.clone()),
                });
                tools_executed.push(outcome);
            }
        }

        Ok(ReasoningOutcome {
            final_text,
            tools_executed,
        })
    }
}

/// Drains one provider turn into accumulated, think-filtered text plus the
/// ordered list of tool calls it emitted.
async fn consume_stream(
    provider: &(dyn LlmProvider + 'static),
    messages: &[ReasoningMessage],
    tools: &[ToolDefinition],
) -> Result<(String, Vec<ToolCall>), ReasoningError> {
    let (tx, mut rx) = mpsc::channel(32);
    let stream_result = provider.stream(messages, tools, tx).await;

    let mut filter = ThinkFilter::new();
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Text(chunk) => text.push_str(&filter.push(&chunk)),
            StreamEvent::ToolCall(call) => tool_calls.push(call),
        }
    }
    text.push_str(&filter.flush());

    stream_result?;
    Ok((text, tool_calls))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::tools::{Tool, ToolDefinition as Def};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex as AsyncMutex;

    struct BashStub;

    #[async_trait]
    impl Tool for BashStub {
        fn definition(&self) -> Def {
            Def {
                name: "bash".into(),
                description: "".into(),
                parameters: serde_json::json!({}),
            }
        }

        async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
            assert_eq!(args["command"], "echo hi");
            Ok("hi\n".to_string())
        }
    }

    /// A stub provider that emits a `bash` tool call on iteration 1 and plain
    /// text `"done"` on iteration 2.
    struct S1Provider {
        iteration: AsyncMutex<u32>,
    }

    #[async_trait]
    impl LlmProvider for S1Provider {
        async fn stream(
            &self,
            _messages: &[ReasoningMessage],
            _tools: &[Def],
            tx: mpsc::Sender<StreamEvent>,
        ) -> Result<(), ReasoningError> {
            let mut iteration = self.iteration.lock().await;
            *iteration += 1;
            if *iteration == 1 {
                tx.send(StreamEvent::ToolCall(ToolCall {
                    id: "call-1".to_string(),
                    name: "bash".to_string(),
                    arguments: serde_json::json!({"command": "echo hi"}),
                }))
                .await
                .unwrap();
            } else {
                tx.send(StreamEvent::Text("done".to_string())).await.unwrap();
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn s1_basic_reasoning_with_a_tool() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(BashStub)).await;
        let reasoning = ReasoningLoop::new(registry, None);
        let provider = S1Provider {
            iteration: AsyncMutex::new(0),
        };

        let outcome = reasoning
            .run(
                &provider,
                vec![ReasoningMessage::user("say hi")],
                vec![],
            )
            .await
            .unwrap();

        assert_eq!(outcome.final_text, "done");
        assert_eq!(outcome.tools_executed.len(), 1);
        assert_eq!(outcome.tools_executed[0].name, "bash");
        assert_eq!(outcome.tools_executed[0].result, "hi\n");
        assert!(!outcome.tools_executed[0].is_error);
    }

    struct InfiniteToolProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for InfiniteToolProvider {
        async fn stream(
            &self,
            _messages: &[ReasoningMessage],
            _tools: &[Def],
            tx: mpsc::Sender<StreamEvent>,
        ) -> Result<(), ReasoningError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tx.send(StreamEvent::Text("partial".to_string())).await.unwrap();
            tx.send(StreamEvent::ToolCall(ToolCall {
                id: "x".to_string(),
                name: "bash".to_string(),
                arguments: serde_json::json!({"command": "echo hi"}),
            }))
            .await
            .unwrap();
            Ok(())
        }
    }

    #[tokio::test]
    async fn bounded_at_max_iterations_even_if_model_keeps_requesting_tools() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(BashStub)).await;
        let reasoning = ReasoningLoop::new(registry, None);
        let provider = InfiniteToolProvider {
            calls: AtomicU32::new(0),
        };

        let outcome = reasoning
            .run(&provider, vec![ReasoningMessage::user("loop forever")], vec![])
            .await
            .unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), MAX_ITERATIONS);
        assert_eq!(outcome.tools_executed.len(), MAX_ITERATIONS as usize);
        assert_eq!(outcome.final_text, "partial");
    }

    struct NeverConfirmedProvider;

    #[async_trait]
    impl LlmProvider for NeverConfirmedProvider {
        async fn stream(
            &self,
            _messages: &[ReasoningMessage],
            _tools: &[Def],
            tx: mpsc::Sender<StreamEvent>,
        ) -> Result<(), ReasoningError> {
            tx.send(StreamEvent::ToolCall(ToolCall {
                id: "c".to_string(),
                name: "confirm_me".to_string(),
                arguments: serde_json::json!({}),
            }))
            .await
            .unwrap();
            Ok(())
        }
    }

    struct AlwaysConfirmRequired;

    #[async_trait]
    impl Tool for AlwaysConfirmRequired {
        fn definition(&self) -> Def {
            Def {
                name: "confirm_me".into(),
                description: "".into(),
                parameters: serde_json::json!({}),
            }
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<String, ToolError> {
            Ok("ran".to_string())
        }

        fn requires_confirmation(&self, _args: &serde_json::Value) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn confirmation_refusal_feeds_cancellation_back_into_the_loop() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(AlwaysConfirmRequired)).await;
        let confirm: ConfirmFn = Arc::new(|_, _| false);
        let reasoning = ReasoningLoop::new(registry, Some(confirm));
        let provider = NeverConfirmedProvider;

        let outcome = reasoning
            .run(&provider, vec![ReasoningMessage::user("do it")], vec![])
            .await
            .unwrap();

        assert_eq!(outcome.tools_executed[0].result, "Command cancelled by user");
    }
}
