//! `executeTool(call, confirmFn?)`.

use std::sync::Arc;

use super::{ToolCall, ToolCallOutcome, ToolRegistry};

/// Confirmation callback: given the tool name and its arguments, returns whether
/// the user approved the call. The server endpoint (no TTY) supplies a closure
/// that always returns the configured `autoConfirm` flag; an
/// interactive frontend would supply a real prompt instead, but a
/// REPL/line-editing layer is an external collaborator this crate doesn't own.
pub type ConfirmFn = Arc<dyn Fn(&str, &serde_json::Value) -> bool + Send + Sync>;

/// Resolves the named tool, asks for confirmation if required, executes it, and
/// normalizes every failure mode into a `ToolCallOutcome` string result plus error
/// flag rather than an exception.
pub async fn execute_tool(
    registry: &ToolRegistry,
    call: &ToolCall,
    confirm_fn: Option<&ConfirmFn>,
) -> ToolCallOutcome {
    let tool = match registry.get(&call.name).await {
        Some(tool) => tool,
        None => {
            return ToolCallOutcome {
                name: call.name.clone(),
                result: format!("Unknown tool: {}", call.name),
                is_error: true,
            }
        }
    };

    if tool.requires_confirmation(&call.arguments) {
        if let Some(confirm) = confirm_fn {
            if !confirm(&call.name, &call.arguments) {
                return ToolCallOutcome {
                    name: call.name.clone(),
                    result: "Command cancelled by user".to_string(),
                    is_error: true,
                };
            }
        }
    }

    match tool.execute(call.arguments.clone()).await {
        Ok(result) => ToolCallOutcome {
            name: call.name.clone(),
            result,
            is_error: false,
        },
        Err(e) => ToolCallOutcome {
            name: call.name.clone(),
            result: format!("Error: {}", e),
            is_error: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::tools::{Tool, ToolDefinition};
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".into(),
                description: "echoes input".into(),
                parameters: serde_json::json!({"type": "object"}),
            }
        }

        async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
            Ok(args.to_string())
        }
    }

    struct AlwaysConfirmTool;

    #[async_trait]
    impl Tool for AlwaysConfirmTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "dangerous".into(),
                description: "".into(),
                parameters: serde_json::json!({}),
            }
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<String, ToolError> {
            Ok("did it".into())
        }

        fn requires_confirmation(&self, _args: &serde_json::Value) -> bool {
            true
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "failer".into(),
                description: "".into(),
                parameters: serde_json::json!({}),
            }
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<String, ToolError> {
            Err(ToolError::Execution("boom".into()))
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result_not_an_exception() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "1".into(),
            name: "nope".into(),
            arguments: serde_json::json!({}),
        };
        let outcome = execute_tool(&registry, &call, None).await;
        assert!(outcome.is_error);
        assert!(outcome.result.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn confirmation_refusal_cancels() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(AlwaysConfirmTool)).await;
        let call = ToolCall {
            id: "1".into(),
            name: "dangerous".into(),
            arguments: serde_json::json!({}),
        };
        let confirm: ConfirmFn = Arc::new(|_, _| false);
        let outcome = execute_tool(&registry, &call, Some(&confirm)).await;
        assert!(outcome.is_error);
        assert_eq!(outcome.result, "Command cancelled by user");
    }

    #[tokio::test]
    async fn confirmation_approval_executes() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(AlwaysConfirmTool)).await;
        let call = ToolCall {
            id: "1".into(),
            name: "dangerous".into(),
            arguments: serde_json::json!({}),
        };
        let confirm: ConfirmFn = Arc::new(|_, _| true);
        let outcome = execute_tool(&registry, &call, Some(&confirm)).await;
        assert!(!outcome.is_error);
        assert_eq!(outcome.result, "did it");
    }

    #[tokio::test]
    async fn tool_error_becomes_string_result_with_error_flag() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool)).await;
        let call = ToolCall {
            id: "1".into(),
            name: "failer".into(),
            arguments: serde_json::json!({}),
        };
        let outcome = execute_tool(&registry, &call, None).await;
        assert!(outcome.is_error);
        assert!(outcome.result.starts_with("Error:"));
    }

    #[tokio::test]
    async fn successful_execution_returns_raw_string() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).await;
        let call = ToolCall {
            id: "1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"a": 1}),
        };
        let outcome = execute_tool(&registry, &call, None).await;
        assert!(!outcome.is_error);
        assert_eq!(outcome.result, "{\"a\":1}");
    }
}
