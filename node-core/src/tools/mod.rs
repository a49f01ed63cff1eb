//! C3: named tools with JSON-schema contracts, invocation with optional
//! confirmation, dynamic (un)registration.

mod executor;
pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub use executor::{execute_tool, ConfirmFn};

use crate::error::ToolError;

/// Prefix every dynamically-registered external tool (from an MCP server) must
/// carry, guaranteeing no collision with built-ins.
pub const MCP_TOOL_PREFIX: &str = "mcp__";

/// `{name, description, JSON-schema parameters}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One tool invocation request as emitted by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Result of executing one [`ToolCall`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallOutcome {
    pub name: String,
    pub result: String,
    pub is_error: bool,
}

/// `{ definition, execute(args) -> string, requiresConfirmation?(args) -> bool }`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError>;

    /// Default: never requires confirmation.
    fn requires_confirmation(&self, _args: &serde_json::Value) -> bool {
        false
    }
}

/// Process-wide mapping from tool name to implementation, under a mutex.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Idempotent: registering the same name twice replaces the previous tool.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.write().await.insert(name, tool);
    }

    /// Idempotent: deregistering a name that isn't present is a no-op, returns
    /// whether something was actually removed.
    pub async fn deregister(&self, name: &str) -> bool {
        self.tools.write().await.remove(name).is_some()
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .read()
            .await
            .values()
            .map(|t| t.definition())
            .collect()
    }
}
