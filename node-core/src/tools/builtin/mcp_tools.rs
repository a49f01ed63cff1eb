//! `mcp_list_servers`, `mcp_add_server`, `mcp_remove_server`: config-only stubs.
//!
//! These tools mutate `NodeConfig.mcp_servers` through the same `PersistedState`
//! discipline as every other document; they do not themselves perform
//! the `mcp__`-prefixed dynamic registration into the [`crate::tools::ToolRegistry`]
//! — that happens at startup (and on add/remove) by whatever wires the registry,
//! using [`crate::tools::MCP_TOOL_PREFIX`] to namecheck incoming tool names.

use std::sync::Arc;

use async_trait::async_trait;
use node_config::{McpServerConfig, NodeConfig};

use crate::error::ToolError;
use crate::state::PersistedState;
use crate::tools::{Tool, ToolDefinition};

pub struct McpListServersTool(pub Arc<PersistedState<NodeConfig>>);

#[async_trait]
impl Tool for McpListServersTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "mcp_list_servers".to_string(),
            description: "List configured MCP servers".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, _args: serde_json::Value) -> Result<String, ToolError> {
        let servers = self.0.snapshot().await.mcp_servers;
        serde_json::to_string(&servers).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

pub struct McpAddServerTool(pub Arc<PersistedState<NodeConfig>>);

#[async_trait]
impl Tool for McpAddServerTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "mcp_add_server".to_string(),
            description: "Register a new MCP server in configuration".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "command": {"type": "string"},
                    "url": {"type": "string"}
                },
                "required": ["name"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let name = args
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `name`".to_string()))?
            .to_string();
        let command = args.get("command").and_then(|v| v.as_str()).map(str::to_string);
        let url = args.get("url").and_then(|v| v.as_str()).map(str::to_string);

        if command.is_none() && url.is_none() {
            return Err(ToolError::InvalidArguments(
                "one of `command` or `url` is required".to_string(),
            ));
        }

        let entry = McpServerConfig {
            name: name.clone(),
            command,
            url,
            enabled: true,
        };

        let already_present = self
            .0
            .mutate(|config| {
                let exists = config.mcp_servers.iter().any(|s| s.name == name);
                if !exists {
                    config.mcp_servers.push(entry.clone());
                } else if let Some(slot) = config.mcp_servers.iter_mut().find(|s| s.name == name) {
                    *slot = entry.clone();
                }
                exists
            })
            .await;

        Ok(serde_json::json!({"name": name, "replaced": already_present}).to_string())
    }
}

pub struct McpRemoveServerTool(pub Arc<PersistedState<NodeConfig>>);

#[async_trait]
impl Tool for McpRemoveServerTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "mcp_remove_server".to_string(),
            description: "Remove an MCP server from configuration".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let name = args
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `name`".to_string()))?;

        let removed = self
            .0
            .mutate(|config| {
                let before = config.mcp_servers.len();
                config.mcp_servers.retain(|s| s.name != name);
                before != config.mcp_servers.len()
            })
            .await;

        Ok(serde_json::json!({"removed": removed}).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<PersistedState<NodeConfig>> {
        let dir = tempfile::tempdir().unwrap();
        Arc::new(PersistedState::load(dir.path().join("config.json")))
    }

    #[tokio::test]
    async fn add_then_list_then_remove() {
        let state = store();
        let add = McpAddServerTool(state.clone());
        let list = McpListServersTool(state.clone());
        let remove = McpRemoveServerTool(state.clone());

        add.execute(serde_json::json!({"name": "search", "command": "mcp-search"}))
            .await
            .unwrap();

        let listed = list.execute(serde_json::json!({})).await.unwrap();
        assert!(listed.contains("search"));

        let removed = remove.execute(serde_json::json!({"name": "search"})).await.unwrap();
        assert!(removed.contains("\"removed\":true"));

        let listed_after = list.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(listed_after, "[]");
    }

    #[tokio::test]
    async fn add_requires_command_or_url() {
        let state = store();
        let add = McpAddServerTool(state);
        let err = add.execute(serde_json::json!({"name": "x"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
