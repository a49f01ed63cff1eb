//! `fleet_query`, `fleet_health`, `fleet_upgrade`, `fleet_restart`: thin wrappers
//! over C5.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ToolError;
use crate::fleet::{ExecuteOptions, FleetClient, FleetNode};
use crate::tools::{Tool, ToolDefinition};

fn find_peer<'a>(peers: &'a [FleetNode], name: &str) -> Result<&'a FleetNode, ToolError> {
    peers
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| ToolError::InvalidArguments(format!("unknown peer: {}", name)))
}

pub struct FleetQueryTool {
    pub client: Arc<FleetClient>,
    pub peers: Arc<Vec<FleetNode>>,
}

#[async_trait]
impl Tool for FleetQueryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fleet_query".to_string(),
            description: "Ask a named peer node to execute a prompt".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "peer": {"type": "string"},
                    "prompt": {"type": "string"},
                    "model": {"type": "string"},
                    "system": {"type": "string"}
                },
                "required": ["peer", "prompt"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let peer_name = args
            .get("peer")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `peer`".to_string()))?;
        let prompt = args
            .get("prompt")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `prompt`".to_string()))?;
        let peer = find_peer(&self.peers, peer_name)?;

        let result = self
            .client
            .query_fleet_node(
                peer,
                prompt,
                ExecuteOptions {
                    model: args.get("model").and_then(|v| v.as_str()).map(str::to_string),
                    system: args.get("system").and_then(|v| v.as_str()).map(str::to_string),
                },
            )
            .await;
        serde_json::to_string(&result).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

pub struct FleetHealthTool {
    pub client: Arc<FleetClient>,
    pub peers: Arc<Vec<FleetNode>>,
}

#[async_trait]
impl Tool for FleetHealthTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fleet_health".to_string(),
            description: "Check health of all configured peers".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, _args: serde_json::Value) -> Result<String, ToolError> {
        let results = self.client.get_fleet_health(&self.peers).await;
        serde_json::to_string(&results).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

pub struct FleetUpgradeTool {
    pub client: Arc<FleetClient>,
    pub peers: Arc<Vec<FleetNode>>,
}

#[async_trait]
impl Tool for FleetUpgradeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fleet_upgrade".to_string(),
            description: "Check for or perform an upgrade on a named peer".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "peer": {"type": "string"},
                    "perform": {"type": "boolean"}
                },
                "required": ["peer"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let peer_name = args
            .get("peer")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `peer`".to_string()))?;
        let peer = find_peer(&self.peers, peer_name)?;
        let perform = args.get("perform").and_then(|v| v.as_bool()).unwrap_or(false);
        let result = self.client.upgrade_fleet_node(peer, perform).await;
        serde_json::to_string(&result).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

pub struct FleetRestartTool {
    pub client: Arc<FleetClient>,
    pub peers: Arc<Vec<FleetNode>>,
}

#[async_trait]
impl Tool for FleetRestartTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fleet_restart".to_string(),
            description: "Restart a named peer node".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {"peer": {"type": "string"}},
                "required": ["peer"]
            }),
        }
    }

    fn requires_confirmation(&self, _args: &serde_json::Value) -> bool {
        true
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let peer_name = args
            .get("peer")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `peer`".to_string()))?;
        let peer = find_peer(&self.peers, peer_name)?;
        let result = self.client.restart_fleet_node(peer).await;
        serde_json::to_string(&result).map_err(|e| ToolError::Execution(e.to_string()))
    }
}
