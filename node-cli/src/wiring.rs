//! Builds the fully-wired [`WiredNode`] from a loaded [`NodeConfig`] — one function that turns
//! configuration into the object graph every handler and ticker shares.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use node_config::{ConfigStore, LoadError, NodeConfig};
use node_core::events::EventMonitor;
use node_core::fleet::{DefaultClientIdentity, FleetClient, FleetNode};
use node_core::handoff::HandoffController;
use node_core::load::SystemLoadReader;
use node_core::memory::MemoryStoreHandle;
use node_core::reasoning::{EchoProvider, LlmProvider, ReasoningLoop};
use node_core::scheduler::Scheduler;
use node_core::state::PersistedState;
use node_core::sync::KnowledgeSync;
use node_core::tools::builtin::{
    BashTool, FileEditTool, FleetHealthTool, FleetQueryTool, FleetRestartTool, FleetUpgradeTool,
    McpAddServerTool, McpListServersTool, McpRemoveServerTool, MemoryDeleteTool, MemoryReadTool,
    MemorySearchTool, MemoryUpdateTool, MemoryWriteTool,
};
use node_core::tools::{ConfirmFn, ToolRegistry};
use node_serve::{resolve_tls, AppState, ListenerTls};
use node_serve::lifecycle::{Lifecycle, UpgradeState};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("resolve config directory: {0}")]
    ConfigDir(#[from] LoadError),
    #[error("resolve TLS listener settings: {0}")]
    Tls(String),
}

/// Everything [`crate::run`] needs to serve the node: the shared [`AppState`]
/// plus the two pieces of listener configuration that live outside it.
pub struct WiredNode {
    pub state: Arc<AppState>,
    pub listen_addr: String,
    pub tls: ListenerTls,
}

/// Loads config, constructs every C1–C10 component, and registers the built-in
/// tools. `provider` is the out-of-scope LLM wire
/// client the caller plugs in; `None` falls back to [`EchoProvider`]
/// so the rest of the daemon's plumbing is still exercisable without one.
pub async fn build(
    app_name: &str,
    config_dir: Option<&std::path::Path>,
    provider: Option<Arc<dyn LlmProvider>>,
) -> Result<WiredNode, BuildError> {
    let store = match config_dir {
        Some(dir) => ConfigStore::at(dir),
        None => ConfigStore::new(app_name)?,
    };
    let config: NodeConfig = store.load_config();
    let config_state: Arc<PersistedState<NodeConfig>> =
        Arc::new(PersistedState::load(store.path("config.json")));

    let auth_token = config.auth_token.clone().unwrap_or_else(|| {
        let generated = Uuid::new_v4().to_string();
        warn!(token = %generated, "no auth_token configured; generated one for this boot");
        generated
    });

    let peers: Arc<Vec<FleetNode>> = Arc::new(config.peers.clone());

    let memory_state = Arc::new(PersistedState::load(store.path("memory.json")));
    let memory = Arc::new(MemoryStoreHandle::new(memory_state));

    let tool_registry = Arc::new(ToolRegistry::new());
    register_builtin_tools(&tool_registry, &memory, &config_state).await;

    let default_identity = DefaultClientIdentity {
        cert_path: config.tls.default_client_cert.clone(),
        key_path: config.tls.default_client_key.clone(),
    };
    let fleet_client = Arc::new(FleetClient::new(default_identity, config.node_name.clone()));
    register_fleet_tools(&tool_registry, &fleet_client, &peers).await;

    let confirm: Option<ConfirmFn> = {
        let auto_confirm = config.auto_confirm;
        Some(Arc::new(move |_name: &str, _args: &serde_json::Value| auto_confirm))
    };
    let reasoning = Arc::new(ReasoningLoop::new(tool_registry.clone(), confirm));

    let provider: Arc<dyn LlmProvider> = provider.unwrap_or_else(|| Arc::new(EchoProvider::default()));

    let load = SystemLoadReader::new();

    let handoff_state = Arc::new(PersistedState::load(store.path("handoff-state.json")));
    let handoff = Arc::new(HandoffController::new(handoff_state));

    let scheduler_state = Arc::new(PersistedState::load(store.path("scheduler-state.json")));
    let scheduler = Arc::new(Scheduler::new(
        config.scheduled_tasks.clone(),
        scheduler_state,
        handoff.clone(),
        fleet_client.clone(),
        peers.clone(),
        load.clone(),
        reasoning.clone(),
        provider.clone(),
    ));

    let sync_state = Arc::new(PersistedState::load(store.path("memory-sync.json")));
    let knowledge_sync = Arc::new(KnowledgeSync::new(
        config.sync.clone(),
        peers.clone(),
        memory.clone(),
        fleet_client.clone(),
        sync_state,
    ));

    let event_state = Arc::new(PersistedState::load(store.path("event-state.json")));
    let events = Arc::new(EventMonitor::new(
        config.event_hooks.clone(),
        event_state,
        load,
        reasoning.clone(),
        provider.clone(),
        fleet_client.clone(),
        peers.clone(),
    ));

    let upgrade_state = Arc::new(PersistedState::load(store.path("upgrade-state.json")));
    let lifecycle = Arc::new(Lifecycle::new());

    let state = Arc::new(AppState::new(
        &config,
        auth_token,
        peers,
        memory,
        tool_registry,
        reasoning,
        provider,
        fleet_client,
        handoff,
        scheduler,
        knowledge_sync,
        events,
        upgrade_state,
        lifecycle,
    ));

    let tls = resolve_tls(&config.tls).await.map_err(BuildError::Tls)?;

    info!(node_name = %config.node_name, listen_addr = %config.listen_addr, peers = state.peers.len(), "node wired");

    Ok(WiredNode {
        state,
        listen_addr: config.listen_addr.clone(),
        tls,
    })
}

async fn register_builtin_tools(
    registry: &ToolRegistry,
    memory: &Arc<MemoryStoreHandle>,
    config_state: &Arc<PersistedState<NodeConfig>>,
) {
    registry.register(Arc::new(MemoryWriteTool(memory.clone()))).await;
    registry.register(Arc::new(MemoryReadTool(memory.clone()))).await;
    registry.register(Arc::new(MemorySearchTool(memory.clone()))).await;
    registry.register(Arc::new(MemoryUpdateTool(memory.clone()))).await;
    registry.register(Arc::new(MemoryDeleteTool(memory.clone()))).await;

    registry.register(Arc::new(McpListServersTool(config_state.clone()))).await;
    registry.register(Arc::new(McpAddServerTool(config_state.clone()))).await;
    registry.register(Arc::new(McpRemoveServerTool(config_state.clone()))).await;

    registry.register(Arc::new(BashTool::default())).await;
    registry.register(Arc::new(FileEditTool)).await;
}

async fn register_fleet_tools(
    registry: &ToolRegistry,
    fleet_client: &Arc<FleetClient>,
    peers: &Arc<Vec<FleetNode>>,
) {
    registry
        .register(Arc::new(FleetQueryTool {
            client: fleet_client.clone(),
            peers: peers.clone(),
        }))
        .await;
    registry
        .register(Arc::new(FleetHealthTool {
            client: fleet_client.clone(),
            peers: peers.clone(),
        }))
        .await;
    registry
        .register(Arc::new(FleetUpgradeTool {
            client: fleet_client.clone(),
            peers: peers.clone(),
        }))
        .await;
    registry
        .register(Arc::new(FleetRestartTool {
            client: fleet_client.clone(),
            peers: peers.clone(),
        }))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_against_empty_config_dir_wires_every_tool() {
        let dir = tempfile::tempdir().unwrap();
        let node = build("fleet-node-test", Some(dir.path()), None).await.unwrap();

        let names: std::collections::HashSet<String> = node
            .state
            .tool_registry
            .definitions()
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();

        for expected in [
            "memory_write",
            "memory_read",
            "memory_search",
            "memory_update",
            "memory_delete",
            "mcp_list_servers",
            "mcp_add_server",
            "mcp_remove_server",
            "bash",
            "file_edit",
            "fleet_query",
            "fleet_health",
            "fleet_upgrade",
            "fleet_restart",
        ] {
            assert!(names.contains(expected), "missing tool: {expected}");
        }

        assert_eq!(node.listen_addr, NodeConfig::default().listen_addr);
    }

    #[tokio::test]
    async fn build_falls_back_to_echo_provider_when_none_supplied() {
        let dir = tempfile::tempdir().unwrap();
        let node = build("fleet-node-test", Some(dir.path()), None).await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        node.state.provider.stream(&[], &[], tx).await.unwrap();
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn build_reuses_an_explicit_provider() {
        use node_core::reasoning::{ReasoningMessage, StreamEvent};

        struct FixedProvider;

        #[async_trait::async_trait]
        impl LlmProvider for FixedProvider {
            async fn stream(
                &self,
                _messages: &[ReasoningMessage],
                _tools: &[node_core::tools::ToolDefinition],
                tx: tokio::sync::mpsc::Sender<StreamEvent>,
            ) -> Result<(), node_core::ReasoningError> {
                tx.send(StreamEvent::Text("fixed".to_string())).await.ok();
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let node = build(
            "fleet-node-test",
            Some(dir.path()),
            Some(Arc::new(FixedProvider)),
        )
        .await
        .unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        node.state.provider.stream(&[], &[], tx).await.unwrap();
        match rx.recv().await.unwrap() {
            StreamEvent::Text(t) => assert_eq!(t, "fixed"),
            _ => panic!("expected text event"),
        }
    }
}
