//! Axum app: shared state, router, and the system-status producer shared by
//! `/v1/fleet/health` and `/v1/fleet/info`.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use axum::middleware;
use node_config::NodeConfig;
use node_core::events::EventMonitor;
use node_core::fleet::{FleetClient, FleetNode};
use node_core::handoff::HandoffController;
use node_core::memory::MemoryStoreHandle;
use node_core::reasoning::{LlmProvider, ReasoningLoop};
use node_core::scheduler::Scheduler;
use node_core::state::PersistedState;
use node_core::sync::KnowledgeSync;
use node_core::tools::ToolRegistry;
use sysinfo::System;

use crate::auth::require_bearer;
use crate::handlers;
use crate::lifecycle::{Lifecycle, UpgradeState};

pub struct AppState {
    pub node_name: String,
    pub auth_token: String,
    pub auto_confirm: bool,
    pub peers: Arc<Vec<FleetNode>>,

    pub memory: Arc<MemoryStoreHandle>,
    pub tool_registry: Arc<ToolRegistry>,
    pub reasoning: Arc<ReasoningLoop>,
    pub provider: Arc<dyn LlmProvider>,
    pub fleet_client: Arc<FleetClient>,
    pub handoff: Arc<HandoffController>,
    pub scheduler: Arc<Scheduler>,
    pub knowledge_sync: Arc<KnowledgeSync>,
    pub events: Arc<EventMonitor>,
    pub upgrade_state: Arc<PersistedState<UpgradeState>>,

    pub lifecycle: Arc<Lifecycle>,
    pub started_at: Instant,

    /// Ticker periods the daemon entrypoint needs to spawn the background
    /// tickers, carried here so `node-cli` doesn't need its
    /// own copy of `NodeConfig` alongside the already-built `AppState`.
    pub event_check_interval_secs: u64,
    pub memory_cleanup_interval_secs: u64,
    pub knowledge_sync_interval_secs: u64,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &NodeConfig,
        auth_token: String,
        peers: Arc<Vec<FleetNode>>,
        memory: Arc<MemoryStoreHandle>,
        tool_registry: Arc<ToolRegistry>,
        reasoning: Arc<ReasoningLoop>,
        provider: Arc<dyn LlmProvider>,
        fleet_client: Arc<FleetClient>,
        handoff: Arc<HandoffController>,
        scheduler: Arc<Scheduler>,
        knowledge_sync: Arc<KnowledgeSync>,
        events: Arc<EventMonitor>,
        upgrade_state: Arc<PersistedState<UpgradeState>>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            node_name: config.node_name.clone(),
            auth_token,
            auto_confirm: config.auto_confirm,
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
            started_at: Instant::now(),
            event_check_interval_secs: config.event_check_interval_secs,
            memory_cleanup_interval_secs: config.memory_cleanup_interval_secs,
            knowledge_sync_interval_secs: config.sync.interval_secs,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let authenticated = Router::new()
        .route("/v1/chat/completions", post(handlers::chat::completions))
        .route("/v1/models", get(handlers::models::list))
        .route("/v1/fleet/execute", post(handlers::fleet::execute))
        .route(
            "/v1/fleet/upgrade",
            get(handlers::fleet::upgrade_check).post(handlers::fleet::upgrade_perform),
        )
        .route("/v1/fleet/restart", post(handlers::fleet::restart))
        .route("/v1/fleet/sync", post(handlers::fleet::sync))
        .route("/v1/scheduler", get(handlers::scheduler::snapshot))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    let unauthenticated = Router::new()
        .route("/v1/fleet/health", get(handlers::fleet::health))
        .route("/v1/fleet/info", get(handlers::fleet::info));

    authenticated.merge(unauthenticated).with_state(state)
}

/// Producer shared by `/v1/fleet/health` (embedded) and `/v1/fleet/info`
/// (returned directly).
pub fn system_info(started_at: Instant) -> serde_json::Value {
    let mut system = System::new_all();
    system.refresh_all();

    let cpus = system.cpus().len();
    let load = System::load_average().one / (cpus.max(1) as f64);
    let total_mem = system.total_memory();
    let used_mem = system.used_memory();
    let memory_fraction = if total_mem == 0 {
        0.0
    } else {
        used_mem as f64 / total_mem as f64
    };

    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "hostname": sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string()),
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "uptime": started_at.elapsed().as_secs(),
        "load": load,
        "memory": memory_fraction,
        "cpus": cpus,
    })
}
