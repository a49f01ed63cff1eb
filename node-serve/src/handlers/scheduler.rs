//! `GET /v1/scheduler`: aggregate introspection across the
//! scheduler, handoff controller, knowledge-sync, memory store, and event-hook
//! monitor.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::app::AppState;

pub async fn snapshot(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let scheduler_state = state.scheduler.snapshot().await;
    let handoff_state = state.handoff.snapshot().await;
    let sync_state = state.knowledge_sync.snapshot().await;
    let memory_stats = state.memory.stats().await;
    let event_state = state.events.snapshot().await;

    Json(json!({
        "enabled": true,
        "tasks": scheduler_state.tasks,
        "handoff": handoff_state,
        "knowledgeSync": sync_state,
        "memory": memory_stats,
        "eventHooks": event_state.hooks,
    }))
}
