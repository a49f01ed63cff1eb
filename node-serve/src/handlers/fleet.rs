//! `/v1/fleet/*` handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use node_core::memory::Memory;
use node_core::reasoning::ReasoningMessage;

use crate::app::{system_info, AppState};
use crate::error::ApiError;
use crate::lifecycle::under_supervisor;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    prompt: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    system: Option<String>,
    #[serde(default = "default_true")]
    tools: bool,
}

fn default_true() -> bool {
    true
}

pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteRequest>,
) -> Response {
    let mut messages = Vec::new();
    if let Some(system) = &req.system {
        messages.push(ReasoningMessage::system(system.clone()));
    }
    messages.push(ReasoningMessage::user(req.prompt));

    let tool_definitions = if req.tools {
        state.tool_registry.definitions().await
    } else {
        Vec::new()
    };

    match state
        .reasoning
        .run(state.provider.as_ref(), messages, tool_definitions)
        .await
    {
        Ok(outcome) => Json(json!({
            "success": true,
            "response": outcome.final_text,
            "tools_executed": outcome.tools_executed.iter().map(|t| json!({"name": t.name, "result": t.result})).collect::<Vec<_>>(),
            "provider": "fleet-node",
            "model": req.model.unwrap_or_else(|| state.node_name.clone()),
        })).into_response(),
        Err(e) => Json(json!({
            "success": false,
            "error": e.to_string(),
        })).into_response(),
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut info = system_info(state.started_at);
    info["status"] = json!("ok");
    Json(info)
}

pub async fn info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(system_info(state.started_at))
}

#[derive(Debug, Serialize)]
struct UpgradeCheckResponse {
    current_version: String,
    latest_version: String,
    upgrade_available: bool,
    message: &'static str,
}

/// The binary self-upgrade downloader is out of scope: this
/// always reports `upgradeAvailable=false` against its own running version,
/// but keeps the persisted check-time/version fields the layout requires.
pub async fn upgrade_check(State(state): State<Arc<AppState>>) -> Json<UpgradeCheckResponse> {
    let version = env!("CARGO_PKG_VERSION").to_string();
    state
        .upgrade_state
        .mutate(|s| {
            s.last_check_time = Some(chrono::Utc::now().timestamp_millis());
            s.last_check_version = Some(version.clone());
        })
        .await;
    Json(UpgradeCheckResponse {
        current_version: version.clone(),
        latest_version: version,
        upgrade_available: false,
        message: "self-upgrade is not implemented in this build",
    })
}

pub async fn upgrade_perform(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let version = env!("CARGO_PKG_VERSION").to_string();
    Json(json!({
        "success": false,
        "message": "self-upgrade is not implemented in this build",
        "currentVersion": version.clone(),
        "latestVersion": version,
    }))
}

/// Returns first; the process exit is scheduled ~100ms later unless under a
/// supervisor, in which case it exits immediately.
pub async fn restart(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    info!("restart requested over HTTP");
    state.lifecycle.begin_draining_for_restart();
    let response = json!({
        "success": true,
        "message": "restarting",
        "version": env!("CARGO_PKG_VERSION"),
    });

    if under_supervisor() {
        std::process::exit(0);
    }
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        std::process::exit(0);
    });
    Json(response)
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    since: i64,
    /// The dedicated endpoint needs to know which peer bucket to merge into,
    /// so the caller identifies itself explicitly rather than relying on the
    /// TLS peer identity alone.
    peer: String,
    memories: Vec<Memory>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    memories: Vec<Memory>,
}

pub async fn sync(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SyncRequest>,
) -> Response {
    if req.peer.is_empty() {
        return ApiError::server_error("missing peer identity").into_response();
    }
    state.memory.receive(&req.peer, req.memories).await;
    let memories = state.memory.get_since(req.since).await;
    Json(SyncResponse { memories }).into_response()
}
