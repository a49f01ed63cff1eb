//! `GET /v1/models`: static list of the identifiers this node's
//! provider answers to. Concrete vendor model catalogs are an external
//! collaborator's concern; this always advertises the one logical model the
//! node itself exposes.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::app::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "object": "list",
        "data": [{
            "id": state.node_name,
            "object": "model",
            "owned_by": "fleet-node",
        }],
    }))
}
