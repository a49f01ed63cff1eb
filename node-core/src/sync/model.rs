//! Data model for C9.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-peer persisted sync cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeerSyncState {
    #[serde(default)]
    pub last_sync_time: i64,
    #[serde(default)]
    pub last_sent_id: Option<String>,
    #[serde(default)]
    pub last_received_id: Option<String>,
    #[serde(default)]
    pub sync_count: u64,
}

/// `{peers:{...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeSyncState {
    #[serde(default)]
    pub peers: HashMap<String, PeerSyncState>,
}
