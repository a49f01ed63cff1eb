//! Data model for C8.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Quarantine window: a peer with `consecutiveFailures >= 3` is skipped as long
/// as it was used within the last 5 minutes.
pub const QUARANTINE_FAILURE_THRESHOLD: u32 = 3;
pub const QUARANTINE_WINDOW_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeerStats {
    pub handoffs: u64,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    #[serde(default)]
    pub last_used: Option<i64>,
    #[serde(default)]
    pub last_success: Option<i64>,
}

impl PeerStats {
    pub fn is_quarantined(&self, now_ms: i64) -> bool {
        self.consecutive_failures >= QUARANTINE_FAILURE_THRESHOLD
            && self
                .last_used
                .is_some_and(|t| now_ms - t < QUARANTINE_WINDOW_MS)
    }
}

/// `{lastPeerIndex, peerStats:{...}}`.
/// `last_peer_index = -1` before any selection has been made, so the first call
/// starts the ring at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffState {
    pub last_peer_index: i64,
    pub peer_stats: HashMap<String, PeerStats>,
}

impl Default for HandoffState {
    fn default() -> Self {
        Self {
            last_peer_index: -1,
            peer_stats: HashMap::new(),
        }
    }
}
