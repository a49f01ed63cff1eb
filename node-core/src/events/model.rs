//! Data model for C6.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-hook persisted state. `last_value` carries the most
/// recent *observed raw quantity* (e.g. 1.0/0.0 for a boolean up/down probe, a
/// usage fraction, an mtime in seconds) used by the edge-detecting probes to
/// compare against the next observation; `last_status` is the boolean trigger
/// decision recorded alongside it, for introspection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventState {
    #[serde(default)]
    pub last_triggered: Option<i64>,
    #[serde(default)]
    pub last_checked: Option<i64>,
    #[serde(default)]
    pub trigger_count: u64,
    #[serde(default)]
    pub last_value: Option<f64>,
    #[serde(default)]
    pub last_status: Option<bool>,
}

/// `{hooks:{...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMonitorState {
    #[serde(default)]
    pub hooks: HashMap<String, EventState>,
}
