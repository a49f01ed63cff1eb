//! Data model for C2.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

pub use node_config::MemoryCategory;

pub const LOCAL_SOURCE: &str = "local";

/// The unit of persisted knowledge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Memory {
    pub id: String,
    pub category: MemoryCategory,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: HashSet<String>,
    /// ms since epoch.
    pub created: i64,
    /// ms since epoch.
    #[serde(default)]
    pub updated: Option<i64>,
    /// `"local"` or a peer name.
    pub source: String,
    /// Absolute ms expiry.
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub context: Option<String>,
}

impl Memory {
    pub fn is_local(&self) -> bool {
        self.source == LOCAL_SOURCE
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.ttl, Some(ttl) if ttl < now_ms)
    }

    pub fn is_expired_for_cleanup(&self, now_ms: i64) -> bool {
        matches!(self.ttl, Some(ttl) if ttl <= now_ms)
    }
}

/// Partial update for `memory_update`. `None` fields are left
/// untouched; `tags`/`context`/`ttl` use a double `Option` only where clearing
/// a field must be distinguishable from leaving it alone — a write of
/// `Some(None)` for `ttl` clears
/// expiry, so we model those as plain `Option<T>` and treat "not present in the
/// JSON body" vs "explicitly null" identically (both leave the field unchanged when
/// omitted by callers that always build full patch objects).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<HashSet<String>>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub ttl: Option<Option<i64>>,
}

/// `{ local: ordered sequence of Memory, shared: mapping from peer-name to ordered
/// sequence of Memory }`, persisted as one document (`memory.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default, rename = "memories")]
    pub local: Vec<Memory>,
    #[serde(default)]
    pub shared: HashMap<String, Vec<Memory>>,
}

/// Filter parameters for `read`.
#[derive(Debug, Clone, Default)]
pub struct ReadFilter {
    pub category: Option<MemoryCategory>,
    pub tags: Option<Vec<String>>,
    pub source: Option<String>,
    pub limit: Option<usize>,
    pub include_shared: bool,
}

impl ReadFilter {
    pub fn new() -> Self {
        Self {
            include_shared: true,
            ..Default::default()
        }
    }
}

/// Result of `cleanupExpired`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CleanupResult {
    pub local_expired: usize,
    pub shared_expired: usize,
    pub total_remaining: usize,
}

/// Memory-count summary for status/introspection surfaces (not part of the
/// persisted document itself).
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryStats {
    pub local: usize,
    pub shared: HashMap<String, usize>,
}
