//! C9 Knowledge-Sync: periodic bidirectional memory exchange with
//! peers, over a dedicated `POST /v1/fleet/sync` endpoint; peers that don't
//! expose it (a 404) fall back to a prompt-embedded exchange carried over the
//! existing `/v1/fleet/execute` plumbing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use node_config::SyncConfig;
use tracing::{info, warn};

use crate::fleet::{ExecuteOptions, FleetClient, FleetNode, SyncOutcome};
use crate::memory::{Memory, MemoryStoreHandle};
use crate::state::PersistedState;

use super::model::KnowledgeSyncState;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Marks the start of the JSON payload in a prompt-embedded sync exchange.
/// Fragile by construction: it only works because both sides of the
/// conversation are this same implementation.
const SYNC_MARKER: &str = "===FLEET_SYNC_PAYLOAD===";

#[derive(serde::Serialize)]
struct SyncPayload<'a> {
    since: i64,
    memories: &'a [Memory],
}

#[derive(serde::Deserialize)]
struct SyncReply {
    memories: Vec<Memory>,
}

fn build_sync_prompt(since: i64, memories: &[Memory]) -> String {
    let payload = SyncPayload { since, memories };
    let body = serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string());
    format!(
        "You are receiving a knowledge-sync request from a fleet peer. Merge the \
         memories in the payload below into your shared store, then reply with a \
         line containing exactly `{marker}` followed by a JSON object \
         `{{\"memories\": [...]}}` listing your own local memories updated or \
         created after timestamp {since}. Payload: {marker}{body}",
        marker = SYNC_MARKER,
        since = since,
        body = body,
    )
}

fn parse_sync_reply(text: &str) -> Option<Vec<Memory>> {
    let idx = text.find(SYNC_MARKER)?;
    let tail = text[idx + SYNC_MARKER.len()..].trim();
    let reply: SyncReply = serde_json::from_str(tail).ok()?;
    Some(reply.memories)
}

fn categories_allow(memory: &Memory, config: &SyncConfig) -> bool {
    match &config.categories {
        Some(categories) => categories.contains(&memory.category),
        None => true,
    }
}

fn peer_allowed(peer: &str, config: &SyncConfig) -> bool {
    match &config.peers {
        Some(allowlist) => allowlist.iter().any(|p| p == peer),
        None => true,
    }
}

pub struct KnowledgeSync {
    config: SyncConfig,
    peers: Arc<Vec<FleetNode>>,
    memory: Arc<MemoryStoreHandle>,
    fleet_client: Arc<FleetClient>,
    state: Arc<PersistedState<KnowledgeSyncState>>,
    ticking: AtomicBool,
}

impl KnowledgeSync {
    pub fn new(
        config: SyncConfig,
        peers: Arc<Vec<FleetNode>>,
        memory: Arc<MemoryStoreHandle>,
        fleet_client: Arc<FleetClient>,
        state: Arc<PersistedState<KnowledgeSyncState>>,
    ) -> Self {
        Self {
            config,
            peers,
            memory,
            fleet_client,
            state,
            ticking: AtomicBool::new(false),
        }
    }

    /// One sync round across every configured peer. Peers are
    /// independent of each other, so a failure against one does not affect
    /// the others.
    pub async fn tick(&self) {
        if self
            .ticking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("knowledge-sync tick skipped: previous tick still running");
            return;
        }

        for peer in self.peers.iter() {
            if !peer_allowed(&peer.name, &self.config) {
                continue;
            }
            self.run_peer(peer).await;
        }

        self.ticking.store(false, Ordering::Release);
    }

    async fn run_peer(&self, peer: &FleetNode) {
        let since = self
            .state
            .lock()
            .await
            .peers
            .get(&peer.name)
            .map(|s| s.last_sync_time)
            .unwrap_or(0);

        let to_send: Vec<Memory> = self
            .memory
            .get_since(since)
            .await
            .into_iter()
            .filter(|m| m.is_local())
            .filter(|m| categories_allow(m, &self.config))
            .collect();

        let received = match self.fleet_client.sync_with_peer(peer, since, &to_send).await {
            SyncOutcome::Ok(memories) => Some(memories),
            SyncOutcome::NotSupported => self.fallback_prompt_exchange(peer, since, &to_send).await,
            SyncOutcome::Err(e) => {
                warn!(peer = %peer.name, error = %e, "knowledge-sync RPC failed, will retry same window next tick");
                None
            }
        };

        let Some(received) = received else {
            return;
        };

        self.memory.receive(&peer.name, received.clone()).await;

        let now = now_ms();
        self.state
            .mutate(|state| {
                let entry = state.peers.entry(peer.name.clone()).or_default();
                entry.last_sync_time = now;
                entry.last_sent_id = to_send.last().map(|m| m.id.clone());
                entry.last_received_id = received.last().map(|m| m.id.clone());
                entry.sync_count += 1;
            })
            .await;

        info!(
            peer = %peer.name,
            sent = to_send.len(),
            received = received.len(),
            "knowledge-sync round complete"
        );
    }

    async fn fallback_prompt_exchange(
        &self,
        peer: &FleetNode,
        since: i64,
        to_send: &[Memory],
    ) -> Option<Vec<Memory>> {
        let prompt = build_sync_prompt(since, to_send);
        let result = self
            .fleet_client
            .query_fleet_node(peer, &prompt, ExecuteOptions::default())
            .await;
        if !result.success {
            warn!(peer = %peer.name, error = ?result.error, "knowledge-sync prompt fallback failed, will retry same window next tick");
            return None;
        }
        let response = result.response?;
        match parse_sync_reply(&response) {
            Some(memories) => Some(memories),
            None => {
                warn!(peer = %peer.name, "knowledge-sync prompt fallback reply did not contain a parsable payload");
                None
            }
        }
    }

    pub async fn snapshot(&self) -> KnowledgeSyncState {
        self.state.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_marker_protocol() {
        let memories = vec![Memory {
            id: "m1".into(),
            category: crate::memory::MemoryCategory::Note,
            title: "t".into(),
            content: "c".into(),
            tags: Default::default(),
            created: 1,
            updated: None,
            source: "local".into(),
            ttl: None,
            context: None,
        }];
        let prompt = build_sync_prompt(0, &memories);
        assert!(prompt.contains(SYNC_MARKER));

        let reply = format!(
            "Sure, merged. {}{{\"memories\":[{{\"id\":\"m2\",\"category\":\"note\",\"title\":\"t2\",\"content\":\"c2\",\"tags\":[],\"created\":2,\"updated\":null,\"source\":\"local\",\"ttl\":null,\"context\":null}}]}}",
            SYNC_MARKER
        );
        let parsed = parse_sync_reply(&reply).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, "m2");
    }

    #[test]
    fn missing_marker_yields_none() {
        assert!(parse_sync_reply("no payload here").is_none());
    }

    #[tokio::test]
    async fn peer_not_in_allowlist_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(MemoryStoreHandle::new(Arc::new(PersistedState::load(
            dir.path().join("memory.json"),
        ))));
        let state = Arc::new(PersistedState::load(dir.path().join("memory-sync.json")));
        let peers = Arc::new(vec![FleetNode {
            name: "b".into(),
            url: "http://localhost:9".into(),
            token: None,
            client_cert: None,
            client_key: None,
        }]);
        let config = SyncConfig {
            interval_secs: 300,
            categories: None,
            peers: Some(vec!["a".into()]),
        };
        let sync = KnowledgeSync::new(
            config,
            peers,
            memory,
            Arc::new(FleetClient::new(Default::default(), "test-node".to_string())),
            state,
        );
        sync.tick().await;
        assert!(sync.snapshot().await.peers.is_empty());
    }
}
