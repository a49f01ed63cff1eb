//! C8 Handoff Controller: round-robin peer selection with per-peer
//! success stats and failure quarantine.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;

use crate::fleet::FleetNode;
use crate::state::PersistedState;

use super::model::HandoffState;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct HandoffController {
    state: Arc<PersistedState<HandoffState>>,
}

impl HandoffController {
    pub fn new(state: Arc<PersistedState<HandoffState>>) -> Self {
        Self { state }
    }

    /// `selectNextPeer(peers)`: walks the ring starting at
    /// `(lastPeerIndex + 1) mod len(peers)`, returning the first non-quarantined
    /// peer, or the ring's first slot as a best-effort fallback if every peer is
    /// quarantined. Advances `lastPeerIndex` and bumps the chosen peer's
    /// `handoffs`/`lastUsed` as part of the same persisted mutation, since the
    /// spec counts a handoff at selection time regardless of outcome (§8 S3).
    pub async fn select_and_record(&self, peers: &[FleetNode]) -> Option<FleetNode> {
        if peers.is_empty() {
            return None;
        }
        let now = now_ms();
        let len = peers.len() as i64;

        let chosen_index = self
            .state
            .mutate(|state| {
                let start = (state.last_peer_index + 1).rem_euclid(len);
                let mut fallback = start;
                let mut chosen = None;
                for step in 0..len {
                    let idx = (start + step).rem_euclid(len);
                    let name = &peers[idx as usize].name;
                    let quarantined = state
                        .peer_stats
                        .get(name)
                        .is_some_and(|s| s.is_quarantined(now));
                    if !quarantined {
                        chosen = Some(idx);
                        break;
                    }
                    if step == 0 {
                        fallback = idx;
                    }
                }
                let idx = chosen.unwrap_or(fallback);
                state.last_peer_index = idx;
                let name = peers[idx as usize].name.clone();
                let stats = state.peer_stats.entry(name).or_default();
                stats.handoffs += 1;
                stats.last_used = Some(now);
                idx
            })
            .await;

        Some(peers[chosen_index as usize].clone())
    }

    /// Applies the outcome of a call made against `peer_name`: success
    /// resets `consecutiveFailures` and stamps `lastSuccess`; failure increments
    /// `consecutiveFailures`.
    pub async fn record_outcome(&self, peer_name: &str, success: bool) {
        let now = now_ms();
        self.state
            .mutate(|state| {
                let stats = state.peer_stats.entry(peer_name.to_string()).or_default();
                if success {
                    stats.successes += 1;
                    stats.consecutive_failures = 0;
                    stats.last_success = Some(now);
                } else {
                    stats.failures += 1;
                    stats.consecutive_failures += 1;
                }
            })
            .await;
    }

    /// Tries peers in ring order until `call` succeeds or `len(peers)` attempts
    /// have been made.
    pub async fn dispatch<F, Fut, T, E>(&self, peers: &[FleetNode], mut call: F) -> Option<(String, T)>
    where
        F: FnMut(FleetNode) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = peers.len();
        for _ in 0..attempts {
            let peer = self.select_and_record(peers).await?;
            let name = peer.name.clone();
            match call(peer).await {
                Ok(value) => {
                    self.record_outcome(&name, true).await;
                    return Some((name, value));
                }
                Err(_) => {
                    self.record_outcome(&name, false).await;
                }
            }
        }
        None
    }

    pub async fn snapshot(&self) -> HandoffState {
        self.state.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers(names: &[&str]) -> Vec<FleetNode> {
        names
            .iter()
            .map(|n| FleetNode {
                name: n.to_string(),
                url: format!("https://{n}.example"),
                token: None,
                client_cert: None,
                client_key: None,
            })
            .collect()
    }

    fn controller() -> HandoffController {
        HandoffController::new(Arc::new(PersistedState::load(
            tempfile::NamedTempFile::new().unwrap().path().to_path_buf(),
        )))
    }

    /// Round-robin fairness across healthy peers.
    #[tokio::test]
    async fn s3_round_robin_fairness_across_healthy_peers() {
        let c = controller();
        let p = peers(&["a", "b", "c"]);
        let mut order = Vec::new();
        for _ in 0..6 {
            let chosen = c.select_and_record(&p).await.unwrap();
            c.record_outcome(&chosen.name, true).await;
            order.push(chosen.name);
        }
        assert_eq!(order, vec!["a", "b", "c", "a", "b", "c"]);

        let state = c.state.snapshot().await;
        for name in ["a", "b", "c"] {
            assert_eq!(state.peer_stats[name].handoffs, 2);
        }
    }

    /// Three consecutive failures quarantine a peer.
    #[tokio::test]
    async fn s4_quarantine_after_three_consecutive_failures() {
        let c = controller();
        let p = peers(&["a", "b", "c"]);

        for _ in 0..3 {
            c.record_outcome("b", false).await;
        }
        c.state
            .mutate(|s| {
                s.peer_stats.get_mut("b").unwrap().last_used = Some(now_ms());
                // leave last_peer_index at -1 so the next selection starts at "a",
                // reaching "b"'s ring slot on the very next call.
                s.last_peer_index = -1;
            })
            .await;

        // "b" sits at ring index 1; selecting repeatedly must always skip it while
        // quarantined, regardless of where the ring walk starts.
        for _ in 0..6 {
            let chosen = c.select_and_record(&p).await.unwrap();
            assert_ne!(chosen.name, "b");
            c.record_outcome(&chosen.name, true).await;
        }
    }

    #[tokio::test]
    async fn fallback_returns_ring_slot_when_every_peer_quarantined() {
        let c = controller();
        let p = peers(&["a", "b"]);

        for name in ["a", "b"] {
            for _ in 0..3 {
                c.record_outcome(name, false).await;
            }
            c.state
                .mutate(|s| {
                    s.peer_stats.get_mut(name).unwrap().last_used = Some(now_ms());
                })
                .await;
        }

        let chosen = c.select_and_record(&p).await.unwrap();
        assert!(chosen.name == "a" || chosen.name == "b");
    }

    #[tokio::test]
    async fn dispatch_retries_until_success_bounded_by_peer_count() {
        let c = controller();
        let p = peers(&["a", "b", "c"]);
        let attempts = std::sync::atomic::AtomicU32::new(0);

        let result = c
            .dispatch(&p, |peer| {
                attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async move {
                    if peer.name == "a" {
                        Err(())
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert!(result.is_some());
        assert!(attempts.load(std::sync::atomic::Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn dispatch_gives_up_after_len_peers_attempts() {
        let c = controller();
        let p = peers(&["a", "b"]);

        let result: Option<(String, ())> = c.dispatch(&p, |_peer| async move { Err(()) }).await;
        assert!(result.is_none());
    }
}
