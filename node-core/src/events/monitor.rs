//! C6 Event-Hook Monitor: periodic probes with edge detection and
//! per-hook cooldown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use node_config::EventHookConfig;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::fleet::{ExecuteOptions, FleetClient, FleetNode};
use crate::load::SystemLoadReader;
use crate::reasoning::{LlmProvider, ReasoningLoop, ReasoningMessage};
use crate::state::PersistedState;

use super::model::EventMonitorState;
use super::probes::evaluate;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Retry schedule for peer notification: one
/// initial attempt plus up to 3 retries, sleeping 1s/3s/5s between them.
const NOTIFY_RETRY_BACKOFFS_MS: [u64; 2] = [1_000, 3_000];

pub struct EventMonitor {
    hooks: Vec<EventHookConfig>,
    state: Arc<PersistedState<EventMonitorState>>,
    load: SystemLoadReader,
    reasoning: Arc<ReasoningLoop>,
    provider: Arc<dyn LlmProvider>,
    fleet_client: Arc<FleetClient>,
    peers: Arc<Vec<FleetNode>>,
    ticking: AtomicBool,
}

impl EventMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hooks: Vec<EventHookConfig>,
        state: Arc<PersistedState<EventMonitorState>>,
        load: SystemLoadReader,
        reasoning: Arc<ReasoningLoop>,
        provider: Arc<dyn LlmProvider>,
        fleet_client: Arc<FleetClient>,
        peers: Arc<Vec<FleetNode>>,
    ) -> Self {
        Self {
            hooks,
            state,
            load,
            reasoning,
            provider,
            fleet_client,
            peers,
            ticking: AtomicBool::new(false),
        }
    }

    /// One observation tick across every enabled hook. Hooks within
    /// a tick may be evaluated in parallel: each hook's probe, state
    /// update, and reaction are independent of the others so a join is safe.
    pub async fn tick(&self) {
        if self
            .ticking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("event monitor tick skipped: previous tick still running");
            return;
        }

        let futures = self
            .hooks
            .iter()
            .filter(|h| h.enabled)
            .map(|hook| self.run_hook(hook));
        futures::future::join_all(futures).await;

        self.ticking.store(false, Ordering::Release);
    }

    async fn run_hook(&self, hook: &EventHookConfig) {
        let now = now_ms();

        let last_triggered = self
            .state
            .lock()
            .await
            .hooks
            .get(&hook.name)
            .and_then(|s| s.last_triggered);
        if let Some(last_triggered) = last_triggered {
            if now - last_triggered < hook.cooldown_ms as i64 {
                return;
            }
        }

        let previous_value = self
            .state
            .lock()
            .await
            .hooks
            .get(&hook.name)
            .and_then(|s| s.last_value);

        let result = evaluate(&hook.event, previous_value, &self.load).await;

        self.state
            .mutate(|state| {
                let entry = state.hooks.entry(hook.name.clone()).or_default();
                entry.last_checked = Some(now);
                if let Some(value) = result.value {
                    entry.last_value = Some(value);
                    entry.last_status = Some(result.triggered);
                }
            })
            .await;

        let Some(message) = result.message.filter(|_| result.triggered) else {
            return;
        };

        self.state
            .mutate(|state| {
                let entry = state.hooks.entry(hook.name.clone()).or_default();
                entry.last_triggered = Some(now);
                entry.trigger_count += 1;
            })
            .await;

        info!(hook = %hook.name, %message, "event hook triggered");

        let messages = vec![ReasoningMessage::user(hook.prompt.clone())];
        if let Err(e) = self
            .reasoning
            .run(self.provider.as_ref(), messages, Vec::new())
            .await
        {
            warn!(hook = %hook.name, error = %e, "reasoning loop failed for triggered hook");
        }

        if hook.notify_peers {
            let notify_prompt = hook.peer_prompt.clone().unwrap_or(message);
            self.notify_peers(&notify_prompt).await;
        }
    }

    /// Up to 3 attempts per peer (one initial plus 2 retries), sleeping 1s/3s
    /// between them; any 2xx-equivalent success stops the retry loop for that
    /// peer.
    async fn notify_peers(&self, message: &str) {
        for peer in self.peers.iter() {
            let result = self
                .fleet_client
                .query_fleet_node(peer, message, ExecuteOptions::default())
                .await;
            if result.success {
                continue;
            }
            warn!(peer = %peer.name, error = ?result.error, "peer notification attempt failed");

            for (retry, delay_ms) in NOTIFY_RETRY_BACKOFFS_MS.into_iter().enumerate() {
                sleep(Duration::from_millis(delay_ms)).await;
                let result = self
                    .fleet_client
                    .query_fleet_node(peer, message, ExecuteOptions::default())
                    .await;
                if result.success {
                    break;
                }
                warn!(peer = %peer.name, retry, error = ?result.error, "peer notification retry failed");
            }
        }
    }

    pub async fn snapshot(&self) -> EventMonitorState {
        self.state.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReasoningError;
    use crate::reasoning::StreamEvent;
    use crate::tools::{ToolDefinition, ToolRegistry};
    use async_trait::async_trait;
    use node_config::EventKind;
    use tokio::sync::mpsc;

    struct SilentProvider;

    #[async_trait]
    impl LlmProvider for SilentProvider {
        async fn stream(
            &self,
            _messages: &[ReasoningMessage],
            _tools: &[ToolDefinition],
            tx: mpsc::Sender<StreamEvent>,
        ) -> Result<(), ReasoningError> {
            tx.send(StreamEvent::Text("handled".to_string())).await.ok();
            Ok(())
        }
    }

    fn hook(name: &str, event: EventKind, cooldown_ms: u64) -> EventHookConfig {
        EventHookConfig {
            name: name.to_string(),
            enabled: true,
            event,
            prompt: "investigate".to_string(),
            cooldown_ms,
            notify_peers: false,
            peer_prompt: None,
        }
    }

    fn monitor(hooks: Vec<EventHookConfig>) -> EventMonitor {
        let dir = tempfile::tempdir().unwrap();
        EventMonitor::new(
            hooks,
            Arc::new(PersistedState::load(dir.path().join("event-state.json"))),
            SystemLoadReader::new(),
            Arc::new(ReasoningLoop::new(Arc::new(ToolRegistry::new()), None)),
            Arc::new(SilentProvider),
            Arc::new(FleetClient::new(Default::default(), "test-node".to_string())),
            Arc::new(Vec::new()),
        )
    }

    /// Cooldown bounds the interval between two consecutive `lastTriggered`
    /// stamps, using a `file_missing` hook against a file that never exists so
    /// every tick would otherwise fire.
    #[tokio::test]
    async fn cooldown_prevents_refiring_within_the_window() {
        let path = "/this/file/does/not/exist/ever";
        let hook = hook(
            "missing",
            EventKind::FileMissing {
                path: path.to_string(),
            },
            60_000,
        );
        let m = monitor(vec![hook]);

        m.tick().await;
        let first = m.snapshot().await.hooks["missing"].trigger_count;
        m.tick().await;
        let second = m.snapshot().await.hooks["missing"].trigger_count;

        assert_eq!(first, 1);
        assert_eq!(second, 1, "second tick within cooldown must not re-fire");
    }

    #[tokio::test]
    async fn non_triggering_probe_still_updates_last_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("present.txt");
        std::fs::write(&path, "x").unwrap();
        let hook = hook(
            "present",
            EventKind::FileMissing {
                path: path.to_str().unwrap().to_string(),
            },
            60_000,
        );
        let m = monitor(vec![hook]);
        m.tick().await;
        let state = m.snapshot().await;
        assert!(state.hooks["present"].last_checked.is_some());
        assert_eq!(state.hooks["present"].trigger_count, 0);
    }
}
