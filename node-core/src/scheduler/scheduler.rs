//! C7 Scheduler: interval/cron-lite dispatch of named tasks, with
//! load-based guards and peer handoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use node_config::ScheduledTaskConfig;
use tracing::{info, warn};

use crate::fleet::{ExecuteOptions, FleetClient, FleetNode};
use crate::handoff::HandoffController;
use crate::load::SystemLoadReader;
use crate::reasoning::{LlmProvider, ReasoningLoop, ReasoningMessage};
use crate::state::PersistedState;
use crate::tools::ToolRegistry;

use super::grammar::parse_schedule;
use super::model::{truncate_response, SchedulerState, TaskResult, TaskState};

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct Scheduler {
    tasks: Vec<ScheduledTaskConfig>,
    state: Arc<PersistedState<SchedulerState>>,
    handoff: Arc<HandoffController>,
    fleet_client: Arc<FleetClient>,
    peers: Arc<Vec<FleetNode>>,
    load: SystemLoadReader,
    reasoning: Arc<ReasoningLoop>,
    provider: Arc<dyn LlmProvider>,
    /// Non-reentrant tick guard: a slow tick still
    /// running when the next timer fires causes that firing to be skipped
    /// rather than queued.
    ticking: AtomicBool,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tasks: Vec<ScheduledTaskConfig>,
        state: Arc<PersistedState<SchedulerState>>,
        handoff: Arc<HandoffController>,
        fleet_client: Arc<FleetClient>,
        peers: Arc<Vec<FleetNode>>,
        load: SystemLoadReader,
        reasoning: Arc<ReasoningLoop>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            tasks,
            state,
            handoff,
            fleet_client,
            peers,
            load,
            reasoning,
            provider,
            ticking: AtomicBool::new(false),
        }
    }

    /// Runs one observation tick across every enabled task. Tasks
    /// are evaluated sequentially within the tick.
    /// Returns immediately, doing nothing, if a previous tick is still running.
    pub async fn tick(&self) {
        if self
            .ticking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("scheduler tick skipped: previous tick still running");
            return;
        }

        let current_load = self.load.normalized_load().await;
        for task in self.tasks.iter().filter(|t| t.enabled) {
            self.run_task(task, current_load).await;
        }

        self.ticking.store(false, Ordering::Release);
    }

    async fn run_task(&self, task: &ScheduledTaskConfig, current_load: f64) {
        let interval_ms = parse_schedule(&task.schedule) as i64 * 1000;
        let now = now_ms();

        let last_run = self
            .state
            .lock()
            .await
            .tasks
            .get(&task.name)
            .and_then(|s| s.last_run);
        let due = match last_run {
            Some(last_run) => now - last_run >= interval_ms,
            None => true,
        };
        if !due {
            return;
        }

        if let Some(reason) = condition_violation(task, current_load) {
            self.record(task, now, TaskResult::Skipped, &reason, false)
                .await;
            return;
        }

        if let Some(handoff) = &task.handoff {
            if handoff.enabled && current_load > handoff.load_threshold {
                self.run_handoff(task, handoff, now).await;
                return;
            }
        }

        self.run_locally(task, now).await;
    }

    async fn run_handoff(
        &self,
        task: &ScheduledTaskConfig,
        handoff: &node_config::HandoffTaskConfig,
        now: i64,
    ) {
        let prompt = handoff.prompt.as_deref().unwrap_or(&task.prompt);
        let candidates: Vec<FleetNode> = match &handoff.peers {
            Some(names) => self
                .peers
                .iter()
                .filter(|p| names.contains(&p.name))
                .cloned()
                .collect(),
            None => (*self.peers).clone(),
        };

        if candidates.is_empty() {
            self.record(
                task,
                now,
                TaskResult::Error,
                "handoff enabled but no eligible peers configured",
                true,
            )
            .await;
            return;
        }

        let client = self.fleet_client.clone();
        let prompt = prompt.to_string();
        let outcome = self
            .handoff
            .dispatch(&candidates, move |peer| {
                let client = client.clone();
                let prompt = prompt.clone();
                async move {
                    let result = client
                        .query_fleet_node(&peer, &prompt, ExecuteOptions::default())
                        .await;
                    if result.success {
                        Ok(result.response.unwrap_or_default())
                    } else {
                        Err(result.error.unwrap_or_else(|| "handoff failed".to_string()))
                    }
                }
            })
            .await;

        match outcome {
            Some((peer_name, response)) => {
                info!(task = %task.name, peer = %peer_name, "handed off task to peer");
                self.record(
                    task,
                    now,
                    TaskResult::Handoff,
                    &format!("handed off to {peer_name}: {response}"),
                    false,
                )
                .await;
            }
            None => {
                self.record(
                    task,
                    now,
                    TaskResult::Error,
                    "handoff exhausted all peers without success",
                    true,
                )
                .await;
            }
        }
    }

    async fn run_locally(&self, task: &ScheduledTaskConfig, now: i64) {
        let tools = Vec::new();
        let messages = vec![ReasoningMessage::user(task.prompt.clone())];
        match self
            .reasoning
            .run(self.provider.as_ref(), messages, tools)
            .await
        {
            Ok(outcome) => {
                self.record(task, now, TaskResult::Success, &outcome.final_text, false)
                    .await;
            }
            Err(e) => {
                self.record(task, now, TaskResult::Error, &e.to_string(), true)
                    .await;
            }
        }
    }

    async fn record(
        &self,
        task: &ScheduledTaskConfig,
        now: i64,
        result: TaskResult,
        response: &str,
        is_error: bool,
    ) {
        self.state
            .mutate(|state| {
                let entry = state.tasks.entry(task.name.clone()).or_default();
                entry.last_run = Some(now);
                entry.last_result = Some(result);
                entry.last_response = truncate_response(response);
                if matches!(result, TaskResult::Success | TaskResult::Error) {
                    entry.run_count += 1;
                }
                if is_error {
                    entry.error_count += 1;
                }
            })
            .await;
    }

    pub async fn snapshot(&self) -> SchedulerState {
        self.state.snapshot().await
    }
}

/// `maxLoad` set and load exceeds it, or `minLoad` set and load is under it.
/// Returns the human-readable skip reason used for `lastResponse`.
fn condition_violation(task: &ScheduledTaskConfig, current_load: f64) -> Option<String> {
    let condition = task.condition?;
    if let Some(max_load) = condition.max_load {
        if current_load > max_load {
            return Some(format!("{:.2} > maxLoad {:.1}", current_load, max_load));
        }
    }
    if let Some(min_load) = condition.min_load {
        if current_load < min_load {
            return Some(format!("{:.2} < minLoad {:.1}", current_load, min_load));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReasoningError;
    use crate::reasoning::StreamEvent;
    use async_trait::async_trait;
    use node_config::TaskCondition;
    use tokio::sync::mpsc;

    struct StaticProvider(&'static str);

    #[async_trait]
    impl LlmProvider for StaticProvider {
        async fn stream(
            &self,
            _messages: &[ReasoningMessage],
            _tools: &[crate::tools::ToolDefinition],
            tx: mpsc::Sender<StreamEvent>,
        ) -> Result<(), ReasoningError> {
            tx.send(StreamEvent::Text(self.0.to_string())).await.ok();
            Ok(())
        }
    }

    fn task(name: &str, schedule: &str) -> ScheduledTaskConfig {
        ScheduledTaskConfig {
            name: name.to_string(),
            schedule: schedule.to_string(),
            prompt: "do the thing".to_string(),
            enabled: true,
            condition: None,
            handoff: None,
        }
    }

    fn scheduler(tasks: Vec<ScheduledTaskConfig>, response: &'static str) -> Scheduler {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ToolRegistry::new());
        Scheduler::new(
            tasks,
            Arc::new(PersistedState::load(dir.path().join("scheduler-state.json"))),
            Arc::new(HandoffController::new(Arc::new(PersistedState::load(
                dir.path().join("handoff-state.json"),
            )))),
            Arc::new(FleetClient::new(Default::default(), "test-node".to_string())),
            Arc::new(Vec::new()),
            SystemLoadReader::new(),
            Arc::new(ReasoningLoop::new(registry, None)),
            Arc::new(StaticProvider(response)),
        )
    }

    /// A task with `condition.maxLoad=0.5` against a load of 0.9 is skipped
    /// with the exact-shaped reason string, and no prompt executes.
    #[tokio::test]
    async fn s2_scheduler_skip_by_max_load() {
        let mut t = task("watch", "@every 1m");
        t.condition = Some(TaskCondition {
            max_load: Some(0.5),
            min_load: None,
        });
        let scheduler = scheduler(vec![t], "should not run");

        let violation = condition_violation(&scheduler.tasks[0], 0.9).unwrap();
        assert!(violation.contains("0.90 > maxLoad 0.5"));

        scheduler.tick().await;
        let state = scheduler.snapshot().await;
        let task_state = &state.tasks["watch"];
        assert_eq!(task_state.last_result, Some(TaskResult::Skipped));
        assert!(task_state.last_response.contains("maxLoad"));
        assert_eq!(task_state.run_count, 0);
    }

    #[tokio::test]
    async fn executes_locally_when_due_and_not_skipped() {
        let t = task("greet", "@every 1s");
        let scheduler = scheduler(vec![t], "hello from the model");
        scheduler.tick().await;
        let state = scheduler.snapshot().await;
        let task_state = &state.tasks["greet"];
        assert_eq!(task_state.last_result, Some(TaskResult::Success));
        assert_eq!(task_state.last_response, "hello from the model");
        assert_eq!(task_state.run_count, 1);
    }

    #[tokio::test]
    async fn not_due_yet_is_a_noop() {
        let t = task("rare", "@every 1h");
        let scheduler = scheduler(vec![t], "x");
        scheduler.tick().await;
        scheduler.tick().await;
        let state = scheduler.snapshot().await;
        assert_eq!(state.tasks["rare"].run_count, 1);
    }

    #[tokio::test]
    async fn response_longer_than_500_chars_is_truncated() {
        let t = task("verbose", "@every 1s");
        let long: String = "x".repeat(900);
        let scheduler = scheduler(vec![t], Box::leak(long.into_boxed_str()));
        scheduler.tick().await;
        let state = scheduler.snapshot().await;
        assert_eq!(state.tasks["verbose"].last_response.chars().count(), 500);
    }
}
