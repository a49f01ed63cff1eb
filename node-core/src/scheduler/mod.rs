//! C7: interval/cron-lite dispatch of named tasks, with load-based guards and
//! peer handoff.

mod grammar;
mod model;
#[allow(clippy::module_inception)]
mod scheduler;

pub use grammar::parse_schedule;
pub use model::{SchedulerState, TaskResult, TaskState, MAX_RESPONSE_CHARS};
pub use scheduler::Scheduler;
