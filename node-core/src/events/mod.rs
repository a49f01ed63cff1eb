//! C6: periodic probes (disk, memory, load, services, files, commands, HTTP,
//! ports) with edge detection and per-hook cooldown.

mod model;
mod monitor;
mod probes;

pub use model::{EventMonitorState, EventState};
pub use monitor::EventMonitor;
pub use probes::EvalResult;
