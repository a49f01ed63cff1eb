//! C8: round-robin peer selection with per-peer success stats and failure
//! quarantine.

mod controller;
mod model;

pub use controller::HandoffController;
pub use model::{HandoffState, PeerStats, QUARANTINE_FAILURE_THRESHOLD, QUARANTINE_WINDOW_MS};
