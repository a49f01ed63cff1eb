//! C5: authenticated HTTPS/mTLS requests to peers.

mod client;

pub use client::{
    DefaultClientIdentity, ExecuteOptions, FleetClient, FleetExecuteResult, HealthResult,
    RestartResult, SyncOutcome, ToolExecutedEntry, UpgradeResult,
};
pub use node_config::FleetNodeConfig as FleetNode;
