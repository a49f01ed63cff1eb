//! Process lifecycle state machine: `starting -> serving ->
//! {draining-for-restart | draining-for-upgrade} -> exited`. During draining no
//! new ticks are allowed to start; the caller is responsible for not spawning
//! further ticker iterations once `is_draining()` is true.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

const STARTING: u8 = 0;
const SERVING: u8 = 1;
const DRAINING_FOR_RESTART: u8 = 2;
const DRAINING_FOR_UPGRADE: u8 = 3;
const EXITED: u8 = 4;

pub struct Lifecycle(AtomicU8);

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self(AtomicU8::new(STARTING))
    }

    pub fn mark_serving(&self) {
        self.0.store(SERVING, Ordering::Release);
    }

    pub fn begin_draining_for_restart(&self) {
        self.0.store(DRAINING_FOR_RESTART, Ordering::Release);
    }

    pub fn begin_draining_for_upgrade(&self) {
        self.0.store(DRAINING_FOR_UPGRADE, Ordering::Release);
    }

    pub fn mark_exited(&self) {
        self.0.store(EXITED, Ordering::Release);
    }

    pub fn is_draining(&self) -> bool {
        matches!(self.0.load(Ordering::Acquire), DRAINING_FOR_RESTART | DRAINING_FOR_UPGRADE)
    }
}

/// `upgrade-state.json`. Self-upgrade's binary downloader is out of
/// scope, so `upgrade_in_progress`/`previous_version` exist
/// for the persisted shape but this build never sets them true.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpgradeState {
    #[serde(default)]
    pub last_check_time: Option<i64>,
    #[serde(default)]
    pub last_check_version: Option<String>,
    #[serde(default)]
    pub upgrade_in_progress: bool,
    #[serde(default)]
    pub previous_version: Option<String>,
}

/// Set by a supervisor (systemd, a process manager) to tell the daemon it will
/// be restarted externally, so restart/upgrade handlers can exit immediately
/// instead of going through the drain-then-exit dance.
pub fn under_supervisor() -> bool {
    std::env::var("NODE_SUPERVISED").is_ok()
}
