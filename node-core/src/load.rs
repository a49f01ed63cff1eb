//! Normalized system load: 1-minute load average divided by CPU count.
//!
//! A single `sysinfo::System` is expensive to keep refreshing from many call
//! sites, so this wraps one behind a mutex and refreshes only the pieces each
//! reading needs.

use std::sync::Arc;

use sysinfo::System;
use tokio::sync::Mutex;

/// Shared, cheaply-cloned handle to the machine's resource readings.
#[derive(Clone)]
pub struct SystemLoadReader {
    inner: Arc<Mutex<System>>,
}

impl Default for SystemLoadReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemLoadReader {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(System::new_all())),
        }
    }

    /// 1-minute load average divided by the number of logical CPUs. `sysinfo`
    /// returns `0.0` for all load-average fields on platforms that don't expose
    /// one (notably some containers); callers treat that as "no load pressure".
    pub async fn normalized_load(&self) -> f64 {
        let system = self.inner.lock().await;
        let cpus = system.cpus().len().max(1) as f64;
        System::load_average().one / cpus
    }

    /// Used fraction of total memory.
    pub async fn memory_usage_fraction(&self) -> f64 {
        let mut system = self.inner.lock().await;
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return 0.0;
        }
        system.used_memory() as f64 / total as f64
    }

    /// Used fraction of the filesystem mounted at `mount_point` (default `/`).
    /// Returns `None` if no disk reports that mount point.
    pub async fn disk_usage_fraction(&self, mount_point: &str) -> Option<f64> {
        use sysinfo::Disks;
        let disks = Disks::new_with_refreshed_list();
        disks.iter().find_map(|disk| {
            if disk.mount_point().to_string_lossy() != mount_point {
                return None;
            }
            let total = disk.total_space();
            if total == 0 {
                return None;
            }
            let used = total.saturating_sub(disk.available_space());
            Some(used as f64 / total as f64)
        })
    }
}
