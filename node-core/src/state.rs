//! `PersistedState<T>`: the one read-modify-write discipline every `*State` document
//! (and the MemoryStore) follows.
//!
//! The mutex is held only across the in-memory mutation plus the synchronous disk
//! write, never across a suspension point such as an outbound HTTP call or a child
//! process invocation.

use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

/// A JSON document of type `T`, guarded by an async mutex, with whole-file
/// overwrite-on-save and default-on-missing/corrupt load.
pub struct PersistedState<T> {
    path: PathBuf,
    inner: Mutex<T>,
}

impl<T> PersistedState<T>
where
    T: DeserializeOwned + Serialize + Default,
{
    pub fn load(path: PathBuf) -> Self {
        let value = node_config::load_document(&path);
        Self {
            path,
            inner: Mutex::new(value),
        }
    }

    /// Locks the document for a read-modify-write. Callers must not hold the guard
    /// across an `.await` that performs network/process/disk I/O other than
    /// `save_locked` itself.
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().await
    }

    /// Persists the current in-memory value, logging (not propagating) failures.
    pub fn save_locked(&self, guard: &T) {
        if let Err(e) = node_config::save_document(&self.path, guard) {
            warn!(path = %self.path.display(), error = %e, "failed to persist state document");
        }
    }

    /// Convenience for the common case: lock, mutate, persist, unlock.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock().await;
        let result = f(&mut guard);
        self.save_locked(&guard);
        result
    }

    pub async fn snapshot(&self) -> T
    where
        T: Clone,
    {
        self.inner.lock().await.clone()
    }
}

pub type SharedState<T> = Arc<PersistedState<T>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
    struct Doc {
        count: u32,
    }

    #[tokio::test]
    async fn mutate_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let state: PersistedState<Doc> = PersistedState::load(path.clone());
        state
            .mutate(|d| {
                d.count += 1;
            })
            .await;

        let reloaded: PersistedState<Doc> = PersistedState::load(path);
        assert_eq!(reloaded.snapshot().await, Doc { count: 1 });
    }

    #[tokio::test]
    async fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let state: PersistedState<Doc> = PersistedState::load(path);
        assert_eq!(state.snapshot().await, Doc::default());
    }
}
