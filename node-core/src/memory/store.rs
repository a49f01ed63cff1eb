//! C2 Memory Store operations.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::MemoryError;
use crate::state::PersistedState;

use super::model::{
    CleanupResult, Memory, MemoryPatch, MemoryStats, MemoryStore, ReadFilter, LOCAL_SOURCE,
};
use node_config::MemoryCategory;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Handle shared across every subsystem that touches memory (the Tool Registry's
/// `memory_*` tools, Knowledge-Sync, the periodic TTL cleanup ticker).
pub struct MemoryStoreHandle {
    state: Arc<PersistedState<MemoryStore>>,
}

impl MemoryStoreHandle {
    pub fn new(state: Arc<PersistedState<MemoryStore>>) -> Self {
        Self { state }
    }

    /// `write(category, title, content, tags?, context?, ttl?) -> Memory`.
    pub async fn write(
        &self,
        category: MemoryCategory,
        title: String,
        content: String,
        tags: HashSet<String>,
        context: Option<String>,
        ttl: Option<i64>,
    ) -> Memory {
        let memory = Memory {
            id: Uuid::new_v4().to_string(),
            category,
            title,
            content,
            tags: tags.into_iter().map(|t| t.to_lowercase()).collect(),
            created: now_ms(),
            updated: None,
            source: LOCAL_SOURCE.to_string(),
            ttl,
            context,
        };
        self.state
            .mutate(|store| {
                store.local.push(memory.clone());
            })
            .await;
        memory
    }

    /// `read(filter) -> Memory[]`.
    pub async fn read(&self, filter: ReadFilter) -> Vec<Memory> {
        let now = now_ms();
        let store = self.state.snapshot().await;

        let mut candidates: Vec<Memory> = store.local.clone();
        if filter.include_shared {
            for memories in store.shared.values() {
                candidates.extend(memories.clone());
            }
        }

        let mut results: Vec<Memory> = candidates
            .into_iter()
            .filter(|m| !m.is_expired(now))
            .filter(|m| match filter.category {
                Some(c) => m.category == c,
                None => true,
            })
            .filter(|m| match &filter.tags {
                Some(tags) => tags.iter().any(|t| m.tags.contains(&t.to_lowercase())),
                None => true,
            })
            .filter(|m| match &filter.source {
                Some(source) => &m.source == source,
                None => true,
            })
            .collect();

        results.sort_by(|a, b| b.created.cmp(&a.created));
        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }
        results
    }

    /// `search(query, {category?, limit=5, includeShared=true}) -> Memory[]`.
    pub async fn search(
        &self,
        query: &str,
        category: Option<MemoryCategory>,
        limit: usize,
        include_shared: bool,
    ) -> Vec<Memory> {
        let now = now_ms();
        let needle = query.to_lowercase();
        let store = self.state.snapshot().await;

        let mut candidates: Vec<Memory> = store.local.clone();
        if include_shared {
            for memories in store.shared.values() {
                candidates.extend(memories.clone());
            }
        }

        let mut hits: Vec<(bool, Memory)> = candidates
            .into_iter()
            .filter(|m| !m.is_expired(now))
            .filter(|m| match category {
                Some(c) => m.category == c,
                None => true,
            })
            .filter_map(|m| {
                let title_match = m.title.to_lowercase().contains(&needle);
                let content_match = m.content.to_lowercase().contains(&needle);
                let tag_match = m.tags.iter().any(|t| t.contains(&needle));
                let context_match = m
                    .context
                    .as_ref()
                    .map(|c| c.to_lowercase().contains(&needle))
                    .unwrap_or(false);
                if title_match || content_match || tag_match || context_match {
                    Some((title_match, m))
                } else {
                    None
                }
            })
            .collect();

        // title-matches rank above non-title-matches, then by created desc.
        hits.sort_by(|(a_title, a), (b_title, b)| {
            b_title.cmp(a_title).then_with(|| b.created.cmp(&a.created))
        });

        hits.into_iter().take(limit).map(|(_, m)| m).collect()
    }

    /// `update(id, partial) -> Memory | not-found`. Local only.
    pub async fn update(&self, id: &str, patch: MemoryPatch) -> Result<Memory, MemoryError> {
        self.state
            .mutate(|store| {
                let memory = store
                    .local
                    .iter_mut()
                    .find(|m| m.id == id)
                    .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;
                if let Some(title) = patch.title {
                    memory.title = title;
                }
                if let Some(content) = patch.content {
                    memory.content = content;
                }
                if let Some(tags) = patch.tags {
                    memory.tags = tags.into_iter().map(|t| t.to_lowercase()).collect();
                }
                if let Some(context) = patch.context {
                    memory.context = Some(context);
                }
                if let Some(ttl) = patch.ttl {
                    memory.ttl = ttl;
                }
                memory.updated = Some(now_ms());
                Ok(memory.clone())
            })
            .await
    }

    /// `delete(id) -> boolean`. Local only.
    pub async fn delete(&self, id: &str) -> bool {
        self.state
            .mutate(|store| {
                let before = store.local.len();
                store.local.retain(|m| m.id != id);
                store.local.len() != before
            })
            .await
    }

    /// `receive(peer, memories[])`: idempotent merge into `shared[peer]`,
    /// deduped by id, always overwriting `source` to `peer`.
    pub async fn receive(&self, peer: &str, memories: Vec<Memory>) {
        self.state
            .mutate(|store| {
                let bucket = store.shared.entry(peer.to_string()).or_default();
                let mut seen: HashSet<String> = bucket.iter().map(|m| m.id.clone()).collect();
                for mut memory in memories {
                    memory.source = peer.to_string();
                    if seen.insert(memory.id.clone()) {
                        bucket.push(memory);
                    } else if let Some(existing) = bucket.iter_mut().find(|m| m.id == memory.id) {
                        *existing = memory;
                    }
                }
            })
            .await;
    }

    /// `getSince(timestamp) -> local memories where max(created, updated?) > timestamp`.
    pub async fn get_since(&self, timestamp: i64) -> Vec<Memory> {
        let store = self.state.snapshot().await;
        store
            .local
            .into_iter()
            .filter(|m| m.updated.unwrap_or(m.created) > timestamp)
            .collect()
    }

    /// Lightweight counts for status/introspection surfaces (e.g. `/v1/scheduler`):
    /// local memory count and per-peer shared memory counts.
    pub async fn stats(&self) -> MemoryStats {
        let store = self.state.snapshot().await;
        MemoryStats {
            local: store.local.len(),
            shared: store
                .shared
                .iter()
                .map(|(peer, memories)| (peer.clone(), memories.len()))
                .collect(),
        }
    }

    /// `cleanupExpired() -> {localExpired, sharedExpired, totalRemaining}`.
    pub async fn cleanup_expired(&self) -> CleanupResult {
        let now = now_ms();
        self.state
            .mutate(|store| {
                let local_before = store.local.len();
                store.local.retain(|m| !m.is_expired_for_cleanup(now));
                let local_expired = local_before - store.local.len();

                let mut shared_expired = 0;
                for bucket in store.shared.values_mut() {
                    let before = bucket.len();
                    bucket.retain(|m| !m.is_expired_for_cleanup(now));
                    shared_expired += before - bucket.len();
                }

                let total_remaining =
                    store.local.len() + store.shared.values().map(|b| b.len()).sum::<usize>();

                CleanupResult {
                    local_expired,
                    shared_expired,
                    total_remaining,
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn handle() -> MemoryStoreHandle {
        MemoryStoreHandle::new(Arc::new(PersistedState::load(
            tempfile::NamedTempFile::new().unwrap().path().to_path_buf(),
        )))
    }

    #[tokio::test]
    async fn ttl_excludes_expired_from_read_and_search() {
        let h = handle();
        let m = h
            .write(
                MemoryCategory::Note,
                "t".into(),
                "body".into(),
                HashSet::new(),
                None,
                Some(1),
            )
            .await;
        assert!(m.ttl.is_some());
        let read = h.read(ReadFilter::new()).await;
        assert!(read.is_empty());
        let search = h.search("body", None, 5, true).await;
        assert!(search.is_empty());
    }

    #[tokio::test]
    async fn receive_is_idempotent_and_overwrites_source() {
        let h = handle();
        let m = Memory {
            id: "m1".into(),
            category: MemoryCategory::Learning,
            title: "t".into(),
            content: "c".into(),
            tags: HashSet::new(),
            created: 1,
            updated: None,
            source: "bogus".into(),
            ttl: None,
            context: None,
        };
        h.receive("peer-a", vec![m.clone()]).await;
        h.receive("peer-a", vec![m]).await;
        let read = h.read(ReadFilter::new()).await;
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].source, "peer-a");
    }

    #[tokio::test]
    async fn update_only_applies_to_local_memories() {
        let h = handle();
        h.receive("peer-a", vec![Memory {
            id: "m1".into(),
            category: MemoryCategory::Learning,
            title: "t".into(),
            content: "c".into(),
            tags: HashSet::new(),
            created: 1,
            updated: None,
            source: "bogus".into(),
            ttl: None,
            context: None,
        }])
        .await;
        let err = h
            .update(
                "m1",
                MemoryPatch {
                    title: Some("new".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn cleanup_expired_matches_spec_s6() {
        let h = handle();
        let t0 = now_ms();
        h.write(MemoryCategory::Note, "a".into(), "x".into(), HashSet::new(), None, Some(t0 + 3_600_000))
            .await;
        h.write(MemoryCategory::Note, "b".into(), "x".into(), HashSet::new(), None, Some(t0 + 3_600_000))
            .await;
        h.write(MemoryCategory::Note, "never".into(), "x".into(), HashSet::new(), None, None)
            .await;
        h.write(MemoryCategory::Note, "d".into(), "x".into(), HashSet::new(), None, Some(t0 - 1))
            .await;

        // simulate clock advance by rewriting ttl relative comparisons: cleanup at t0+2h
        // is emulated by writing a store snapshot with adjusted "now" via direct mutation.
        let result = h
            .cleanup_expired_at_for_test(t0 + 7_200_000)
            .await;
        assert_eq!(result.local_expired, 3);
        assert_eq!(result.shared_expired, 0);

        let remaining = h.read(ReadFilter { limit: Some(100), ..ReadFilter::new() }).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "never");
    }

    impl MemoryStoreHandle {
        async fn cleanup_expired_at_for_test(&self, now: i64) -> CleanupResult {
            self.state
                .mutate(|store| {
                    let local_before = store.local.len();
                    store.local.retain(|m| !m.is_expired_for_cleanup(now));
                    let local_expired = local_before - store.local.len();
                    let mut shared_expired = 0;
                    for bucket in store.shared.values_mut() {
                        let before = bucket.len();
                        bucket.retain(|m| !m.is_expired_for_cleanup(now));
                        shared_expired += before - bucket.len();
                    }
                    let total_remaining = store.local.len()
                        + store.shared.values().map(|b| b.len()).sum::<usize>();
                    CleanupResult {
                        local_expired,
                        shared_expired,
                        total_remaining,
                    }
                })
                .await
        }
    }
}
