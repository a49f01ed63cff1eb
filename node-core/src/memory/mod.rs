//! C2: persistent per-node knowledge base with categories, tags, TTL, and per-peer
//! shared partitions.

mod model;
mod store;

pub use model::{
    CleanupResult, Memory, MemoryCategory, MemoryPatch, MemoryStats, MemoryStore, ReadFilter,
    LOCAL_SOURCE,
};
pub use store::MemoryStoreHandle;
