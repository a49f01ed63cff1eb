//! C9: periodic bidirectional memory exchange with fleet peers.

mod model;
mod sync;

pub use model::{KnowledgeSyncState, PeerSyncState};
pub use sync::KnowledgeSync;
