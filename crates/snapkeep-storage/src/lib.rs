//! Snapshot storage for snapkeep.
//!
//! This crate defines the keyed, insertion-ordered store a snapshot manager
//! writes into, with two backends:
//! - In-memory storage (default)
//! - JSON file storage, one file per snapshot name

pub mod error;
pub mod json;
pub mod memory;
pub mod snapshot;

pub use error::{StorageError, StorageResult};
pub use json::JsonSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use snapshot::{FieldMap, Snapshot, DEFAULT_SNAPSHOT_NAME};

use async_trait::async_trait;

/// A keyed store of snapshots.
///
/// Entries are ordered by insertion. Writing a name that already exists
/// replaces its snapshot and makes it the most recent entry. A store is
/// owned by a single manager, which serializes access to it; mutating
/// methods therefore take `&mut self`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Store a snapshot under `name`, replacing any existing one.
    async fn put(&mut self, name: &str, snapshot: Snapshot) -> StorageResult<()>;

    /// Read the snapshot stored under `name`.
    ///
    /// Returns `None` if the name doesn't exist.
    async fn get(&self, name: &str) -> StorageResult<Option<Snapshot>>;

    /// The most recently inserted entry.
    async fn last_entry(&self) -> StorageResult<Option<(String, Snapshot)>>;

    /// Check if a snapshot exists under `name`.
    async fn contains(&self, name: &str) -> StorageResult<bool>;

    /// Remove the snapshot under `name`. Removing an absent name is not an error.
    async fn remove(&mut self, name: &str) -> StorageResult<()>;

    /// Remove every snapshot.
    async fn clear(&mut self) -> StorageResult<()>;

    /// All stored names, oldest first.
    async fn names(&self) -> StorageResult<Vec<String>>;

    /// Number of stored snapshots.
    async fn len(&self) -> StorageResult<usize> {
        Ok(self.names().await?.len())
    }
}
