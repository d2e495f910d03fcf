//! In-memory snapshot storage.

use crate::{Snapshot, SnapshotStore, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;

/// In-memory snapshot store.
///
/// This keeps all snapshots in process memory and is not persistent.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: HashMap<String, Snapshot>,
    /// Names, oldest first.
    order: Vec<String>,
}

impl MemorySnapshotStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn unlink(&mut self, name: &str) {
        self.order.retain(|n| n != name);
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn put(&mut self, name: &str, snapshot: Snapshot) -> StorageResult<()> {
        if self.entries.insert(name.to_string(), snapshot).is_some() {
            self.unlink(name);
        }
        self.order.push(name.to_string());
        Ok(())
    }

    async fn get(&self, name: &str) -> StorageResult<Option<Snapshot>> {
        Ok(self.entries.get(name).cloned())
    }

    async fn last_entry(&self) -> StorageResult<Option<(String, Snapshot)>> {
        Ok(self.order.last().and_then(|name| {
            self.entries
                .get(name)
                .map(|snapshot| (name.clone(), snapshot.clone()))
        }))
    }

    async fn contains(&self, name: &str) -> StorageResult<bool> {
        Ok(self.entries.contains_key(name))
    }

    async fn remove(&mut self, name: &str) -> StorageResult<()> {
        if self.entries.remove(name).is_some() {
            self.unlink(name);
        }
        Ok(())
    }

    async fn clear(&mut self) -> StorageResult<()> {
        self.entries.clear();
        self.order.clear();
        Ok(())
    }

    async fn names(&self) -> StorageResult<Vec<String>> {
        Ok(self.order.clone())
    }

    async fn len(&self) -> StorageResult<usize> {
        Ok(self.entries.len())
    }
}
