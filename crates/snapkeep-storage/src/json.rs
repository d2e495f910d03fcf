//! JSON file-based snapshot storage.
//!
//! Each snapshot name is stored as its own JSON file, with an index that
//! records insertion order:
//! ```text
//! base_dir/
//!   index.json            # ["first", "second", ...], oldest first
//!   snapshots/
//!     <name>.json         # Snapshot record
//! ```

use crate::{Snapshot, SnapshotStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const INDEX_FILE: &str = "index.json";
const SNAPSHOT_DIR: &str = "snapshots";

/// JSON file-based snapshot store.
#[derive(Debug)]
pub struct JsonSnapshotStore {
    base_path: PathBuf,
    /// Names, oldest first. Mirrors `index.json`.
    order: Vec<String>,
}

impl JsonSnapshotStore {
    /// Open a store rooted at `base_path`, creating it if necessary.
    ///
    /// An existing index is reloaded; entries whose file has gone missing
    /// are dropped with a warning.
    pub async fn open(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(base_path.join(SNAPSHOT_DIR)).await?;

        let mut store = Self {
            base_path,
            order: Vec::new(),
        };

        let index_path = store.base_path.join(INDEX_FILE);
        match fs::read_to_string(&index_path).await {
            Ok(content) => {
                let names: Vec<String> = serde_json::from_str(&content).map_err(|e| {
                    StorageError::corrupted(format!("{}: {}", index_path.display(), e))
                })?;
                for name in names {
                    let path = store.snapshot_path(&name)?;
                    if fs::try_exists(&path).await? {
                        store.order.push(name);
                    } else {
                        warn!(name = %name, "Indexed snapshot file missing, dropping entry");
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Io(e)),
        }

        debug!(
            path = %store.base_path.display(),
            snapshots = store.order.len(),
            "Opened snapshot store"
        );
        Ok(store)
    }

    /// Get the file path for a snapshot name.
    fn snapshot_path(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty() {
            return Err(StorageError::invalid_key("Snapshot name cannot be empty"));
        }

        // No path traversal
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(StorageError::invalid_key(format!(
                "Snapshot name cannot be used as a file name: {}",
                name
            )));
        }

        Ok(self
            .base_path
            .join(SNAPSHOT_DIR)
            .join(format!("{name}.json")))
    }

    /// Write `order` to the index, then adopt it in memory.
    ///
    /// If the write fails the in-memory order is left as it was.
    async fn commit_order(&mut self, order: Vec<String>) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(&order)?;
        write_atomic(&self.base_path.join(INDEX_FILE), &content).await?;
        self.order = order;
        Ok(())
    }

    async fn read_snapshot(&self, name: &str) -> StorageResult<Option<Snapshot>> {
        let path = self.snapshot_path(name)?;
        debug!(path = %path.display(), "Reading snapshot");

        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn delete_file(&self, name: &str) -> StorageResult<()> {
        let path = self.snapshot_path(name)?;
        debug!(path = %path.display(), "Removing snapshot");

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// Write to a temp file, then rename over the destination.
async fn write_atomic(path: &Path, content: &str) -> StorageResult<()> {
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn put(&mut self, name: &str, snapshot: Snapshot) -> StorageResult<()> {
        let path = self.snapshot_path(name)?;
        debug!(path = %path.display(), "Writing snapshot");

        let content = serde_json::to_string_pretty(&snapshot)?;
        write_atomic(&path, &content).await?;

        let mut order: Vec<String> =
            self.order.iter().filter(|n| *n != name).cloned().collect();
        order.push(name.to_string());
        self.commit_order(order).await
    }

    async fn get(&self, name: &str) -> StorageResult<Option<Snapshot>> {
        if !self.order.iter().any(|n| n == name) {
            return Ok(None);
        }
        self.read_snapshot(name).await
    }

    async fn last_entry(&self) -> StorageResult<Option<(String, Snapshot)>> {
        let Some(name) = self.order.last() else {
            return Ok(None);
        };
        match self.read_snapshot(name).await? {
            Some(snapshot) => Ok(Some((name.clone(), snapshot))),
            None => Err(StorageError::corrupted(format!(
                "Indexed snapshot file missing: {name}"
            ))),
        }
    }

    async fn contains(&self, name: &str) -> StorageResult<bool> {
        Ok(self.order.iter().any(|n| n == name))
    }

    async fn remove(&mut self, name: &str) -> StorageResult<()> {
        self.delete_file(name).await?;
        if self.order.iter().any(|n| n == name) {
            let order = self.order.iter().filter(|n| *n != name).cloned().collect();
            self.commit_order(order).await?;
        }
        Ok(())
    }

    async fn clear(&mut self) -> StorageResult<()> {
        let mut remaining = self.order.clone();
        while let Some(name) = remaining.first() {
            if let Err(e) = self.delete_file(name).await {
                // Keep the index in step with the files that are still there.
                if let Err(index_err) = self.commit_order(remaining).await {
                    warn!(error = %index_err, "Failed to rewrite index after partial clear");
                }
                return Err(e);
            }
            remaining.remove(0);
        }
        self.commit_order(remaining).await
    }

    async fn names(&self) -> StorageResult<Vec<String>> {
        Ok(self.order.clone())
    }
}
