//! Snapshot lifecycle manager.

use crate::capture::{read_target, write_target, SharedTarget, Snapshotable};
use crate::diff::{diff_fields, SnapshotDiff};
use crate::error::{CaptureError, SnapshotError, SnapshotResult};
use crate::event::{ListenerRef, SnapshotEvent};
use snapkeep_storage::{
    FieldMap, MemorySnapshotStore, Snapshot, SnapshotStore, DEFAULT_SNAPSHOT_NAME,
};
use snapkeep_util::TimingGuard;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Captures, restores and compares states of a single shared target.
///
/// All store access is serialized through one async mutex, so saves from a
/// scheduler task and saves or restores from caller tasks never interleave.
/// The target's own lock is taken only for the duration of one capture or
/// one write-back: a caller that mutates the target in several steps and
/// needs a consistent capture must not race those steps against `save`.
///
/// Lock order is store, then target. Listeners run after both are released.
pub struct SnapshotManager<T: Snapshotable> {
    target: SharedTarget<T>,
    store: Mutex<Box<dyn SnapshotStore>>,
    listeners: RwLock<Vec<ListenerRef<T>>>,
}

impl<T: Snapshotable> SnapshotManager<T> {
    /// Manage `target` with an in-memory store.
    pub fn new(target: SharedTarget<T>) -> Self {
        Self::with_store(target, MemorySnapshotStore::new())
    }

    /// Manage `target` with the given store.
    pub fn with_store(target: SharedTarget<T>, store: impl SnapshotStore + 'static) -> Self {
        Self::with_boxed_store(target, Box::new(store))
    }

    /// Manage `target` with an already boxed store.
    pub fn with_boxed_store(target: SharedTarget<T>, store: Box<dyn SnapshotStore>) -> Self {
        Self {
            target,
            store: Mutex::new(store),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// The managed target.
    pub fn target(&self) -> &SharedTarget<T> {
        &self.target
    }

    /// Capture the target and store it under `name`, replacing any
    /// existing snapshot of that name.
    ///
    /// If capture fails nothing is written to the store.
    pub async fn save(&self, name: &str) -> SnapshotResult<Snapshot> {
        let _timing = TimingGuard::save(name);
        let snapshot = {
            let mut store = self.store.lock().await;
            let snapshot = Snapshot::new(self.capture()?);
            store.put(name, snapshot.clone()).await?;
            snapshot
        };
        debug!(name = %name, fields = snapshot.len(), "Saved snapshot");

        self.dispatch(SnapshotEvent::Saved {
            name: name.to_string(),
            target: self.target.clone(),
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    /// Save under the default name.
    pub async fn save_default(&self) -> SnapshotResult<Snapshot> {
        self.save(DEFAULT_SNAPSHOT_NAME).await
    }

    /// Write the snapshot stored under `name` back onto the target.
    ///
    /// Returns `Ok(false)` without touching the target if no such snapshot
    /// exists.
    pub async fn restore(&self, name: &str) -> SnapshotResult<bool> {
        let _timing = TimingGuard::restore(name);
        {
            let store = self.store.lock().await;
            let Some(snapshot) = store.get(name).await? else {
                debug!(name = %name, "No snapshot to restore");
                return Ok(false);
            };
            self.apply(&snapshot)?;
        }
        debug!(name = %name, "Restored snapshot");

        self.dispatch(SnapshotEvent::Restored {
            name: name.to_string(),
            target: self.target.clone(),
        });
        Ok(true)
    }

    /// Restore from the default name.
    pub async fn restore_default(&self) -> SnapshotResult<bool> {
        self.restore(DEFAULT_SNAPSHOT_NAME).await
    }

    /// Restore the most recently saved snapshot.
    ///
    /// Returns `Ok(false)` if the store is empty.
    pub async fn restore_last(&self) -> SnapshotResult<bool> {
        let name = {
            let store = self.store.lock().await;
            let Some((name, snapshot)) = store.last_entry().await? else {
                return Ok(false);
            };
            self.apply(&snapshot)?;
            name
        };
        debug!(name = %name, "Restored last snapshot");

        self.dispatch(SnapshotEvent::Restored {
            name,
            target: self.target.clone(),
        });
        Ok(true)
    }

    /// Compare the snapshot under `name` against the live target.
    ///
    /// Fails with [`SnapshotError::NotFound`] if `name` is absent; an empty
    /// diff always means "no differences".
    pub async fn diff(&self, name: &str) -> SnapshotResult<SnapshotDiff> {
        let store = self.store.lock().await;
        let snapshot = store
            .get(name)
            .await?
            .ok_or_else(|| SnapshotError::not_found(name))?;
        let current = self.capture()?;
        Ok(diff_fields(snapshot.fields(), &current))
    }

    /// Compare the default snapshot against the live target.
    pub async fn diff_default(&self) -> SnapshotResult<SnapshotDiff> {
        self.diff(DEFAULT_SNAPSHOT_NAME).await
    }

    /// Compare two stored snapshots, `old` first.
    ///
    /// Reports the first missing name if either is absent.
    pub async fn diff_between(&self, old: &str, new: &str) -> SnapshotResult<SnapshotDiff> {
        let store = self.store.lock().await;
        let old_snapshot = store
            .get(old)
            .await?
            .ok_or_else(|| SnapshotError::not_found(old))?;
        let new_snapshot = store
            .get(new)
            .await?
            .ok_or_else(|| SnapshotError::not_found(new))?;
        Ok(diff_fields(old_snapshot.fields(), new_snapshot.fields()))
    }

    /// Whether a snapshot is stored under `name`.
    pub async fn has_snapshot(&self, name: &str) -> SnapshotResult<bool> {
        Ok(self.store.lock().await.contains(name).await?)
    }

    /// Fetch a stored snapshot without touching the target.
    pub async fn get(&self, name: &str) -> SnapshotResult<Option<Snapshot>> {
        Ok(self.store.lock().await.get(name).await?)
    }

    /// Stored names, oldest first.
    pub async fn snapshot_names(&self) -> SnapshotResult<Vec<String>> {
        Ok(self.store.lock().await.names().await?)
    }

    /// Number of stored snapshots.
    pub async fn len(&self) -> SnapshotResult<usize> {
        Ok(self.store.lock().await.len().await?)
    }

    /// Whether the store holds no snapshots.
    pub async fn is_empty(&self) -> SnapshotResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove the snapshot under `name`. No event is dispatched.
    pub async fn remove(&self, name: &str) -> SnapshotResult<()> {
        self.store.lock().await.remove(name).await?;
        debug!(name = %name, "Removed snapshot");
        Ok(())
    }

    /// Remove the default snapshot.
    pub async fn remove_default(&self) -> SnapshotResult<()> {
        self.remove(DEFAULT_SNAPSHOT_NAME).await
    }

    /// Remove every snapshot. No event is dispatched.
    pub async fn clear(&self) -> SnapshotResult<()> {
        self.store.lock().await.clear().await?;
        debug!("Cleared snapshots");
        Ok(())
    }

    /// Run `action` against the target, then save under `name`.
    ///
    /// The target's write lock is held only while `action` runs and is
    /// released before the save captures.
    pub async fn run_and_save<F>(&self, action: F, name: &str) -> SnapshotResult<Snapshot>
    where
        F: FnOnce(&mut T),
    {
        {
            let mut target = write_target(&self.target)?;
            action(&mut target);
        }
        self.save(name).await
    }

    /// Run `action` against the target, then save under the default name.
    pub async fn run_and_save_default<F>(&self, action: F) -> SnapshotResult<Snapshot>
    where
        F: FnOnce(&mut T),
    {
        self.run_and_save(action, DEFAULT_SNAPSHOT_NAME).await
    }

    /// Register a closure listener. Listeners run in registration order.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&SnapshotEvent<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_listener_ref(Arc::new(listener));
    }

    /// Register any [`SnapshotListener`] implementation.
    pub fn add_listener_ref(&self, listener: ListenerRef<T>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn capture(&self) -> Result<FieldMap, CaptureError> {
        read_target(&self.target)?.capture()
    }

    fn apply(&self, snapshot: &Snapshot) -> Result<(), CaptureError> {
        write_target(&self.target)?.apply(snapshot.fields())
    }

    fn dispatch(&self, event: SnapshotEvent<T>) {
        // Clone so listeners can register further listeners without deadlocking.
        let listeners: Vec<ListenerRef<T>> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for listener in listeners {
            if let Err(e) = listener.on_event(&event) {
                warn!(
                    name = %event.name(),
                    kind = ?event.kind(),
                    error = %e,
                    "Snapshot listener failed"
                );
            }
        }
    }
}
