//! Lifecycle events and listeners.

use crate::capture::{decode, SharedTarget, Snapshotable};
use crate::error::CaptureError;
use snapkeep_storage::Snapshot;
use std::sync::Arc;

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Saved,
    Restored,
}

/// A save or restore that just happened.
///
/// Events are dispatched after the store and target locks are released, so
/// listeners may read the target or call back into the manager.
pub enum SnapshotEvent<T> {
    /// A snapshot was captured and stored.
    Saved {
        name: String,
        target: SharedTarget<T>,
        snapshot: Snapshot,
    },
    /// A stored snapshot was written back onto the target.
    Restored { name: String, target: SharedTarget<T> },
}

impl<T: Snapshotable> SnapshotEvent<T> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Saved { .. } => EventKind::Saved,
            Self::Restored { .. } => EventKind::Restored,
        }
    }

    /// Snapshot name the event refers to.
    pub fn name(&self) -> &str {
        match self {
            Self::Saved { name, .. } | Self::Restored { name, .. } => name,
        }
    }

    /// The live target.
    pub fn target(&self) -> &SharedTarget<T> {
        match self {
            Self::Saved { target, .. } | Self::Restored { target, .. } => target,
        }
    }

    /// The snapshot produced by a save.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::Saved { snapshot, .. } => Some(snapshot),
            Self::Restored { .. } => None,
        }
    }

    /// Decode the saved snapshot into an independent value.
    pub fn saved_state(&self) -> Option<Result<T, CaptureError>> {
        self.snapshot().map(decode::<T>)
    }
}

/// Callback invoked synchronously for every event of a manager.
///
/// An error is logged by the manager; it never undoes the save or restore
/// that triggered the event.
pub trait SnapshotListener<T>: Send + Sync {
    fn on_event(&self, event: &SnapshotEvent<T>) -> anyhow::Result<()>;
}

impl<T, F> SnapshotListener<T> for F
where
    F: Fn(&SnapshotEvent<T>) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, event: &SnapshotEvent<T>) -> anyhow::Result<()> {
        self(event)
    }
}

/// Shared listener handle.
pub type ListenerRef<T> = Arc<dyn SnapshotListener<T>>;

/// Wrap a closure for use in a scheduler configuration.
pub fn listener<T, F>(listener: F) -> ListenerRef<T>
where
    T: 'static,
    F: Fn(&SnapshotEvent<T>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(listener)
}
