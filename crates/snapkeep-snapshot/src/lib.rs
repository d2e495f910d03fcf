//! Named state snapshots for snapkeep.
//!
//! This crate captures the fields of a shared value and lets you:
//! - Save named snapshots and restore any of them later
//! - Diff the live value (or another snapshot) against a snapshot
//! - Observe saves and restores through listeners
//! - Save periodically from a background scheduler
//!
//! # Example
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use snapkeep_snapshot::{Snapshotable, SnapshotManager};
//! use std::sync::{Arc, RwLock};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Document {
//!     title: String,
//!     words: u32,
//! }
//!
//! impl Snapshotable for Document {}
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = Arc::new(RwLock::new(Document { title: "draft".into(), words: 0 }));
//! let manager = SnapshotManager::new(doc.clone());
//!
//! manager.save("before-edit").await?;
//! doc.write().unwrap().words = 120;
//!
//! let diff = manager.diff("before-edit").await?;
//! assert_eq!(diff.get("words").as_deref(), Some("0 -> 120"));
//!
//! manager.restore("before-edit").await?;
//! # Ok(())
//! # }
//! ```

mod capture;
mod config;
mod diff;
mod error;
mod event;
mod manager;
mod scheduler;

pub use capture::{canonical, capture_fields, decode, restore_fields, SharedTarget, Snapshotable};
pub use config::{NameStrategy, ScheduleSettings, SnapkeepSettings, StoreSettings};
pub use diff::{diff_fields, FieldChange, SnapshotDiff};
pub use error::{CaptureError, SnapshotError, SnapshotResult};
pub use event::{listener, EventKind, ListenerRef, SnapshotEvent, SnapshotListener};
pub use manager::SnapshotManager;
pub use scheduler::{Condition, NameSupplier, Scheduler, SchedulerConfig, SchedulerState};

pub use snapkeep_storage::{
    FieldMap, JsonSnapshotStore, MemorySnapshotStore, Snapshot, SnapshotStore, StorageError,
    DEFAULT_SNAPSHOT_NAME,
};
