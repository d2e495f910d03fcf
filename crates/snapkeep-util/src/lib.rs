//! Shared utilities for snapkeep.
//!
//! - Logging setup with tracing
//! - Snapshot name generation (ULID, timestamp, counter)
//! - RAII-based timing for snapshot operations

pub mod id;
pub mod log;
pub mod timing;

pub use id::{NameCounter, SnapshotName, DEFAULT_PREFIX};
pub use log::{LogConfig, LogLevel};
pub use timing::{as_millis, TimingGuard};
