//! Snapshot name generation.
//!
//! Scheduled snapshots need a fresh name on every tick. Three styles are
//! supported:
//! - ULID-based: `snap_01hqxyz...` (unique, sorts chronologically)
//! - Timestamp-based: `snap-20261018T101530.123Z`
//! - Counter-based: `snap-1`, `snap-2`, ...

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use ulid::Ulid;

/// Default prefix for generated snapshot names.
pub const DEFAULT_PREFIX: &str = "snap";

/// Stateless snapshot name helpers.
pub struct SnapshotName;

impl SnapshotName {
    /// Generate a ULID-based name (newer = larger).
    pub fn ulid(prefix: &str) -> String {
        format!("{}_{}", prefix, Ulid::new().to_string().to_lowercase())
    }

    /// Generate a timestamp-based name with millisecond precision.
    pub fn timestamp(prefix: &str) -> String {
        format!("{}-{}", prefix, Utc::now().format("%Y%m%dT%H%M%S%.3fZ"))
    }
}

/// Monotonic counter producing `prefix-1`, `prefix-2`, ...
///
/// Safe to share between threads; every call yields a distinct name.
#[derive(Debug)]
pub struct NameCounter {
    prefix: String,
    next: AtomicU64,
}

impl NameCounter {
    /// Create a counter whose first name ends in `1`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    /// Produce the next name.
    pub fn next_name(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }

    /// Number of names handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::SeqCst) - 1
    }
}

impl Default for NameCounter {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
