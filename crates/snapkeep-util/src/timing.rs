//! RAII-based timing for snapshot operations.
//!
//! # Example
//!
//! ```rust,ignore
//! use snapkeep_util::timing::TimingGuard;
//!
//! async fn tick(name: &str) {
//!     let _timing = TimingGuard::tick(name);
//!     // ... capture and store ...
//!     // Duration is logged when _timing is dropped
//! }
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Operations at least this slow log at info.
const INFO_THRESHOLD: Duration = Duration::from_millis(50);
/// Operations at least this slow log at warn.
const WARN_THRESHOLD: Duration = Duration::from_secs(1);

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// RAII guard that measures and logs the duration of an operation.
///
/// Fast operations log at debug, slower ones at info, and anything past one
/// second at warn.
pub struct TimingGuard {
    /// Kind of operation (e.g. "tick", "save", "restore")
    operation_type: &'static str,
    /// Snapshot name the operation acts on
    operation_name: String,
    start: Instant,
}

impl TimingGuard {
    /// Create a new timing guard.
    pub fn new(operation_type: &'static str, operation_name: impl Into<String>) -> Self {
        let operation_name = operation_name.into();
        debug!(
            operation_type = operation_type,
            operation_name = %operation_name,
            "Starting operation"
        );
        Self {
            operation_type,
            operation_name,
            start: Instant::now(),
        }
    }

    /// Timing guard for one scheduler tick.
    pub fn tick(name: impl Into<String>) -> Self {
        Self::new("tick", name)
    }

    /// Timing guard for a snapshot save.
    pub fn save(name: impl Into<String>) -> Self {
        Self::new("save", name)
    }

    /// Timing guard for a snapshot restore.
    pub fn restore(name: impl Into<String>) -> Self {
        Self::new("restore", name)
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let duration_ms = as_millis(elapsed);

        if elapsed >= WARN_THRESHOLD {
            warn!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                duration_ms,
                "Slow snapshot operation"
            );
        } else if elapsed >= INFO_THRESHOLD {
            info!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                duration_ms,
                "Snapshot operation completed"
            );
        } else {
            debug!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                duration_ms,
                "Snapshot operation completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_millis() {
        assert_eq!(as_millis(Duration::from_micros(2_500)), 2);
        assert_eq!(as_millis(Duration::from_secs(3)), 3_000);
        assert_eq!(as_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_timing_guards_log_on_drop() {
        let guards = [
            TimingGuard::tick("snap-1"),
            TimingGuard::save("default"),
            TimingGuard::restore("default"),
        ];
        assert_eq!(guards[0].operation_type, "tick");
        assert_eq!(guards[1].operation_type, "save");
        assert_eq!(guards[2].operation_name, "default");
        drop(guards);
    }
}
