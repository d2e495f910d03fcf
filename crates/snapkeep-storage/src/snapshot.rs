//! Snapshot data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name used when a snapshot is saved without an explicit name.
pub const DEFAULT_SNAPSHOT_NAME: &str = "default";

/// Ordered field name -> value mapping, in the target's declaration order.
pub type FieldMap = serde_json::Map<String, Value>;

/// An immutable capture of a target's fields at a point in time.
///
/// The field values are owned JSON values, so a snapshot never shares
/// memory with the live target it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was taken.
    captured_at: DateTime<Utc>,

    /// Captured field values.
    fields: FieldMap,
}

impl Snapshot {
    /// Create a snapshot from captured fields, stamped with the current time.
    pub fn new(fields: FieldMap) -> Self {
        Self {
            captured_at: Utc::now(),
            fields,
        }
    }

    /// When the snapshot was taken.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// All captured fields, in declaration order.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Look up a single captured field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of captured fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
