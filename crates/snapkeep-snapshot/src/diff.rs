//! Field-level structural diff between two captures.

use crate::capture::canonical;
use serde::Serialize;
use serde_json::Value;
use snapkeep_storage::FieldMap;
use std::fmt;

/// A single field whose value differs between two captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old: String,
    pub new: String,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.old, self.new)
    }
}

/// The differing fields between two captures, in declaration order.
///
/// An empty diff means every field is equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    changes: Vec<FieldChange>,
}

impl SnapshotDiff {
    /// The `"{old} -> {new}"` description for `field`, if it changed.
    pub fn get(&self, field: &str) -> Option<String> {
        self.change(field).map(ToString::to_string)
    }

    /// The full change record for `field`, if it changed.
    pub fn change(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.change(field).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldChange> {
        self.changes.iter()
    }

    /// Names of changed fields, in order.
    pub fn fields(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.field.as_str()).collect()
    }

    /// Field name -> `"{old} -> {new}"` pairs, in order.
    pub fn into_map(self) -> Vec<(String, String)> {
        self.changes
            .into_iter()
            .map(|c| {
                let description = c.to_string();
                (c.field, description)
            })
            .collect()
    }
}

impl fmt::Display for SnapshotDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in &self.changes {
            writeln!(f, "{}: {}", change.field, change)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SnapshotDiff {
    type Item = &'a FieldChange;
    type IntoIter = std::slice::Iter<'a, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Compare two captures field by field.
///
/// Two values are equal when they are structurally equal; nested object keys
/// may appear in any order. Fields are visited in `old`'s order, then any field only `new` has.
/// A field missing on one side compares as `null`.
pub fn diff_fields(old: &FieldMap, new: &FieldMap) -> SnapshotDiff {
    let missing = Value::Null;
    let mut changes = Vec::new();

    for (field, old_value) in old {
        let new_value = new.get(field).unwrap_or(&missing);
        push_if_changed(&mut changes, field, old_value, new_value);
    }
    for (field, new_value) in new.iter().filter(|(k, _)| !old.contains_key(*k)) {
        push_if_changed(&mut changes, field, &missing, new_value);
    }

    SnapshotDiff { changes }
}

fn push_if_changed(changes: &mut Vec<FieldChange>, field: &str, old: &Value, new: &Value) {
    // Object equality ignores key order; map fields may re-serialize in any order.
    if old == new {
        return;
    }
    let old = canonical(old);
    let new = canonical(new);
    if old != new {
        changes.push(FieldChange {
            field: field.to_string(),
            old,
            new,
        });
    }
}
