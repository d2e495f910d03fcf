//! Structural capture and write-back of target fields.
//!
//! A target opts in by implementing [`Snapshotable`]. The default methods go
//! through serde: the target is encoded as a JSON object whose keys are its
//! fields in declaration order, which gives a deep, owned copy of every
//! value. State that serde skips is not captured; a type carries it across a
//! restore with [`Snapshotable::keep_uncaptured`]. Types that need entirely
//! different behaviour override [`Snapshotable::capture`] and
//! [`Snapshotable::apply`].

use crate::error::CaptureError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use snapkeep_storage::{FieldMap, Snapshot};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A live target shared between its owner and a snapshot manager.
pub type SharedTarget<T> = Arc<RwLock<T>>;

/// Capability to be captured into, and restored from, a [`FieldMap`].
pub trait Snapshotable: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Read every field into an owned, ordered mapping.
    fn capture(&self) -> Result<FieldMap, CaptureError> {
        capture_fields(self)
    }

    /// Overwrite the captured fields onto `self`.
    ///
    /// On error `self` is left unchanged.
    fn apply(&mut self, fields: &FieldMap) -> Result<(), CaptureError> {
        restore_fields(self, fields)
    }

    /// Move uncaptured state from `previous` onto the freshly restored `self`.
    ///
    /// Called by [`restore_fields`] after the captured fields are decoded.
    /// Types with `#[serde(skip)]` fields copy those fields back here; the
    /// default keeps nothing, so skipped fields hold their `Default`.
    fn keep_uncaptured(&mut self, _previous: Self) {}
}

/// Encode `target` into its ordered field mapping.
pub fn capture_fields<T: Serialize + ?Sized>(target: &T) -> Result<FieldMap, CaptureError> {
    match serde_json::to_value(target).map_err(CaptureError::Encode)? {
        Value::Object(fields) => Ok(fields),
        other => Err(CaptureError::Unsupported(value_kind(&other))),
    }
}

/// Write `fields` back onto `target`, field by field.
///
/// Captured fields of the target that are not in `fields` keep their current
/// value. Uncaptured state is handed to [`Snapshotable::keep_uncaptured`].
/// On error `target` is left unchanged.
pub fn restore_fields<T: Snapshotable>(
    target: &mut T,
    fields: &FieldMap,
) -> Result<(), CaptureError> {
    let mut merged = capture_fields(target)?;
    for (name, value) in fields {
        merged.insert(name.clone(), value.clone());
    }
    let restored: T =
        serde_json::from_value(Value::Object(merged)).map_err(CaptureError::Decode)?;
    let previous = std::mem::replace(target, restored);
    target.keep_uncaptured(previous);
    Ok(())
}

/// Decode a snapshot into a fresh, independent value of `T`.
pub fn decode<T: DeserializeOwned>(snapshot: &Snapshot) -> Result<T, CaptureError> {
    serde_json::from_value(Value::Object(snapshot.fields().clone())).map_err(CaptureError::Decode)
}

/// Canonical string form of a field value used for diffing.
///
/// Strings render without quotes; everything else as compact JSON.
pub fn canonical(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn read_target<T>(target: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, CaptureError> {
    target
        .read()
        .map_err(|e| CaptureError::LockPoisoned(e.to_string()))
}

pub(crate) fn write_target<T>(
    target: &RwLock<T>,
) -> Result<RwLockWriteGuard<'_, T>, CaptureError> {
    target
        .write()
        .map_err(|e| CaptureError::LockPoisoned(e.to_string()))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
