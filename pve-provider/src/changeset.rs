//! Typed changesets for partial updates.
//!
//! An update records every field whose planned value differs from the current
//! state, then marks each one applied once the cluster has accepted it. The
//! changeset doubles as the observable report of what an update did.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Placeholder stored instead of secret values.
const REDACTED: &str = "<redacted>";

/// One changed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
    pub applied: bool,
}

/// Changed fields of one resource, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Changeset {
    fields: BTreeMap<&'static str, FieldChange>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `field` if `old` and `new` differ. Returns whether it changed.
    pub fn track<T>(&mut self, field: &'static str, old: &T, new: &T) -> bool
    where
        T: Serialize + PartialEq + ?Sized,
    {
        if old == new {
            return false;
        }
        self.fields.insert(
            field,
            FieldChange {
                old: serde_json::to_value(old).unwrap_or(Value::Null),
                new: serde_json::to_value(new).unwrap_or(Value::Null),
                applied: false,
            },
        );
        true
    }

    /// Like [`track`](Self::track) but never stores the values themselves.
    pub fn track_sensitive<T>(&mut self, field: &'static str, old: &T, new: &T) -> bool
    where
        T: PartialEq + ?Sized,
    {
        if old == new {
            return false;
        }
        self.fields.insert(
            field,
            FieldChange {
                old: Value::String(REDACTED.to_string()),
                new: Value::String(REDACTED.to_string()),
                applied: false,
            },
        );
        true
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_changed(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.fields.get(field)
    }

    pub fn is_applied(&self, field: &str) -> bool {
        self.fields.get(field).is_some_and(|c| c.applied)
    }

    /// Mark one tracked field as applied. Untracked fields are ignored.
    pub fn mark_applied(&mut self, field: &str) {
        if let Some(change) = self.fields.get_mut(field) {
            change.applied = true;
        }
    }

    pub fn mark_all_applied(&mut self) {
        for change in self.fields.values_mut() {
            change.applied = true;
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldChange)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        self.fields()
            .filter(|(_, c)| c.applied)
            .map(|(k, _)| k)
            .collect()
    }

    pub fn pending_fields(&self) -> Vec<&'static str> {
        self.fields()
            .filter(|(_, c)| !c.applied)
            .map(|(k, _)| k)
            .collect()
    }
}
