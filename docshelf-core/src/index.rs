//! Secondary indexes over a single document field.
//!
//! An index maps each distinct field value to a bucket of primary keys. Buckets hold keys,
//! never documents, so the document set stays the single owner of every document.

use indexmap::{IndexSet, set::Slice};
use std::collections::HashMap;

use crate::value::FieldValue;

/// Equality index for one field: field value to the primary keys sharing it.
///
/// Keys inside a bucket keep the order they were added in. A key appears at most once per
/// bucket and buckets that become empty are dropped.
#[derive(Debug, Clone)]
pub struct SecondaryIndex {
    field: String,
    buckets: HashMap<FieldValue, IndexSet<FieldValue>>,
}

impl SecondaryIndex {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            buckets: HashMap::new(),
        }
    }

    /// Returns the name of the indexed field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Adds `key` to the bucket for `value`, creating the bucket if needed.
    ///
    /// Returns `false` if the key was already in that bucket.
    pub fn insert(&mut self, value: FieldValue, key: FieldValue) -> bool {
        self.buckets.entry(value).or_default().insert(key)
    }

    /// Removes `key` from the bucket for `value`, pruning the bucket once it is empty.
    ///
    /// Returns `false` if the key was not in that bucket.
    pub fn remove(&mut self, value: &FieldValue, key: &FieldValue) -> bool {
        let Some(bucket) = self.buckets.get_mut(value) else {
            return false;
        };

        if !bucket.shift_remove(key) {
            return false;
        }

        if bucket.is_empty() {
            self.buckets.remove(value);
        }

        true
    }

    /// Moves `key` from the bucket for `from` to the bucket for `to`.
    ///
    /// Always removes before inserting, so a key never sits in two buckets of one index.
    pub fn relocate(&mut self, from: &FieldValue, to: FieldValue, key: &FieldValue) {
        if from == &to {
            return;
        }

        self.remove(from, key);
        self.insert(to, key.clone());
    }

    /// Returns the keys in the bucket for `value`, in bucket order.
    pub fn get(&self, value: &FieldValue) -> &Slice<FieldValue> {
        self.buckets
            .get(value)
            .map(IndexSet::as_slice)
            .unwrap_or_default()
    }

    /// Returns the number of distinct values currently indexed.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
