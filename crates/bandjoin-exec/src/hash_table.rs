//! Key → rows index with FIFO buckets.
//!
//! Each bucket keeps rows in the order they were inserted, which is the
//! order the relation cursor produced them. Rows with a `NULL` key are never
//! indexed: they can never satisfy key equality.

use std::mem;

use bandjoin_types::{RoleBinding, Row, Value};
use hashbrown::HashMap;

use crate::metrics::EstimateSize;

/// Hash table owned by a single join invocation.
#[derive(Debug, Default)]
pub struct BucketTable {
    buckets: HashMap<Value, Vec<Row>>,
    rows: usize,
}

impl BucketTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `row` to the bucket for `key`.
    pub fn insert(&mut self, key: Value, row: Row) {
        self.buckets.entry(key).or_default().push(row);
        self.rows += 1;
    }

    /// Index `row` under its key-role column. Returns `false` (and drops the
    /// row) when the key is `NULL` or missing.
    pub fn insert_bound(&mut self, binding: &RoleBinding, row: Row) -> bool {
        let Some(key) = binding.key(&row).cloned() else {
            return false;
        };
        self.insert(key, row);
        true
    }

    /// Rows stored under `key`, oldest first. Empty if the key is unknown.
    #[must_use]
    pub fn bucket(&self, key: &Value) -> &[Row] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn contains_key(&self, key: &Value) -> bool {
        self.buckets.contains_key(key)
    }

    /// Number of indexed rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl EstimateSize for BucketTable {
    fn estimated_bytes(&self) -> usize {
        let slot = mem::size_of::<Value>() + mem::size_of::<Vec<Row>>() + 1;
        let slots = self.buckets.capacity() * slot;
        let contents: usize = self
            .buckets
            .iter()
            .map(|(key, rows)| {
                let spare = (rows.capacity() - rows.len()) * mem::size_of::<Row>();
                key.estimated_bytes() - mem::size_of::<Value>()
                    + spare
                    + rows.iter().map(Row::estimated_bytes).sum::<usize>()
            })
            .sum();
        mem::size_of::<Self>() + slots + contents
    }
}
