//! Rows as produced by a relation cursor.

use std::mem;

use smallvec::SmallVec;

use crate::value::Value;

/// Column values of one row. Both recognized relation shapes have arity 4,
/// so rows stay inline.
pub type RowValues = SmallVec<[Value; 4]>;

/// A row together with its identity.
///
/// `ordinal` identifies the row within its relation: the scan position for
/// in-memory relations, the rowid for SQLite tables. Two rows with identical
/// content but different ordinals are distinct rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row {
    ordinal: u64,
    values: RowValues,
}

impl Row {
    #[must_use]
    pub fn new(ordinal: u64, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            ordinal,
            values: values.into_iter().collect(),
        }
    }

    #[must_use]
    pub const fn ordinal(&self) -> u64 {
        self.ordinal
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn into_values(self) -> RowValues {
        self.values
    }

    /// Approximate footprint in bytes, including spilled value storage.
    #[must_use]
    pub fn estimated_bytes(&self) -> usize {
        let spilled = if self.values.spilled() {
            self.values.capacity() * mem::size_of::<Value>()
        } else {
            0
        };
        let heap: usize = self
            .values
            .iter()
            .map(|v| v.estimated_bytes() - mem::size_of::<Value>())
            .sum();
        mem::size_of::<Self>() + spilled + heap
    }
}
