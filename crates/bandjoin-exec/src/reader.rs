//! Relation readers.
//!
//! A [`Relation`] is a named, fixed-schema sequence of rows that can only be
//! read front to back through a [`RowCursor`]. Reading a relation twice
//! means opening a second cursor.

use std::cell::Cell;

use bandjoin_error::{BandJoinError, Result};
use bandjoin_types::{Row, RowValues, Value};
use hashbrown::HashSet;

/// Distinct join keys collected from one relation.
pub type KeySet = HashSet<Value>;

/// Single-pass cursor over a relation.
pub trait RowCursor {
    /// Next row, or `None` once the relation is exhausted.
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// A readable relation.
///
/// Row ordinals must be unique within a relation and identical for the same
/// row across cursors, including filtered ones.
pub trait Relation {
    /// Relation (table) name, used for schema role resolution.
    fn name(&self) -> &str;

    /// Column names in positional order.
    fn columns(&self) -> &[String];

    /// Open a cursor positioned before the first row.
    fn open(&self) -> Result<Box<dyn RowCursor + '_>>;

    /// Open a cursor over only the rows whose `key_column` value is in
    /// `keys`. `NULL` keys never qualify.
    fn open_filtered<'a>(
        &'a self,
        key_column: usize,
        keys: &'a KeySet,
    ) -> Result<Box<dyn RowCursor + 'a>> {
        Ok(Box::new(FilteredCursor {
            inner: self.open()?,
            key_column,
            keys,
        }))
    }
}

/// Key filter over a full scan.
struct FilteredCursor<'a> {
    inner: Box<dyn RowCursor + 'a>,
    key_column: usize,
    keys: &'a KeySet,
}

impl RowCursor for FilteredCursor<'_> {
    fn next_row(&mut self) -> Result<Option<Row>> {
        while let Some(row) = self.inner.next_row()? {
            let keep = row
                .get(self.key_column)
                .is_some_and(|key| !key.is_null() && self.keys.contains(key));
            if keep {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

/// Where an in-memory relation should pretend its source broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    OnOpen,
    AfterRows(u64),
}

/// Relation held in memory. Ordinals are scan positions.
#[derive(Debug, Clone)]
pub struct MemRelation {
    name: String,
    columns: Vec<String>,
    rows: Vec<RowValues>,
    failure: Option<InjectedFailure>,
    rows_read: Cell<u64>,
}

impl MemRelation {
    pub fn new<I, R>(name: impl Into<String>, columns: &[&str], rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = Value>,
    {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            rows: rows.into_iter().map(|r| r.into_iter().collect()).collect(),
            failure: None,
            rows_read: Cell::new(0),
        }
    }

    /// Make every cursor fail at the given point with `SourceUnavailable`.
    #[must_use]
    pub fn with_failure(mut self, failure: InjectedFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows handed out so far, across all cursors.
    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.rows_read.get()
    }
}

impl Relation for MemRelation {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn open(&self) -> Result<Box<dyn RowCursor + '_>> {
        if self.failure == Some(InjectedFailure::OnOpen) {
            return Err(BandJoinError::source_unavailable(
                &self.name,
                "injected failure on open",
            ));
        }
        Ok(Box::new(MemCursor {
            relation: self,
            position: 0,
        }))
    }
}

struct MemCursor<'a> {
    relation: &'a MemRelation,
    position: u64,
}

impl RowCursor for MemCursor<'_> {
    fn next_row(&mut self) -> Result<Option<Row>> {
        if let Some(InjectedFailure::AfterRows(limit)) = self.relation.failure {
            if self.position >= limit {
                return Err(BandJoinError::source_unavailable(
                    &self.relation.name,
                    format!("injected failure after {limit} rows"),
                ));
            }
        }
        let Some(values) = usize::try_from(self.position)
            .ok()
            .and_then(|idx| self.relation.rows.get(idx))
        else {
            return Ok(None);
        };
        let row = Row::new(self.position, values.iter().cloned());
        self.position += 1;
        self.relation.rows_read.set(self.relation.rows_read.get() + 1);
        Ok(Some(row))
    }
}

/// Drain a cursor into a vector.
pub fn collect_rows(cursor: &mut (dyn RowCursor + '_)) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = cursor.next_row()? {
        rows.push(row);
    }
    Ok(rows)
}
