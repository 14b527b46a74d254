//! The band predicate: key equality plus a timestamp tolerance window.
//!
//! `key(l) == key(r) && |days(ts(l)) - days(ts(r))| <= max_days_diff`
//!
//! Keys are compared first. Timestamps are parsed only for key-equal pairs,
//! so a malformed date in a row that never meets a partner is not an error.

use bandjoin_error::{BandJoinError, Result};
use bandjoin_types::{CalendarDate, JoinSchema, RoleBinding, Row, Value};

/// Band predicate bound to a resolved schema.
#[derive(Debug, Clone, Copy)]
pub struct BandPredicate<'s> {
    left: &'s RoleBinding,
    right: &'s RoleBinding,
    max_days_diff: u64,
}

impl<'s> BandPredicate<'s> {
    #[must_use]
    pub fn new(schema: &'s JoinSchema, max_days_diff: u32) -> Self {
        Self {
            left: schema.left(),
            right: schema.right(),
            max_days_diff: u64::from(max_days_diff),
        }
    }

    #[must_use]
    pub const fn max_days_diff(&self) -> u64 {
        self.max_days_diff
    }

    /// Key equality alone. `NULL` keys never match.
    #[must_use]
    pub fn keys_equal(&self, left: &Row, right: &Row) -> bool {
        match (self.left.key(left), self.right.key(right)) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        }
    }

    /// Evaluate the full predicate for a (left-side row, right-side row) pair.
    ///
    /// # Errors
    ///
    /// [`BandJoinError::DataFormat`] if either timestamp of a key-equal pair
    /// is not a `YYYY-MM-DD` date.
    pub fn matches(&self, left: &Row, right: &Row) -> Result<bool> {
        if !self.keys_equal(left, right) {
            return Ok(false);
        }
        let l = timestamp(self.left, left)?;
        let r = timestamp(self.right, right)?;
        Ok(l.days_between(r) <= self.max_days_diff)
    }
}

/// Parse the timestamp-role column of `row`.
pub fn timestamp(binding: &RoleBinding, row: &Row) -> Result<CalendarDate> {
    let value = binding.timestamp(row).unwrap_or(&Value::Null);
    value
        .as_text()
        .and_then(CalendarDate::parse)
        .ok_or_else(|| BandJoinError::DataFormat {
            relation: binding.relation().to_owned(),
            value: describe(value),
        })
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::Text(s) => format!("'{s}'"),
        other => format!("{other} ({})", other.type_name()),
    }
}
