//! Schema role resolution.
//!
//! Exactly two relation shapes are recognized: Employees-like
//! (`id, key, name, timestamp`) and Projects-like (`id, key, timestamp,
//! funding`). A join pairs one of each, in either order. Resolution happens
//! once, before any row is read, and yields a [`JoinSchema`] that every join
//! strategy consumes.

use bandjoin_error::{BandJoinError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::row::Row;
use crate::value::Value;

/// The two relation shapes this engine knows how to join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationShape {
    Employees,
    Projects,
}

impl RelationShape {
    /// Both shapes have four columns.
    pub const ARITY: usize = 4;

    /// The department column sits second in both shapes.
    pub const KEY_INDEX: usize = 1;

    /// Identify a shape from a relation (table) name, case-insensitively.
    #[must_use]
    pub fn from_relation_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("employees") {
            Some(Self::Employees)
        } else if name.eq_ignore_ascii_case("projects") {
            Some(Self::Projects)
        } else {
            None
        }
    }

    /// Canonical table name.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Employees => "Employees",
            Self::Projects => "Projects",
        }
    }

    #[must_use]
    pub const fn canonical_columns(self) -> [&'static str; 4] {
        match self {
            Self::Employees => ["EmployeeID", "Department", "Name", "HireDate"],
            Self::Projects => ["ProjectID", "Department", "StartDate", "Funding"],
        }
    }

    #[must_use]
    pub const fn timestamp_index(self) -> usize {
        match self {
            Self::Employees => 3,
            Self::Projects => 2,
        }
    }
}

/// Which of the two input relations a binding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationSlot {
    First,
    Second,
}

/// Role→column binding for one relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBinding {
    relation: String,
    slot: RelationSlot,
    shape: RelationShape,
    columns: Vec<String>,
    key_index: usize,
    timestamp_index: usize,
}

impl RoleBinding {
    fn bind(slot: RelationSlot, name: &str, columns: &[String]) -> Option<Self> {
        let shape = RelationShape::from_relation_name(name)?;
        let columns = if columns.is_empty() {
            shape
                .canonical_columns()
                .iter()
                .map(|c| (*c).to_owned())
                .collect()
        } else if columns.len() == RelationShape::ARITY {
            columns.to_vec()
        } else {
            return None;
        };
        Some(Self {
            relation: name.to_owned(),
            slot,
            shape,
            columns,
            key_index: RelationShape::KEY_INDEX,
            timestamp_index: shape.timestamp_index(),
        })
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    #[must_use]
    pub const fn slot(&self) -> RelationSlot {
        self.slot
    }

    #[must_use]
    pub const fn shape(&self) -> RelationShape {
        self.shape
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub const fn key_index(&self) -> usize {
        self.key_index
    }

    #[must_use]
    pub const fn timestamp_index(&self) -> usize {
        self.timestamp_index
    }

    /// The row's join key; `None` when the key is `NULL` or the row is short.
    #[must_use]
    pub fn key<'r>(&self, row: &'r Row) -> Option<&'r Value> {
        row.get(self.key_index()).filter(|v| !v.is_null())
    }

    #[must_use]
    pub fn timestamp<'r>(&self, row: &'r Row) -> Option<&'r Value> {
        row.get(self.timestamp_index())
    }
}

/// Resolved binding for a relation pair in one join configuration.
///
/// `left` is the relation whose columns come first in every output row. It
/// is also the build side of the single-pass join, the first-pulled side of
/// the symmetric join, and the driving side of the semi-join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSchema {
    left: RoleBinding,
    right: RoleBinding,
    header: Vec<String>,
}

impl JoinSchema {
    /// Resolve roles for relation 1 and relation 2.
    ///
    /// Empty column lists fall back to the shape's canonical column names.
    /// With `invert_join` set, relation 2 becomes the left side.
    ///
    /// # Errors
    ///
    /// [`BandJoinError::UnrecognizedSchema`] when the names do not form an
    /// Employees/Projects pair, or a column list has the wrong arity.
    pub fn resolve(
        first_name: &str,
        first_columns: &[String],
        second_name: &str,
        second_columns: &[String],
        invert_join: bool,
    ) -> Result<Self> {
        let unrecognized = || BandJoinError::UnrecognizedSchema {
            left: first_name.to_owned(),
            right: second_name.to_owned(),
        };
        let first = RoleBinding::bind(RelationSlot::First, first_name, first_columns)
            .ok_or_else(unrecognized)?;
        let second = RoleBinding::bind(RelationSlot::Second, second_name, second_columns)
            .ok_or_else(unrecognized)?;
        if first.shape == second.shape {
            return Err(unrecognized());
        }

        let (left, right) = if invert_join {
            (second, first)
        } else {
            (first, second)
        };
        let header = left
            .columns
            .iter()
            .chain(right.columns.iter())
            .cloned()
            .collect();

        debug!(
            left = %left.relation,
            right = %right.relation,
            invert_join,
            "join schema resolved"
        );

        Ok(Self {
            left,
            right,
            header,
        })
    }

    #[must_use]
    pub const fn left(&self) -> &RoleBinding {
        &self.left
    }

    #[must_use]
    pub const fn right(&self) -> &RoleBinding {
        &self.right
    }

    /// Output column names, left relation first.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Whether relation 2 is on the left.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.left.slot == RelationSlot::Second
    }

    /// Binding for relation 1 or relation 2, regardless of orientation.
    #[must_use]
    pub fn binding_for(&self, slot: RelationSlot) -> &RoleBinding {
        if self.left.slot == slot {
            &self.left
        } else {
            &self.right
        }
    }
}
