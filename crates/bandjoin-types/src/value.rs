//! Dynamically typed column values.
//!
//! The storage classes mirror SQLite's (`NULL`, `INTEGER`, `REAL`, `TEXT`)
//! because relations are usually read from SQLite files. Values are used as
//! hash keys, so `Real` compares by bit pattern.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

use serde::{Deserialize, Serialize};

/// A single column value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Whether this is SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if any.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Stable type label used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
        }
    }

    /// Approximate heap + inline footprint in bytes.
    #[must_use]
    pub fn estimated_bytes(&self) -> usize {
        let heap = match self {
            Self::Text(s) => s.capacity(),
            _ => 0,
        };
        mem::size_of::<Self>() + heap
    }

    fn real_bits(f: f64) -> u64 {
        // -0.0 and 0.0 must hash and compare equal.
        if f == 0.0 { 0 } else { f.to_bits() }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => Self::real_bits(*a) == Self::real_bits(*b),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Integer(i) => i.hash(state),
            Self::Real(f) => Self::real_bits(*f).hash(state),
            Self::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn signed_zero_is_one_key() {
        let mut set = HashSet::new();
        set.insert(Value::Real(0.0));
        assert!(set.contains(&Value::Real(-0.0)));
        assert_eq!(Value::Real(0.0), Value::Real(-0.0));
    }

    #[test]
    fn storage_classes_never_compare_equal() {
        assert_ne!(Value::Integer(1), Value::Real(1.0));
        assert_ne!(Value::Integer(1), Value::Text("1".to_owned()));
        assert_ne!(Value::Null, Value::Text(String::new()));
    }

    #[test]
    fn display_renders_null_as_empty() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from("A_1").to_string(), "A_1");
        assert_eq!(Value::from(42_i64).to_string(), "42");
    }

    #[test]
    fn json_is_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Integer(7),
            Value::from("x"),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,7,"x"]"#);
    }

    #[test]
    fn text_estimate_counts_heap() {
        let small = Value::Integer(1).estimated_bytes();
        let text = Value::Text("Employee_123".to_owned()).estimated_bytes();
        assert!(text >= small + "Employee_123".len());
    }
}
