//! Error type for the bandjoin engine.
//!
//! Every failure is terminal for the join invocation that raised it; nothing
//! in the engine retries.

use std::fmt;

use thiserror::Error;

/// Primary error type for bandjoin operations.
#[derive(Debug, Error)]
pub enum BandJoinError {
    /// The relation pair matches neither Employees/Projects assignment.
    #[error(
        "unrecognized relation pair `{left}` / `{right}`: expected one Employees-like and one Projects-like relation"
    )]
    UnrecognizedSchema { left: String, right: String },

    /// A relation could not be opened, or failed mid-read.
    #[error("relation `{relation}` unavailable: {detail}")]
    SourceUnavailable { relation: String, detail: String },

    /// A timestamp value is not a `YYYY-MM-DD` calendar date.
    #[error("relation `{relation}`: cannot parse timestamp {value} as YYYY-MM-DD")]
    DataFormat { relation: String, value: String },

    /// The result sink failed to accept output.
    #[error("result sink failed: {0}")]
    Sink(#[from] std::io::Error),

    /// Invalid configuration value or file.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BandJoinError {
    /// Build a [`BandJoinError::SourceUnavailable`] from any displayable cause.
    pub fn source_unavailable(relation: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::SourceUnavailable {
            relation: relation.into(),
            detail: cause.to_string(),
        }
    }

    /// Build a [`BandJoinError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error was raised before any row could have been consumed.
    pub const fn is_pre_read(&self) -> bool {
        matches!(self, Self::UnrecognizedSchema { .. } | Self::Config(_))
    }

    /// Stable label used in logs and reports.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnrecognizedSchema { .. } => "unrecognized_schema",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::DataFormat { .. } => "data_format",
            Self::Sink(_) => "sink",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result alias using [`BandJoinError`].
pub type Result<T> = std::result::Result<T, BandJoinError>;
