//! Band-join execution: three strategies for joining an Employees-like and a
//! Projects-like relation on department equality plus a day tolerance
//! between their timestamps.
//!
//! [`run_join`] is the entry point. It resolves the schema before any row is
//! read, orients the relations, streams results into a [`ResultSink`], and
//! returns the invocation's [`JoinMetrics`].

pub mod compare;
pub mod config;
pub mod dedup;
pub mod hash_table;
pub mod metrics;
pub mod predicate;
pub mod reader;
pub mod semi_join;
pub mod single_pass;
pub mod sink;
pub mod sqlite;
pub mod symmetric;

use bandjoin_error::Result;
use bandjoin_types::JoinSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use compare::{Comparison, VariantOutcome, canonical_pairs, compare_outcomes, run_all_variants};
pub use config::{DEFAULT_MAX_DAYS_DIFF, JoinConfig, PairIdentity};
pub use metrics::{EstimateSize, JoinMetrics, MemoryEstimate};
pub use predicate::BandPredicate;
pub use reader::{InjectedFailure, KeySet, MemRelation, Relation, RowCursor, collect_rows};
pub use semi_join::semi_join;
pub use single_pass::single_pass_hash_join;
pub use sink::{CollectSink, CountingSink, CsvSink, JoinedRow, ResultSink, TeeSink};
pub use sqlite::SqliteRelation;
pub use symmetric::symmetric_hash_join;

/// The three join algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    SinglePass,
    Symmetric,
    SemiJoin,
}

impl Strategy {
    pub const ALL: [Self; 3] = [Self::SinglePass, Self::Symmetric, Self::SemiJoin];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SinglePass => "single_pass",
            Self::Symmetric => "symmetric",
            Self::SemiJoin => "semi_join",
        }
    }

    /// Accepts `as_str` names and the CLI spellings (`single-pass`, `semi`,
    /// `pipelined`).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "single_pass" | "single-pass" => Some(Self::SinglePass),
            "symmetric" | "pipelined" => Some(Self::Symmetric),
            "semi_join" | "semi-join" | "semi" => Some(Self::SemiJoin),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SinglePass => "Single pass hash join",
            Self::Symmetric => "Pipelined hash join",
            Self::SemiJoin => "Semi-join",
        }
    }

    const fn file_stem(self) -> &'static str {
        match self {
            Self::SinglePass => "single_pass_hash_join",
            Self::Symmetric => "pipelined_hash_join",
            Self::SemiJoin => "semi_join",
        }
    }

    /// Whether relation 2 is the left (build or driving) side.
    ///
    /// The hash joins build from relation 1 unless `invert_join` is set. The
    /// semi-join drives from relation 2 by default, so `invert_join` makes
    /// relation 1 drive.
    #[must_use]
    pub const fn relation_two_leads(self, invert_join: bool) -> bool {
        match self {
            Self::SinglePass | Self::Symmetric => invert_join,
            Self::SemiJoin => !invert_join,
        }
    }

    /// e.g. `"Semi-join (Large join Small)"`.
    #[must_use]
    pub fn variant_label(self, inverted: bool) -> String {
        let orientation = if inverted {
            "Large join Small"
        } else {
            "Small join Large"
        };
        format!("{} ({orientation})", self.label())
    }

    /// e.g. `"single_pass_hash_join_small_join_large.csv"`.
    #[must_use]
    pub fn csv_file_name(self, inverted: bool) -> String {
        let orientation = if inverted {
            "large_join_small"
        } else {
            "small_join_large"
        };
        format!("{}_{orientation}.csv", self.file_stem())
    }
}

/// Resolve the schema for `strategy`, with the left side chosen by
/// [`Strategy::relation_two_leads`].
pub fn resolve_schema(
    strategy: Strategy,
    first: &dyn Relation,
    second: &dyn Relation,
    invert_join: bool,
) -> Result<JoinSchema> {
    JoinSchema::resolve(
        first.name(),
        first.columns(),
        second.name(),
        second.columns(),
        strategy.relation_two_leads(invert_join),
    )
}

/// Run one join of relation 1 (`first`) with relation 2 (`second`).
///
/// The left side is chosen by [`Strategy::relation_two_leads`]. The sink
/// receives the header, every result in the strategy's emission order, and
/// a final `finish`.
///
/// # Errors
///
/// `UnrecognizedSchema` before any row is read; `SourceUnavailable`, `DataFormat`, or `Sink` during the
/// join.
pub fn run_join(
    strategy: Strategy,
    first: &dyn Relation,
    second: &dyn Relation,
    config: &JoinConfig,
    sink: &mut dyn ResultSink,
) -> Result<JoinMetrics> {
    let schema = resolve_schema(strategy, first, second, config.invert_join)?;
    let (left, right) = if schema.is_inverted() {
        (second, first)
    } else {
        (first, second)
    };
    info!(
        strategy = strategy.as_str(),
        left = left.name(),
        right = right.name(),
        max_days_diff = config.max_days_diff,
        "starting {}",
        strategy.variant_label(config.invert_join)
    );

    sink.begin(schema.header())?;
    let metrics = match strategy {
        Strategy::SinglePass => single_pass_hash_join(&schema, left, right, config, sink),
        Strategy::Symmetric => symmetric_hash_join(&schema, left, right, config, sink),
        Strategy::SemiJoin => semi_join(&schema, left, right, config, sink),
    }
    .inspect_err(|err| {
        tracing::error!(strategy = strategy.as_str(), kind = err.kind(), %err, "join aborted");
    })?;
    sink.finish()?;
    metrics.log();
    Ok(metrics)
}
