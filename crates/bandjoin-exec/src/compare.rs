//! Cross-variant result comparison.
//!
//! Outputs of different strategies and orientations are compared as sorted
//! multisets of (relation 1 part, relation 2 part) pairs, independent of
//! which relation was on the left.

use std::cmp::Ordering;

use bandjoin_error::Result;
use bandjoin_types::{JoinSchema, RelationSlot, Value};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::JoinConfig;
use crate::metrics::JoinMetrics;
use crate::reader::Relation;
use crate::sink::{CollectSink, JoinedRow, ResultSink, TeeSink};
use crate::{Strategy, resolve_schema, run_join};

/// One output row split back into its relation 1 and relation 2 values.
pub type CanonicalPair = (Vec<Value>, Vec<Value>);

/// Map joined rows to relation-1/relation-2 pairs and sort them.
#[must_use]
pub fn canonical_pairs(schema: &JoinSchema, rows: &[JoinedRow]) -> Vec<CanonicalPair> {
    let left_arity = schema.left().columns().len();
    let first_is_left = schema.left().slot() == RelationSlot::First;
    let mut pairs: Vec<CanonicalPair> = rows
        .iter()
        .map(|row| {
            let left = row.left_values(left_arity).to_vec();
            let right = row.right_values(left_arity).to_vec();
            if first_is_left {
                (left, right)
            } else {
                (right, left)
            }
        })
        .collect();
    pairs.sort_by(|a, b| compare_rows(&a.0, &b.0).then_with(|| compare_rows(&a.1, &b.1)));
    pairs
}

/// Total order over values: `NULL < Integer < Real < Text`, then by value.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Integer(_) => 1,
            Value::Real(_) => 2,
            Value::Text(_) => 3,
        }
    }
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Real(x), Value::Real(y)) => x.total_cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_rows(a: &[Value], b: &[Value]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| compare_values(x, y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Canonical output of one (strategy, orientation) variant.
#[derive(Debug, Clone)]
pub struct VariantOutcome {
    pub strategy: Strategy,
    pub inverted: bool,
    pub pairs: Vec<CanonicalPair>,
}

impl VariantOutcome {
    #[must_use]
    pub fn label(&self) -> String {
        self.strategy.variant_label(self.inverted)
    }
}

/// A variant whose canonical output differs from the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub variant: String,
    pub row_count: usize,
    /// Index of the first differing pair in sorted order.
    pub first_difference: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub reference: String,
    pub reference_row_count: usize,
    pub variants_compared: usize,
    pub divergences: Vec<Divergence>,
}

impl Comparison {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.divergences.is_empty()
    }

    #[must_use]
    pub fn first_divergence(&self) -> Option<&Divergence> {
        self.divergences.first()
    }
}

/// Compare every outcome against the first one.
#[must_use]
pub fn compare_outcomes(outcomes: &[VariantOutcome]) -> Comparison {
    let Some((reference, rest)) = outcomes.split_first() else {
        return Comparison {
            reference: String::new(),
            reference_row_count: 0,
            variants_compared: 0,
            divergences: Vec::new(),
        };
    };
    let divergences = rest
        .iter()
        .filter_map(|outcome| {
            let first_difference = reference
                .pairs
                .iter()
                .zip(&outcome.pairs)
                .position(|(a, b)| a != b)
                .or_else(|| {
                    (reference.pairs.len() != outcome.pairs.len())
                        .then_some(reference.pairs.len().min(outcome.pairs.len()))
                })?;
            Some(Divergence {
                variant: outcome.label(),
                row_count: outcome.pairs.len(),
                first_difference,
            })
        })
        .collect();
    Comparison {
        reference: reference.label(),
        reference_row_count: reference.pairs.len(),
        variants_compared: outcomes.len(),
        divergences,
    }
}

/// Run all three strategies in both orientations, feeding each variant's
/// output to the sink built by `make_sink` as well as to the comparison.
///
/// # Errors
///
/// The first join failure aborts the sweep.
pub fn run_all_variants<S, F>(
    first: &dyn Relation,
    second: &dyn Relation,
    config: &JoinConfig,
    mut make_sink: F,
) -> Result<(Vec<JoinMetrics>, Comparison)>
where
    S: ResultSink,
    F: FnMut(Strategy, bool) -> Result<S>,
{
    let mut metrics = Vec::with_capacity(6);
    let mut outcomes = Vec::with_capacity(6);
    for inverted in [false, true] {
        let variant_config = config.clone().inverted(inverted);
        for strategy in Strategy::ALL {
            let schema = resolve_schema(strategy, first, second, inverted)?;
            let mut sink = TeeSink(CollectSink::new(), make_sink(strategy, inverted)?);
            metrics.push(run_join(strategy, first, second, &variant_config, &mut sink)?);
            let TeeSink(collected, _) = sink;
            outcomes.push(VariantOutcome {
                strategy,
                inverted,
                pairs: canonical_pairs(&schema, collected.rows()),
            });
        }
    }

    let comparison = compare_outcomes(&outcomes);
    if let Some(divergence) = comparison.first_divergence() {
        warn!(
            reference = %comparison.reference,
            variant = %divergence.variant,
            rows = divergence.row_count,
            expected_rows = comparison.reference_row_count,
            "variant output differs"
        );
    } else {
        info!(
            variants = comparison.variants_compared,
            rows = comparison.reference_row_count,
            "all variants produced identical results"
        );
    }
    Ok((metrics, comparison))
}
