//! Single-pass hash join.
//!
//! The left relation is fully materialized into a [`BucketTable`] before the
//! right relation is streamed through it. Every build row is inserted once
//! and every probe row visited once, so no pair can be considered twice and
//! no dedup set is needed. Output follows probe-row order; within one probe
//! row, matches follow bucket (build arrival) order.

use std::time::Instant;

use bandjoin_error::Result;
use bandjoin_types::JoinSchema;
use tracing::debug;

use crate::config::JoinConfig;
use crate::hash_table::BucketTable;
use crate::metrics::{FirstResultClock, JoinMetrics, MemoryEstimate};
use crate::predicate::BandPredicate;
use crate::reader::Relation;
use crate::sink::ResultSink;
use crate::Strategy;

/// Run the join with `build` as the left relation and `probe` as the right.
///
/// First-result latency is measured from the start of the build phase.
///
/// # Errors
///
/// Propagates reader, timestamp, and sink failures. Rows already emitted
/// are not retracted.
pub fn single_pass_hash_join(
    schema: &JoinSchema,
    build: &dyn Relation,
    probe: &dyn Relation,
    config: &JoinConfig,
    sink: &mut dyn ResultSink,
) -> Result<JoinMetrics> {
    let predicate = BandPredicate::new(schema, config.max_days_diff);
    let build_binding = schema.left();
    let probe_binding = schema.right();

    // ── Build Phase ─────────────────────────────────────────────────────

    let build_start = Instant::now();
    let mut clock = FirstResultClock::starting_at(build_start);
    let mut table = BucketTable::new();
    let mut null_keys = 0_u64;
    let mut cursor = build.open()?;
    while let Some(row) = cursor.next_row()? {
        if !table.insert_bound(build_binding, row) {
            null_keys += 1;
        }
    }
    drop(cursor);
    let build_time = build_start.elapsed();
    debug!(
        relation = build.name(),
        rows = table.len(),
        keys = table.bucket_count(),
        null_keys,
        "build phase complete"
    );

    // ── Probe Phase ─────────────────────────────────────────────────────

    let probe_start = Instant::now();
    let mut emitted = 0_u64;
    let mut probed = 0_u64;
    let mut cursor = probe.open()?;
    while let Some(probe_row) = cursor.next_row()? {
        probed += 1;
        let Some(key) = probe_binding.key(&probe_row) else {
            continue;
        };
        for build_row in table.bucket(key) {
            if predicate.matches(build_row, &probe_row)? {
                clock.observe();
                sink.emit(build_row, &probe_row)?;
                emitted += 1;
            }
        }
    }
    let probe_time = probe_start.elapsed();
    debug!(relation = probe.name(), rows = probed, emitted, "probe phase complete");

    Ok(JoinMetrics {
        strategy: Strategy::SinglePass,
        variant: Strategy::SinglePass.variant_label(schema.is_inverted()),
        build_time_seconds: Some(build_time.as_secs_f64()),
        probe_time_seconds: Some(probe_time.as_secs_f64()),
        join_phase_time_seconds: None,
        row_count: emitted,
        latency_to_first_result_seconds: clock.latency_seconds(),
        memory: vec![MemoryEstimate::of("build_hash_table", &table)],
    })
}
