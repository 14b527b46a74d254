//! Semi-join.
//!
//! The left (driving) relation's distinct keys restrict which rows are
//! fetched from the right (probed) relation. The filtered rows are buffered
//! and compared against a second full scan of the driving relation in a
//! nested loop, so output follows driving-row order.

use std::time::Instant;

use bandjoin_error::Result;
use bandjoin_types::JoinSchema;
use tracing::debug;

use crate::config::JoinConfig;
use crate::dedup::EmittedPairs;
use crate::metrics::{FirstResultClock, JoinMetrics, MemoryEstimate};
use crate::predicate::BandPredicate;
use crate::reader::{KeySet, Relation, collect_rows};
use crate::sink::ResultSink;
use crate::Strategy;

/// Run the join with `driving` on the left and `probed` on the right.
///
/// Join-phase time and first-result latency are measured from the start of
/// the nested loop, after the key set and filtered buffer are ready. With
/// `config.semi_join_dedup` unset every match is emitted, including repeats
/// produced by duplicate rows.
///
/// # Errors
///
/// Propagates reader, timestamp, and sink failures.
pub fn semi_join(
    schema: &JoinSchema,
    driving: &dyn Relation,
    probed: &dyn Relation,
    config: &JoinConfig,
    sink: &mut dyn ResultSink,
) -> Result<JoinMetrics> {
    let predicate = BandPredicate::new(schema, config.max_days_diff);
    let driving_binding = schema.left();
    let probed_binding = schema.right();

    let keys = distinct_keys(schema, driving)?;
    let filter_start = Instant::now();
    let filtered = {
        let mut cursor = probed.open_filtered(probed_binding.key_index(), &keys)?;
        collect_rows(cursor.as_mut())?
    };
    debug!(
        driving = driving.name(),
        probed = probed.name(),
        distinct_keys = keys.len(),
        filtered_rows = filtered.len(),
        filter_s = filter_start.elapsed().as_secs_f64(),
        "probed relation filtered"
    );

    let join_start = Instant::now();
    let mut clock = FirstResultClock::starting_at(join_start);
    let mut seen = config.semi_join_dedup.map(EmittedPairs::new);
    let mut emitted = 0_u64;
    let mut cursor = driving.open()?;
    while let Some(driving_row) = cursor.next_row()? {
        if driving_binding.key(&driving_row).is_none() {
            continue;
        }
        for probed_row in &filtered {
            if !predicate.matches(&driving_row, probed_row)? {
                continue;
            }
            if let Some(seen) = seen.as_mut() {
                if !seen.insert(&driving_row, probed_row) {
                    continue;
                }
            }
            clock.observe();
            sink.emit(&driving_row, probed_row)?;
            emitted += 1;
        }
    }
    let join_time = join_start.elapsed();
    debug!(emitted, dedup = seen.is_some(), "semi-join complete");

    let mut memory = vec![
        MemoryEstimate::of("distinct_key_set", &keys),
        MemoryEstimate::of("filtered_probe_rows", &filtered),
    ];
    if let Some(seen) = &seen {
        memory.push(MemoryEstimate::of("emitted_pairs", seen));
    }

    Ok(JoinMetrics {
        strategy: Strategy::SemiJoin,
        variant: Strategy::SemiJoin.variant_label(!schema.is_inverted()),
        build_time_seconds: None,
        probe_time_seconds: None,
        join_phase_time_seconds: Some(join_time.as_secs_f64()),
        row_count: emitted,
        latency_to_first_result_seconds: clock.latency_seconds(),
        memory,
    })
}

/// Distinct non-`NULL` join keys of the left relation, in one pass.
pub fn distinct_keys(schema: &JoinSchema, driving: &dyn Relation) -> Result<KeySet> {
    let binding = schema.left();
    let mut keys = KeySet::new();
    let mut cursor = driving.open()?;
    while let Some(row) = cursor.next_row()? {
        if let Some(key) = binding.key(&row) {
            if !keys.contains(key) {
                keys.insert(key.clone());
            }
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use bandjoin_types::{Row, Value};

    use super::*;
    use crate::config::PairIdentity;
    use crate::metrics::EstimateSize;
    use crate::reader::MemRelation;
    use crate::sink::CollectSink;

    fn projects(rows: &[(i64, Option<&str>, &str)]) -> MemRelation {
        MemRelation::new(
            "Projects",
            &[],
            rows.iter().map(|(id, key, ts)| {
                vec![
                    Value::Integer(*id),
                    Value::from(*key),
                    Value::from(*ts),
                    Value::Integer(1000),
                ]
            }),
        )
    }

    fn employees(rows: &[(i64, &str, &str)]) -> MemRelation {
        MemRelation::new(
            "Employees",
            &[],
            rows.iter().map(|(id, key, ts)| {
                vec![
                    Value::Integer(*id),
                    Value::from(*key),
                    Value::from("Employee"),
                    Value::from(*ts),
                ]
            }),
        )
    }

    fn schema() -> JoinSchema {
        JoinSchema::resolve("Projects", &[], "Employees", &[], false).unwrap()
    }

    #[test]
    fn distinct_keys_skip_nulls_and_repeats() {
        let p = projects(&[
            (1, Some("X"), "2023-01-01"),
            (2, None, "2023-01-01"),
            (3, Some("X"), "2023-01-01"),
            (4, Some("Y"), "2023-01-01"),
        ]);
        let keys = distinct_keys(&schema(), &p).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&Value::from("X")));
        assert!(!keys.contains(&Value::Null));
    }

    #[test]
    fn output_follows_driving_order() {
        let p = projects(&[(1, Some("Y"), "2023-01-01"), (2, Some("X"), "2023-01-01")]);
        let e = employees(&[
            (10, "X", "2023-01-02"),
            (11, "Z", "2023-01-02"),
            (12, "Y", "2023-01-03"),
        ]);
        let mut sink = CollectSink::new();
        let metrics = semi_join(&schema(), &p, &e, &JoinConfig::default(), &mut sink).unwrap();
        assert_eq!(sink.ordinal_pairs(), vec![(0, 2), (1, 0)]);
        assert!(metrics.join_phase_time_seconds.is_some());
        assert!(metrics.memory_for("distinct_key_set").is_some());
        assert!(metrics.memory_for("filtered_probe_rows").is_some());
        assert!(metrics.memory_for("emitted_pairs").is_none());
    }

    #[test]
    fn duplicates_are_kept_unless_dedup_is_configured() {
        let p = projects(&[(1, Some("X"), "2023-01-01"), (1, Some("X"), "2023-01-01")]);
        let e = employees(&[(10, "X", "2023-01-01")]);

        let mut kept = CollectSink::new();
        semi_join(&schema(), &p, &e, &JoinConfig::default(), &mut kept).unwrap();
        assert_eq!(kept.rows().len(), 2);

        let config = JoinConfig::default().with_semi_join_dedup(Some(PairIdentity::Content));
        let mut deduped = CollectSink::new();
        let metrics = semi_join(&schema(), &p, &e, &config, &mut deduped).unwrap();
        assert_eq!(deduped.rows().len(), 1);
        assert!(metrics.memory_for("emitted_pairs").is_some());
    }

    #[test]
    fn probed_rows_outside_key_set_are_never_read_into_buffer() {
        let p = projects(&[(1, Some("X"), "2023-01-01")]);
        let e = employees(&[(10, "Y", "2023-01-01"), (11, "Z", "2023-01-01")]);
        let mut sink = CollectSink::new();
        let metrics = semi_join(&schema(), &p, &e, &JoinConfig::default(), &mut sink).unwrap();
        assert!(sink.rows().is_empty());
        assert!(metrics.latency_to_first_result_seconds.is_none());
        let buffered = metrics.memory_for("filtered_probe_rows").unwrap();
        assert_eq!(buffered.bytes, Vec::<Row>::new().estimated_bytes() as u64);
    }
}
