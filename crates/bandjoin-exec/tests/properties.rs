//! Property tests: every strategy agrees with an exhaustive nested-loop band
//! join on randomly generated relations.

use std::collections::HashSet;

use bandjoin_exec::semi_join::distinct_keys;
use bandjoin_exec::{
    BandPredicate, CollectSink, JoinConfig, MemRelation, PairIdentity, Relation, Strategy,
    collect_rows, run_join,
};
use bandjoin_types::{CalendarDate, JoinSchema, Row, Value};
use proptest::prelude::*;

// ─── Helpers ───────────────────────────────────────────────────────────

/// `(key, day offset)`; `None` keys become `NULL`.
type Layout = Vec<(Option<u8>, i64)>;

fn date(offset: i64) -> Value {
    let base = CalendarDate::from_ymd(2023, 1, 1).expect("valid date");
    Value::from(base.add_days(offset).to_string())
}

fn key(k: Option<u8>) -> Value {
    k.map_or(Value::Null, |k| Value::from(format!("A_{k}")))
}

fn projects(layout: &Layout) -> MemRelation {
    MemRelation::new(
        "Projects",
        &[],
        layout.iter().enumerate().map(|(i, &(k, d))| {
            vec![Value::Integer(i as i64), key(k), date(d), Value::Integer(1000)]
        }),
    )
}

fn employees(layout: &Layout) -> MemRelation {
    MemRelation::new(
        "Employees",
        &[],
        layout.iter().enumerate().map(|(i, &(k, d))| {
            vec![Value::Integer(i as i64), key(k), Value::from("E"), date(d)]
        }),
    )
}

fn rows(relation: &MemRelation) -> Vec<Row> {
    collect_rows(relation.open().expect("open").as_mut()).expect("scan")
}

/// Sorted `(relation 1 ordinal, relation 2 ordinal)` pairs of the naive join.
fn naive(first: &MemRelation, second: &MemRelation, config: &JoinConfig) -> Vec<(u64, u64)> {
    let schema = JoinSchema::resolve(first.name(), &[], second.name(), &[], false).expect("schema");
    let predicate = BandPredicate::new(&schema, config.max_days_diff);
    let second_rows = rows(second);
    let mut pairs = Vec::new();
    for a in rows(first) {
        for b in &second_rows {
            if predicate.matches(&a, b).expect("dates are well formed") {
                pairs.push((a.ordinal(), b.ordinal()));
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Run through `run_join` and return sorted relation-1/relation-2 ordinals.
fn joined(
    strategy: Strategy,
    first: &MemRelation,
    second: &MemRelation,
    config: &JoinConfig,
) -> (Vec<(u64, u64)>, CollectSink) {
    let mut sink = CollectSink::new();
    run_join(strategy, first, second, config, &mut sink).expect("join");
    let mut pairs: Vec<(u64, u64)> = sink
        .ordinal_pairs()
        .into_iter()
        .map(|(l, r)| {
            if strategy.relation_two_leads(config.invert_join) {
                (r, l)
            } else {
                (l, r)
            }
        })
        .collect();
    pairs.sort_unstable();
    (pairs, sink)
}

fn relation_layout() -> impl proptest::strategy::Strategy<Value = Layout> {
    prop::collection::vec((prop::option::weighted(0.9, 0..4_u8), 0..24_i64), 0..14)
}

// ─── Properties ────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn every_strategy_matches_nested_loop(
        p in relation_layout(),
        e in relation_layout(),
        tolerance in 0..8_u32,
        invert in any::<bool>(),
    ) {
        let p = projects(&p);
        let e = employees(&e);
        let config = JoinConfig::default().with_max_days_diff(tolerance).inverted(invert);
        let expected = naive(&p, &e, &config);
        for strategy in Strategy::ALL {
            let (pairs, _) = joined(strategy, &p, &e, &config);
            prop_assert_eq!(&pairs, &expected, "{:?} invert={}", strategy, invert);
        }
    }

    #[test]
    fn symmetric_never_repeats_an_identity(
        p in relation_layout(),
        e in relation_layout(),
        tolerance in 0..8_u32,
    ) {
        let p = projects(&p);
        let e = employees(&e);
        let config = JoinConfig::default().with_max_days_diff(tolerance);
        let (pairs, _) = joined(Strategy::Symmetric, &p, &e, &config);
        let unique: HashSet<_> = pairs.iter().copied().collect();
        prop_assert_eq!(unique.len(), pairs.len());
    }

    #[test]
    fn content_dedup_collapses_to_distinct_contents(
        p in relation_layout(),
        e in relation_layout(),
        tolerance in 0..8_u32,
    ) {
        // Ids repeat so that identical rows actually occur.
        let strip = |relation: &MemRelation| -> Vec<Vec<Value>> {
            rows(relation)
                .into_iter()
                .map(|r| {
                    let mut v = r.into_values().into_vec();
                    v[0] = Value::Integer(0);
                    v
                })
                .collect()
        };
        let p = MemRelation::new("Projects", &[], strip(&projects(&p)));
        let e = MemRelation::new("Employees", &[], strip(&employees(&e)));
        let config = JoinConfig::default().with_max_days_diff(tolerance);

        let (_, all) = joined(Strategy::SinglePass, &p, &e, &config);
        let distinct: HashSet<_> = all.rows().iter().map(|r| r.values.clone()).collect();

        let symmetric = config.clone().with_pair_identity(PairIdentity::Content);
        let (_, sym) = joined(Strategy::Symmetric, &p, &e, &symmetric);
        prop_assert_eq!(sym.rows().len(), distinct.len());

        let semi = config.clone().with_semi_join_dedup(Some(PairIdentity::Content));
        let (_, semi) = joined(Strategy::SemiJoin, &p, &e, &semi);
        prop_assert_eq!(semi.rows().len(), distinct.len());
    }

    #[test]
    fn semi_join_filter_drops_only_unmatchable_rows(
        p in relation_layout(),
        e in relation_layout(),
        tolerance in 0..8_u32,
        invert in any::<bool>(),
    ) {
        let p = projects(&p);
        let e = employees(&e);
        let config = JoinConfig::default().with_max_days_diff(tolerance).inverted(invert);
        let flipped = Strategy::SemiJoin.relation_two_leads(invert);
        let schema =
            JoinSchema::resolve("Projects", &[], "Employees", &[], flipped).expect("schema");
        let (driving, probed): (&MemRelation, &MemRelation) =
            if flipped { (&e, &p) } else { (&p, &e) };

        let keys = distinct_keys(&schema, driving).expect("keys");
        let predicate = BandPredicate::new(&schema, tolerance);
        let driving_rows = rows(driving);
        for probed_row in rows(probed) {
            let kept = schema.right().key(&probed_row).is_some_and(|k| keys.contains(k));
            if !kept {
                for d in &driving_rows {
                    prop_assert!(!predicate.matches(d, &probed_row).expect("dates"));
                }
            }
        }

        let (_, sink) = joined(Strategy::SemiJoin, &p, &e, &config);
        let key_at = schema.left().key_index();
        let right_key_at = schema.left().columns().len() + schema.right().key_index();
        for row in sink.rows() {
            prop_assert!(keys.contains(&row.values[key_at]));
            prop_assert!(keys.contains(&row.values[right_key_at]));
        }
    }

    #[test]
    fn reruns_are_identical_in_order(
        p in relation_layout(),
        e in relation_layout(),
        tolerance in 0..8_u32,
    ) {
        let p = projects(&p);
        let e = employees(&e);
        let config = JoinConfig::default().with_max_days_diff(tolerance);
        for strategy in Strategy::ALL {
            let mut first = CollectSink::new();
            let mut second = CollectSink::new();
            run_join(strategy, &p, &e, &config, &mut first).expect("join");
            run_join(strategy, &p, &e, &config, &mut second).expect("join");
            prop_assert_eq!(first.rows(), second.rows());
        }
    }
}
