//! End-to-end scenarios run through `run_join` for every strategy.
//!
//! Relation 1 is Projects-like `(ProjectID, Department, StartDate, Funding)`
//! and relation 2 is Employees-like `(EmployeeID, Department, Name,
//! HireDate)` unless a test says otherwise.

use bandjoin_error::BandJoinError;
use bandjoin_exec::{
    CollectSink, CsvSink, InjectedFailure, JoinConfig, MemRelation, Strategy, run_join,
};
use bandjoin_types::Value;

// ─── Helpers ───────────────────────────────────────────────────────────

fn projects(rows: &[(i64, &str, &str)]) -> MemRelation {
    MemRelation::new(
        "Projects",
        &["ProjectID", "Department", "StartDate", "Funding"],
        rows.iter().map(|&(id, dept, date)| {
            vec![
                Value::Integer(id),
                Value::from(dept),
                Value::from(date),
                Value::Integer(100_000),
            ]
        }),
    )
}

fn employees(rows: &[(i64, &str, &str)]) -> MemRelation {
    MemRelation::new(
        "Employees",
        &["EmployeeID", "Department", "Name", "HireDate"],
        rows.iter().map(|&(id, dept, date)| {
            vec![
                Value::Integer(id),
                Value::from(dept),
                Value::from(format!("Employee_{id}")),
                Value::from(date),
            ]
        }),
    )
}

/// `(project id, employee id)` for every result, in emission order.
fn id_pairs(
    strategy: Strategy,
    p: &MemRelation,
    e: &MemRelation,
    config: &JoinConfig,
) -> Vec<(i64, i64)> {
    let mut sink = CollectSink::new();
    run_join(strategy, p, e, config, &mut sink).expect("join should succeed");
    let (project_at, employee_at) = if strategy.relation_two_leads(config.invert_join) {
        (4, 0)
    } else {
        (0, 4)
    };
    sink.rows()
        .iter()
        .map(|row| {
            (
                row.values[project_at].as_integer().expect("project id"),
                row.values[employee_at].as_integer().expect("employee id"),
            )
        })
        .collect()
}

fn days(n: u32) -> JoinConfig {
    JoinConfig::default().with_max_days_diff(n)
}

// ─── Scenarios ─────────────────────────────────────────────────────────

#[test]
fn scenario_a_tolerance_decides_single_match() {
    let p = projects(&[(1, "X", "2023-01-01")]);
    let e = employees(&[(10, "X", "2023-01-05")]);
    for strategy in Strategy::ALL {
        for invert in [false, true] {
            assert_eq!(
                id_pairs(strategy, &p, &e, &days(10).inverted(invert)),
                vec![(1, 10)],
                "{strategy:?} invert={invert}"
            );
            assert!(
                id_pairs(strategy, &p, &e, &days(3).inverted(invert)).is_empty(),
                "{strategy:?} invert={invert}"
            );
        }
    }
}

#[test]
fn scenario_b_only_close_row_matches() {
    let p = projects(&[(1, "X", "2023-01-01"), (2, "X", "2023-01-02")]);
    let e = employees(&[(10, "X", "2023-01-03")]);
    for strategy in Strategy::ALL {
        assert_eq!(id_pairs(strategy, &p, &e, &days(1)), vec![(2, 10)], "{strategy:?}");
    }
}

#[test]
fn scenario_c_partner_arriving_later_matches_once() {
    let p = projects(&[(1, "X", "2023-01-01"), (2, "Y", "2023-02-01")]);
    let e = employees(&[
        (10, "Z", "2023-01-01"),
        (11, "Z", "2023-01-01"),
        (12, "Z", "2023-01-01"),
        (13, "X", "2023-01-02"),
    ]);
    for strategy in Strategy::ALL {
        assert_eq!(id_pairs(strategy, &p, &e, &days(10)), vec![(1, 13)], "{strategy:?}");
    }
}

#[test]
fn boundary_inclusive_and_exclusive() {
    let p = projects(&[(1, "X", "2023-03-01")]);
    let e = employees(&[(10, "X", "2023-03-08")]);
    for strategy in Strategy::ALL {
        assert_eq!(id_pairs(strategy, &p, &e, &days(7)).len(), 1);
        assert!(id_pairs(strategy, &p, &e, &days(6)).is_empty());
    }
}

#[test]
fn zero_tolerance_admits_same_day_only() {
    let p = projects(&[(1, "X", "2023-06-15")]);
    let e = employees(&[(10, "X", "2023-06-15"), (11, "X", "2023-06-16")]);
    for strategy in Strategy::ALL {
        assert_eq!(id_pairs(strategy, &p, &e, &days(0)), vec![(1, 10)]);
    }
}

#[test]
fn crosses_year_boundary() {
    let p = projects(&[(1, "X", "2022-12-30")]);
    let e = employees(&[(10, "X", "2023-01-02")]);
    assert_eq!(id_pairs(Strategy::SinglePass, &p, &e, &days(3)).len(), 1);
    assert!(id_pairs(Strategy::SinglePass, &p, &e, &days(2)).is_empty());
}

#[test]
fn tolerance_wider_than_any_date_span() {
    let p = projects(&[(1, "X", "0000-01-01")]);
    let e = employees(&[(10, "X", "9999-12-31"), (11, "Y", "2023-01-01")]);
    for strategy in Strategy::ALL {
        assert_eq!(
            id_pairs(strategy, &p, &e, &days(u32::MAX)),
            vec![(1, 10)],
            "{strategy:?}"
        );
    }
}

#[test]
fn rerun_is_identical_including_order() {
    let p = projects(&[
        (1, "X", "2023-01-01"),
        (2, "Y", "2023-01-03"),
        (3, "X", "2023-01-04"),
    ]);
    let e = employees(&[
        (10, "X", "2023-01-02"),
        (11, "Y", "2023-01-01"),
        (12, "X", "2023-01-06"),
    ]);
    for strategy in Strategy::ALL {
        let first = id_pairs(strategy, &p, &e, &days(3));
        let second = id_pairs(strategy, &p, &e, &days(3));
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}

#[test]
fn csv_output_has_header_then_left_columns_first() {
    let p = projects(&[(1, "X", "2023-01-01")]);
    let e = employees(&[(10, "X", "2023-01-02")]);

    let mut sink = CsvSink::new(Vec::new());
    run_join(Strategy::SinglePass, &p, &e, &days(10), &mut sink).expect("join");
    let text = String::from_utf8(sink.into_inner().expect("flush")).expect("utf8");
    assert_eq!(
        text,
        "ProjectID,Department,StartDate,Funding,EmployeeID,Department,Name,HireDate\n\
         1,X,2023-01-01,100000,10,X,Employee_10,2023-01-02\n"
    );

    // Relation 2 drives the semi-join unless inverted.
    let mut sink = CsvSink::new(Vec::new());
    run_join(Strategy::SemiJoin, &p, &e, &days(10), &mut sink).expect("join");
    let text = String::from_utf8(sink.into_inner().expect("flush")).expect("utf8");
    assert_eq!(
        text,
        "EmployeeID,Department,Name,HireDate,ProjectID,Department,StartDate,Funding\n\
         10,X,Employee_10,2023-01-02,1,X,2023-01-01,100000\n"
    );

    let mut sink = CsvSink::new(Vec::new());
    run_join(Strategy::SemiJoin, &p, &e, &days(10).inverted(true), &mut sink).expect("join");
    let text = String::from_utf8(sink.into_inner().expect("flush")).expect("utf8");
    assert!(text.starts_with("ProjectID,Department,StartDate,Funding,EmployeeID"));
}

#[test]
fn semi_join_output_follows_driving_row_order() {
    let p = projects(&[(1, "X", "2023-01-01"), (2, "X", "2023-01-02")]);
    let e = employees(&[(10, "X", "2023-01-03"), (11, "X", "2023-01-01")]);
    assert_eq!(
        id_pairs(Strategy::SemiJoin, &p, &e, &days(10)),
        vec![(1, 10), (2, 10), (1, 11), (2, 11)]
    );
    assert_eq!(
        id_pairs(Strategy::SemiJoin, &p, &e, &days(10).inverted(true)),
        vec![(1, 10), (1, 11), (2, 10), (2, 11)]
    );
}

#[test]
fn relations_given_in_either_order() {
    let p = projects(&[(1, "X", "2023-01-01")]);
    let e = employees(&[(10, "X", "2023-01-02")]);
    let mut sink = CollectSink::new();
    run_join(Strategy::Symmetric, &e, &p, &days(10), &mut sink).expect("join");
    assert_eq!(sink.header()[0], "EmployeeID");
    assert_eq!(sink.rows().len(), 1);
}

// ─── Metrics ───────────────────────────────────────────────────────────

#[test]
fn metrics_report_per_strategy_fields() {
    let p = projects(&[(1, "X", "2023-01-01"), (2, "X", "2023-01-02")]);
    let e = employees(&[(10, "X", "2023-01-03")]);

    let mut sink = CollectSink::new();
    let single = run_join(Strategy::SinglePass, &p, &e, &days(10), &mut sink).expect("join");
    assert_eq!(single.row_count, 2);
    assert!(single.build_time_seconds.is_some());
    assert!(single.probe_time_seconds.is_some());
    assert!(single.latency_to_first_result_seconds.is_some());
    assert_eq!(single.variant, "Single pass hash join (Small join Large)");

    let symmetric = run_join(Strategy::Symmetric, &p, &e, &days(10), &mut sink).expect("join");
    let labels: Vec<&str> = symmetric.memory.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(labels, ["left_hash_table", "right_hash_table", "emitted_pairs"]);

    let semi = run_join(Strategy::SemiJoin, &p, &e, &days(10), &mut sink).expect("join");
    assert!(semi.join_phase_time_seconds.is_some());
    assert!(semi.build_time_seconds.is_none());
    assert_eq!(semi.row_count, 2);

    let json = serde_json::to_value(&semi).expect("serialize");
    assert_eq!(json["strategy"], "semi_join");
    assert_eq!(json["row_count"], 2);
}

#[test]
fn empty_relations_produce_no_rows_and_no_latency() {
    let p = projects(&[]);
    let e = employees(&[]);
    for strategy in Strategy::ALL {
        let mut sink = CollectSink::new();
        let metrics = run_join(strategy, &p, &e, &days(10), &mut sink).expect("join");
        assert_eq!(metrics.row_count, 0);
        assert!(metrics.latency_to_first_result_seconds.is_none());
        assert_eq!(sink.header().len(), 8);
    }
}

// ─── Failures ──────────────────────────────────────────────────────────

#[test]
fn unrecognized_schema_before_any_row_is_read() {
    let p = projects(&[(1, "X", "2023-01-01")]);
    let other = projects(&[(2, "X", "2023-01-01")]);
    for strategy in Strategy::ALL {
        let mut sink = CollectSink::new();
        let err = run_join(strategy, &p, &other, &days(10), &mut sink).unwrap_err();
        assert!(matches!(err, BandJoinError::UnrecognizedSchema { .. }));
    }
    assert_eq!(p.rows_read(), 0);
    assert_eq!(other.rows_read(), 0);
}

#[test]
fn wrong_arity_is_unrecognized() {
    let narrow = MemRelation::new(
        "Projects",
        &["ProjectID", "Department", "StartDate"],
        Vec::<Vec<Value>>::new(),
    );
    let e = employees(&[(10, "X", "2023-01-01")]);
    let mut sink = CollectSink::new();
    let err = run_join(Strategy::SinglePass, &narrow, &e, &days(10), &mut sink).unwrap_err();
    assert!(matches!(err, BandJoinError::UnrecognizedSchema { .. }));
    assert_eq!(e.rows_read(), 0);
}

#[test]
fn source_failure_mid_read_aborts_without_retracting_output() {
    let p = projects(&[(1, "X", "2023-01-01")]);
    let e = employees(&[
        (10, "X", "2023-01-01"),
        (11, "X", "2023-01-02"),
        (12, "X", "2023-01-03"),
    ])
    .with_failure(InjectedFailure::AfterRows(2));
    let mut sink = CollectSink::new();
    let err = run_join(Strategy::SinglePass, &p, &e, &days(10), &mut sink).unwrap_err();
    assert!(matches!(err, BandJoinError::SourceUnavailable { .. }));
    assert_eq!(sink.rows().len(), 2);
    assert!(!sink.is_finished());
}

#[test]
fn source_failure_on_open_is_fatal_for_every_strategy() {
    let p = projects(&[(1, "X", "2023-01-01")]).with_failure(InjectedFailure::OnOpen);
    let e = employees(&[(10, "X", "2023-01-01")]);
    for strategy in Strategy::ALL {
        let mut sink = CollectSink::new();
        let err = run_join(strategy, &p, &e, &days(10), &mut sink).unwrap_err();
        assert_eq!(err.kind(), "source_unavailable");
    }
}

#[test]
fn malformed_date_on_key_match_is_data_format_error() {
    let p = projects(&[(1, "X", "01/02/2023")]);
    let e = employees(&[(10, "X", "2023-01-02")]);
    for strategy in Strategy::ALL {
        let mut sink = CollectSink::new();
        let err = run_join(strategy, &p, &e, &days(10), &mut sink).unwrap_err();
        assert!(
            matches!(err, BandJoinError::DataFormat { ref relation, .. } if relation == "Projects"),
            "{strategy:?}: {err}"
        );
    }
}

#[test]
fn malformed_date_without_key_partner_is_ignored() {
    let p = projects(&[(1, "LONELY", "not-a-date"), (2, "X", "2023-01-01")]);
    let e = employees(&[(10, "X", "2023-01-02")]);
    for strategy in Strategy::ALL {
        assert_eq!(id_pairs(strategy, &p, &e, &days(10)), vec![(2, 10)]);
    }
}

#[test]
fn null_keys_never_join() {
    let p = MemRelation::new(
        "Projects",
        &[],
        [vec![
            Value::Integer(1),
            Value::Null,
            Value::from("2023-01-01"),
            Value::Integer(1),
        ]],
    );
    let e = MemRelation::new(
        "Employees",
        &[],
        [vec![
            Value::Integer(10),
            Value::Null,
            Value::from("n"),
            Value::from("2023-01-01"),
        ]],
    );
    for strategy in Strategy::ALL {
        let mut sink = CollectSink::new();
        let metrics = run_join(strategy, &p, &e, &days(10), &mut sink).expect("join");
        assert_eq!(metrics.row_count, 0);
    }
}
