//! Integration tests for the state collector.

use std::time::{SystemTime, UNIX_EPOCH};

use gridplan_metrics::{
    CollectError, MetricsRegistry, MetricsSnapshot, STATE_SNAPSHOT_VERSION, StateCollector,
    StateSnapshot, app, battery, cost, energy, error_types, labels,
};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Run one collection pass on a private recorder; hand back the pass result
/// and the parsed render.
fn collect(snapshot: &StateSnapshot) -> (Result<(), CollectError>, MetricsSnapshot) {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let result = metrics::with_local_recorder(&recorder, || {
        let collector = StateCollector::new(MetricsRegistry::new());
        collector.collect(snapshot)
    });
    (result, MetricsSnapshot::from_prometheus_text(&handle.render()))
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

#[test]
fn full_snapshot_updates_all_eligible_instruments() {
    let snapshot = StateSnapshot {
        version: Some("v1".into()),
        had_errors: Some(false),
        plan_valid: Some(true),
        plan_last_updated: Some(now_secs() - 600),
        soc_kwh: Some(40.0),
        soc_max_kwh: Some(100.0),
        load_minutes: Some(vec![]),
        ..StateSnapshot::default()
    };

    let (result, snap) = collect(&snapshot);
    result.expect("pass should succeed");

    assert_eq!(snap.value(app::UP, &[(labels::VERSION, "v1")]), Some(1.0));
    assert_eq!(snap.value(app::PLAN_VALID, &[]), Some(1.0));
    let age = snap.value(app::PLAN_AGE_MINUTES, &[]).unwrap();
    assert!((age - 10.0).abs() < 0.2, "plan age {age} should be ~10 minutes");
    assert_eq!(snap.value(battery::SOC_PERCENT, &[]), Some(40.0));
    // An empty load series reads as zero energy so far, not an error.
    assert_eq!(snap.value(energy::LOAD_TODAY_KWH, &[]), Some(0.0));
    assert_eq!(
        snap.value(app::ERRORS_TOTAL, &[(labels::TYPE, error_types::METRICS_COLLECTION)]),
        None
    );
}

#[test]
fn empty_snapshot_still_reports_health() {
    let (result, snap) = collect(&StateSnapshot::default());
    result.expect("pass should succeed");

    assert_eq!(snap.value(app::UP, &[(labels::VERSION, "unknown")]), Some(1.0));
    assert_eq!(snap.value(app::PLAN_VALID, &[]), Some(0.0));
    assert_eq!(snap.value(app::PLAN_AGE_MINUTES, &[]), Some(0.0));
    assert_eq!(snap.value(battery::SOC_PERCENT, &[]), None);
    assert_eq!(snap.value(energy::LOAD_TODAY_KWH, &[]), None);
    assert_eq!(snap.value(cost::TODAY, &[]), None);
}

#[test]
fn missing_load_series_does_not_block_other_updates() {
    let snapshot = StateSnapshot {
        version: Some("v1".into()),
        soc_kwh: Some(5.0),
        soc_max_kwh: Some(10.0),
        cost_today: Some(3.75),
        ..StateSnapshot::default()
    };

    let (result, snap) = collect(&snapshot);
    result.expect("pass should succeed");

    assert_eq!(snap.value(battery::SOC_PERCENT, &[]), Some(50.0));
    assert_eq!(snap.value(cost::TODAY, &[]), Some(3.75));
    assert_eq!(snap.value(energy::LOAD_TODAY_KWH, &[]), None);
}

#[test]
fn zero_capacity_reads_as_empty_battery() {
    let snapshot = StateSnapshot {
        soc_kwh: Some(40.0),
        soc_max_kwh: Some(0.0),
        ..StateSnapshot::default()
    };

    let (result, snap) = collect(&snapshot);
    result.expect("pass should succeed");
    assert_eq!(snap.value(battery::SOC_PERCENT, &[]), Some(0.0));
}

#[test]
fn zero_soc_still_publishes_zero_percent() {
    let snapshot = StateSnapshot {
        soc_kwh: Some(0.0),
        soc_max_kwh: Some(10.0),
        ..StateSnapshot::default()
    };

    let (_, snap) = collect(&snapshot);
    assert_eq!(snap.value(battery::SOC_PERCENT, &[]), Some(0.0));
}

#[test]
fn load_series_sums_to_kwh() {
    let snapshot = StateSnapshot {
        load_minutes: Some(vec![1.0; 60]),
        ..StateSnapshot::default()
    };

    let (_, snap) = collect(&snapshot);
    assert_eq!(snap.value(energy::LOAD_TODAY_KWH, &[]), Some(1.0));
}

#[test]
fn non_finite_field_aborts_pass_with_one_error() {
    let snapshot = StateSnapshot {
        version: Some("v2".into()),
        soc_kwh: Some(4.0),
        soc_max_kwh: Some(10.0),
        cost_today: Some(f64::NAN),
        ..StateSnapshot::default()
    };

    let (result, snap) = collect(&snapshot);
    assert!(matches!(result, Err(CollectError::NonFinite { field: "cost_today", .. })));

    // Earlier steps keep their values; the faulty field stays unset.
    assert_eq!(snap.value(app::UP, &[(labels::VERSION, "v2")]), Some(1.0));
    assert_eq!(snap.value(battery::SOC_PERCENT, &[]), Some(40.0));
    assert_eq!(snap.value(cost::TODAY, &[]), None);
    // Exactly one collection-fault increment.
    assert_eq!(
        snap.value(app::ERRORS_TOTAL, &[(labels::TYPE, error_types::METRICS_COLLECTION)]),
        Some(1.0)
    );
}

#[test]
fn malformed_load_sample_is_categorized() {
    let snapshot = StateSnapshot {
        load_minutes: Some(vec![1.0, f64::INFINITY, 2.0]),
        ..StateSnapshot::default()
    };

    let (result, snap) = collect(&snapshot);
    assert!(matches!(result, Err(CollectError::MalformedLoadSeries { index: 1 })));
    assert_eq!(snap.value(energy::LOAD_TODAY_KWH, &[]), None);
    assert_eq!(
        snap.value(app::ERRORS_TOTAL, &[(labels::TYPE, error_types::METRICS_COLLECTION)]),
        Some(1.0)
    );
}

#[test]
fn future_plan_timestamp_clamps_to_zero_age() {
    let snapshot = StateSnapshot {
        plan_last_updated: Some(now_secs() + 3600),
        ..StateSnapshot::default()
    };

    let (_, snap) = collect(&snapshot);
    assert_eq!(snap.value(app::PLAN_AGE_MINUTES, &[]), Some(0.0));
}

#[test]
fn repeated_passes_are_idempotent_for_gauges() {
    let snapshot = StateSnapshot {
        soc_kwh: Some(7.5),
        soc_max_kwh: Some(15.0),
        cost_today: Some(1.2),
        ..StateSnapshot::default()
    };

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::with_local_recorder(&recorder, || {
        let collector = StateCollector::new(MetricsRegistry::new());
        collector.collect(&snapshot).expect("first pass");
        collector.collect(&snapshot).expect("second pass");
    });

    let snap = MetricsSnapshot::from_prometheus_text(&handle.render());
    assert_eq!(snap.value(battery::SOC_PERCENT, &[]), Some(50.0));
    assert_eq!(snap.value(cost::TODAY, &[]), Some(1.2));
}

#[test]
fn snapshot_contract_roundtrips_json() {
    let parsed: StateSnapshot =
        serde_json::from_str(r#"{"version":"v9","soc_kwh":2.5}"#).expect("valid snapshot json");

    assert_eq!(parsed.schema_version, STATE_SNAPSHOT_VERSION);
    assert_eq!(parsed.version.as_deref(), Some("v9"));
    assert_eq!(parsed.soc_kwh, Some(2.5));
    assert_eq!(parsed.plan_valid, None);

    let text = serde_json::to_string(&parsed).expect("serializes");
    assert!(text.contains("\"schema_version\":1"));
}
