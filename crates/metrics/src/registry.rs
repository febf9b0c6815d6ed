//! Instrument registry: the declaration catalogue and the only legal way to
//! mutate it.
//!
//! Instruments are declared once in [`DECLARATIONS`] and live for the process
//! lifetime. Label instances (one per concrete label value) are created
//! lazily on first use by the `metrics` facade and are never removed.

use std::time::{SystemTime, UNIX_EPOCH};

use {
    metrics::{
        Unit, counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    },
    tracing::debug,
};

use crate::definitions::{api, app, battery, cost, energy, error_types, labels, prediction, web};

/// Instrument kinds supported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Counter,
    Gauge,
    Histogram,
}

/// A single instrument declaration: wire name, kind, label schema, help.
struct Declaration {
    name: &'static str,
    kind: InstrumentKind,
    labels: &'static [&'static str],
    unit: Option<Unit>,
    help: &'static str,
}

impl Declaration {
    const fn new(
        name: &'static str,
        kind: InstrumentKind,
        labels: &'static [&'static str],
        unit: Option<Unit>,
        help: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            labels,
            unit,
            help,
        }
    }
}

use InstrumentKind::{Counter, Gauge, Histogram};

/// Every instrument gridplan emits. Kind and label schema are immutable for
/// the process lifetime; a conflicting entry here is a programming error
/// caught by [`MetricsRegistry::new`].
const DECLARATIONS: &[Declaration] = &[
    Declaration::new(app::UP, Gauge, &[labels::VERSION], None, "Application is running"),
    Declaration::new(app::ERRORS_TOTAL, Counter, &[labels::TYPE], None, "Total number of errors"),
    Declaration::new(
        app::LAST_UPDATE_TIMESTAMP,
        Gauge,
        &[],
        Some(Unit::Seconds),
        "Timestamp of last update",
    ),
    Declaration::new(app::PLAN_VALID, Gauge, &[], None, "Whether the current plan is valid"),
    Declaration::new(app::PLAN_AGE_MINUTES, Gauge, &[], None, "Age of current plan in minutes"),
    Declaration::new(api::REQUESTS_TOTAL, Counter, &[labels::SERVICE], None, "Total API requests"),
    Declaration::new(api::FAILURES_TOTAL, Counter, &[labels::SERVICE], None, "Total API failures"),
    Declaration::new(
        api::RESPONSE_TIME_SECONDS,
        Histogram,
        &[labels::SERVICE],
        Some(Unit::Seconds),
        "API response time",
    ),
    Declaration::new(
        api::LAST_SUCCESS_TIMESTAMP,
        Gauge,
        &[labels::SERVICE],
        Some(Unit::Seconds),
        "Last successful API call timestamp",
    ),
    Declaration::new(
        battery::SOC_PERCENT,
        Gauge,
        &[],
        Some(Unit::Percent),
        "Battery state of charge percentage",
    ),
    Declaration::new(battery::CHARGE_RATE_KW, Gauge, &[], None, "Current charge rate in kW"),
    Declaration::new(battery::DISCHARGE_RATE_KW, Gauge, &[], None, "Current discharge rate in kW"),
    Declaration::new(
        battery::INVERTER_REGISTER_WRITES_TOTAL,
        Counter,
        &[],
        None,
        "Total inverter register writes",
    ),
    Declaration::new(
        battery::PLAN_EXECUTION_FAILURES_TOTAL,
        Counter,
        &[],
        None,
        "Total plan execution failures",
    ),
    Declaration::new(
        prediction::FORECAST_ACCURACY_PERCENT,
        Gauge,
        &[labels::TYPE],
        Some(Unit::Percent),
        "Forecast accuracy percentage",
    ),
    Declaration::new(
        prediction::CALCULATION_DURATION_SECONDS,
        Histogram,
        &[],
        Some(Unit::Seconds),
        "Time taken to calculate predictions",
    ),
    Declaration::new(
        prediction::CONFIDENCE_SCORE,
        Gauge,
        &[labels::TYPE],
        None,
        "Prediction confidence score",
    ),
    Declaration::new(web::REQUESTS_TOTAL, Counter, &[labels::ENDPOINT], None, "Total web requests"),
    Declaration::new(
        web::RESPONSE_TIME_SECONDS,
        Histogram,
        &[labels::ENDPOINT],
        Some(Unit::Seconds),
        "Web response time",
    ),
    Declaration::new(energy::LOAD_TODAY_KWH, Gauge, &[], None, "Load energy today in kWh"),
    Declaration::new(energy::IMPORT_TODAY_KWH, Gauge, &[], None, "Import energy today in kWh"),
    Declaration::new(energy::EXPORT_TODAY_KWH, Gauge, &[], None, "Export energy today in kWh"),
    Declaration::new(energy::PV_TODAY_KWH, Gauge, &[], None, "PV energy today in kWh"),
    Declaration::new(cost::TODAY, Gauge, &[], None, "Cost today in currency units"),
    Declaration::new(cost::SAVINGS_TOTAL, Gauge, &[], None, "Total savings from plan execution"),
];

/// Shared handle to the instrument catalogue.
///
/// Cheap to clone: construct once at startup and hand a clone to every
/// component that emits metrics. Instrument state lives in the installed
/// recorder, so all clones observe the same series, and every mutation is
/// atomic per label instance.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    _priv: (),
}

impl MetricsRegistry {
    /// Declare every instrument and stamp the per-service success gauges.
    ///
    /// Panics if the declaration table carries the same name twice. That is
    /// a startup-time programming error, not a runtime condition.
    pub fn new() -> Self {
        validate_declarations();
        for decl in DECLARATIONS {
            match (decl.kind, decl.unit) {
                (Counter, Some(unit)) => describe_counter!(decl.name, unit, decl.help),
                (Counter, None) => describe_counter!(decl.name, decl.help),
                (Gauge, Some(unit)) => describe_gauge!(decl.name, unit, decl.help),
                (Gauge, None) => describe_gauge!(decl.name, decl.help),
                (Histogram, Some(unit)) => describe_histogram!(decl.name, unit, decl.help),
                (Histogram, None) => describe_histogram!(decl.name, decl.help),
            }
        }

        // Known services report a success stamp from process start, so
        // staleness alerts have a baseline before the first real call.
        for service in api::KNOWN_SERVICES {
            gauge!(api::LAST_SUCCESS_TIMESTAMP, labels::SERVICE => *service).set(now_epoch_secs());
        }

        debug!(instruments = DECLARATIONS.len(), "metrics registry initialized");
        Self { _priv: () }
    }

    /// Update application health: up flag, last-update stamp, plan state.
    ///
    /// A true `has_errors` also counts one "general" error.
    pub fn update_app_health(
        &self,
        version: &str,
        has_errors: bool,
        plan_valid: bool,
        plan_age_minutes: f64,
    ) {
        gauge!(app::UP, labels::VERSION => version.to_owned()).set(1.0);
        gauge!(app::LAST_UPDATE_TIMESTAMP).set(now_epoch_secs());
        gauge!(app::PLAN_VALID).set(if plan_valid { 1.0 } else { 0.0 });
        gauge!(app::PLAN_AGE_MINUTES).set(plan_age_minutes);

        if has_errors {
            counter!(app::ERRORS_TOTAL, labels::TYPE => error_types::GENERAL).increment(1);
        }
    }

    /// Record one request attempt against an external service.
    ///
    /// A success moves the per-service success stamp; a failure bumps the
    /// failure counter instead. The latency histogram only sees requests
    /// that report a response time.
    pub fn record_api_request(&self, service: &str, success: bool, response_time: Option<f64>) {
        counter!(api::REQUESTS_TOTAL, labels::SERVICE => service.to_owned()).increment(1);

        if success {
            gauge!(api::LAST_SUCCESS_TIMESTAMP, labels::SERVICE => service.to_owned())
                .set(now_epoch_secs());
        } else {
            counter!(api::FAILURES_TOTAL, labels::SERVICE => service.to_owned()).increment(1);
        }

        if let Some(seconds) = response_time {
            histogram!(api::RESPONSE_TIME_SECONDS, labels::SERVICE => service.to_owned())
                .record(seconds);
        }
    }

    /// Count one error occurrence under the given category.
    pub fn record_error(&self, error_type: &str) {
        counter!(app::ERRORS_TOTAL, labels::TYPE => error_type.to_owned()).increment(1);
    }

    /// Partial update of the battery gauges; `None` leaves the prior value.
    pub fn update_battery_metrics(
        &self,
        soc_percent: Option<f64>,
        charge_rate_kw: Option<f64>,
        discharge_rate_kw: Option<f64>,
    ) {
        if let Some(value) = soc_percent {
            gauge!(battery::SOC_PERCENT).set(value);
        }
        if let Some(value) = charge_rate_kw {
            gauge!(battery::CHARGE_RATE_KW).set(value);
        }
        if let Some(value) = discharge_rate_kw {
            gauge!(battery::DISCHARGE_RATE_KW).set(value);
        }
    }

    /// Record one inverter register write.
    pub fn record_inverter_write(&self) {
        counter!(battery::INVERTER_REGISTER_WRITES_TOTAL).increment(1);
    }

    /// Record one failed charge-plan execution.
    pub fn record_plan_execution_failure(&self) {
        counter!(battery::PLAN_EXECUTION_FAILURES_TOTAL).increment(1);
    }

    /// Partial update of today's energy totals; `None` leaves the prior value.
    pub fn update_energy_metrics(
        &self,
        load_kwh: Option<f64>,
        import_kwh: Option<f64>,
        export_kwh: Option<f64>,
        pv_kwh: Option<f64>,
    ) {
        if let Some(value) = load_kwh {
            gauge!(energy::LOAD_TODAY_KWH).set(value);
        }
        if let Some(value) = import_kwh {
            gauge!(energy::IMPORT_TODAY_KWH).set(value);
        }
        if let Some(value) = export_kwh {
            gauge!(energy::EXPORT_TODAY_KWH).set(value);
        }
        if let Some(value) = pv_kwh {
            gauge!(energy::PV_TODAY_KWH).set(value);
        }
    }

    /// Partial update of the cost gauges; `None` leaves the prior value.
    pub fn update_cost_metrics(&self, cost_today: Option<f64>, savings_total: Option<f64>) {
        if let Some(value) = cost_today {
            gauge!(cost::TODAY).set(value);
        }
        if let Some(value) = savings_total {
            gauge!(cost::SAVINGS_TOTAL).set(value);
        }
    }

    /// Set the accuracy gauge for one forecast category.
    pub fn update_forecast_accuracy(&self, forecast_type: &str, accuracy_percent: f64) {
        gauge!(prediction::FORECAST_ACCURACY_PERCENT, labels::TYPE => forecast_type.to_owned())
            .set(accuracy_percent);
    }

    /// Record how long one plan/prediction calculation took.
    pub fn record_prediction_calculation_time(&self, seconds: f64) {
        histogram!(prediction::CALCULATION_DURATION_SECONDS).record(seconds);
    }

    /// Set the confidence gauge for one prediction category.
    ///
    /// The score scale (0-1 or 0-100) is caller-defined; stored as given.
    pub fn update_prediction_confidence(&self, prediction_type: &str, score: f64) {
        gauge!(prediction::CONFIDENCE_SCORE, labels::TYPE => prediction_type.to_owned()).set(score);
    }

    /// Count one web request; optionally record its response time.
    pub fn record_web_request(&self, endpoint: &str, response_time: Option<f64>) {
        counter!(web::REQUESTS_TOTAL, labels::ENDPOINT => endpoint.to_owned()).increment(1);

        if let Some(seconds) = response_time {
            histogram!(web::RESPONSE_TIME_SECONDS, labels::ENDPOINT => endpoint.to_owned())
                .record(seconds);
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_declarations() {
    for (i, a) in DECLARATIONS.iter().enumerate() {
        for (j, label) in a.labels.iter().enumerate() {
            assert!(
                !a.labels[j + 1..].contains(label),
                "instrument `{}` repeats label `{label}`",
                a.name,
            );
        }
        for b in &DECLARATIONS[i + 1..] {
            assert!(
                a.name != b.name,
                "instrument `{}` declared twice (kinds {:?} and {:?})",
                a.name,
                a.kind,
                b.kind,
            );
        }
    }
}

/// Seconds since the Unix epoch as f64; 0 if the clock reads before 1970.
pub(crate) fn now_epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_names_are_unique_and_prefixed() {
        validate_declarations();
        for decl in DECLARATIONS {
            assert!(
                decl.name.starts_with("gridplan_"),
                "instrument `{}` misses the wire-name prefix",
                decl.name
            );
        }
    }

    #[test]
    fn histograms_are_declared_in_seconds() {
        for decl in DECLARATIONS {
            if decl.kind == Histogram {
                assert_eq!(decl.unit, Some(Unit::Seconds), "histogram `{}`", decl.name);
            }
        }
    }

    #[test]
    fn labeled_instruments_use_known_label_keys() {
        let known = [labels::VERSION, labels::TYPE, labels::SERVICE, labels::ENDPOINT];
        for decl in DECLARATIONS {
            for label in decl.labels {
                assert!(known.contains(label), "unknown label `{label}` on `{}`", decl.name);
            }
        }
    }
}
