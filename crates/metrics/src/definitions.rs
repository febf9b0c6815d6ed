//! Metric name and label definitions.
//!
//! Every metric gridplan emits is named here. Keeping the catalogue in one
//! place keeps wire names consistent: external dashboards key on them, so
//! renaming an entry is a breaking change and needs a migration plan.

/// Application health metrics
pub mod app {
    /// 1 while the application is running, labeled by version
    pub const UP: &str = "gridplan_up";
    /// Cumulative error count by category
    pub const ERRORS_TOTAL: &str = "gridplan_errors_total";
    /// Epoch seconds of the last successful health update
    pub const LAST_UPDATE_TIMESTAMP: &str = "gridplan_last_update_timestamp";
    /// 1 if the current charge plan is valid, else 0
    pub const PLAN_VALID: &str = "gridplan_plan_valid";
    /// Age of the current charge plan in minutes
    pub const PLAN_AGE_MINUTES: &str = "gridplan_plan_age_minutes";
}

/// External API metrics
pub mod api {
    /// Cumulative request attempts per service
    pub const REQUESTS_TOTAL: &str = "gridplan_api_requests_total";
    /// Cumulative failed attempts per service
    pub const FAILURES_TOTAL: &str = "gridplan_api_failures_total";
    /// Observed request latency per service, in seconds
    pub const RESPONSE_TIME_SECONDS: &str = "gridplan_api_response_time_seconds";
    /// Epoch seconds of the last successful call, per service
    pub const LAST_SUCCESS_TIMESTAMP: &str = "gridplan_api_last_success_timestamp";

    /// External services gridplan talks to. Cardinality of the per-service
    /// metrics is bounded by this list plus whatever ad-hoc callers pass.
    pub const KNOWN_SERVICES: &[&str] = &["octopus", "solcast", "gecloud", "home_assistant"];
}

/// Battery and inverter metrics
pub mod battery {
    /// Battery state of charge, 0-100
    pub const SOC_PERCENT: &str = "gridplan_battery_soc_percent";
    /// Current charge rate in kW
    pub const CHARGE_RATE_KW: &str = "gridplan_charge_rate_kw";
    /// Current discharge rate in kW
    pub const DISCHARGE_RATE_KW: &str = "gridplan_discharge_rate_kw";
    /// Cumulative inverter register writes
    pub const INVERTER_REGISTER_WRITES_TOTAL: &str = "gridplan_inverter_register_writes_total";
    /// Cumulative charge-plan execution failures
    pub const PLAN_EXECUTION_FAILURES_TOTAL: &str = "gridplan_plan_execution_failures_total";
}

/// Prediction and forecasting metrics
pub mod prediction {
    /// Forecast accuracy percentage per forecast category
    pub const FORECAST_ACCURACY_PERCENT: &str = "gridplan_forecast_accuracy_percent";
    /// Seconds per plan/prediction calculation
    pub const CALCULATION_DURATION_SECONDS: &str =
        "gridplan_prediction_calculation_duration_seconds";
    /// Prediction confidence score per category (scale is caller-defined)
    pub const CONFIDENCE_SCORE: &str = "gridplan_prediction_confidence_score";
}

/// Web interface metrics
pub mod web {
    /// Total web requests per endpoint
    pub const REQUESTS_TOTAL: &str = "gridplan_web_requests_total";
    /// Web response time per endpoint, in seconds
    pub const RESPONSE_TIME_SECONDS: &str = "gridplan_web_response_time_seconds";
}

/// Daily energy totals
pub mod energy {
    /// Load energy today in kWh
    pub const LOAD_TODAY_KWH: &str = "gridplan_load_today_kwh";
    /// Grid import energy today in kWh
    pub const IMPORT_TODAY_KWH: &str = "gridplan_import_today_kwh";
    /// Grid export energy today in kWh
    pub const EXPORT_TODAY_KWH: &str = "gridplan_export_today_kwh";
    /// PV generation today in kWh
    pub const PV_TODAY_KWH: &str = "gridplan_pv_today_kwh";
}

/// Cost and savings metrics
pub mod cost {
    /// Energy cost so far today, in currency units
    pub const TODAY: &str = "gridplan_cost_today";
    /// Total savings attributed to plan execution
    pub const SAVINGS_TOTAL: &str = "gridplan_savings_total";
}

/// Common label keys used across metrics
pub mod labels {
    pub const VERSION: &str = "version";
    pub const TYPE: &str = "type";
    pub const SERVICE: &str = "service";
    pub const ENDPOINT: &str = "endpoint";
}

/// Well-known values for the `type` label on [`app::ERRORS_TOTAL`].
pub mod error_types {
    /// Errors surfaced through the app-health error flag.
    pub const GENERAL: &str = "general";
    /// Faults caught at the collection-pass boundary.
    pub const METRICS_COLLECTION: &str = "metrics_collection";
}

/// Standard histogram buckets for different metric types
pub mod buckets {
    use once_cell::sync::Lazy;

    /// External API latency buckets (in seconds)
    /// Covers 10ms to 60s
    pub static API_RESPONSE: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]
    });

    /// Plan calculation duration buckets (in seconds)
    /// Covers 100ms to 10 minutes (a full plan recalculation is slow)
    pub static PREDICTION_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0,
        ]
    });

    /// Web request duration buckets (in seconds)
    /// Covers 1ms to 10s
    pub static WEB_RESPONSE: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 10.0,
        ]
    });
}
