//! State collector: one pass reading an application snapshot and pushing it
//! through the registry.

use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
    tracing::warn,
};

use crate::{
    definitions::error_types,
    registry::{MetricsRegistry, now_epoch_secs},
};

/// Schema version of [`StateSnapshot`]. Bump when a field changes meaning.
pub const STATE_SNAPSHOT_VERSION: u32 = 1;

/// Point-in-time read of the controller's observable state.
///
/// Every field is optional: the provider fills in what it currently knows,
/// and the collector updates only the matching instruments. The snapshot is
/// handed over by value, so the source is free to change while a pass runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSnapshot {
    pub schema_version: u32,
    /// Application version identifier, e.g. "v1.2.3".
    pub version: Option<String>,
    /// Whether the application hit errors since the last pass.
    pub had_errors: Option<bool>,
    /// Whether the current charge plan is valid.
    pub plan_valid: Option<bool>,
    /// Epoch seconds when the charge plan was last recomputed.
    pub plan_last_updated: Option<u64>,
    /// Battery state of charge in kWh.
    pub soc_kwh: Option<f64>,
    /// Usable battery capacity in kWh.
    pub soc_max_kwh: Option<f64>,
    /// Per-minute household load readings (kW) since midnight.
    pub load_minutes: Option<Vec<f64>>,
    /// Cumulative energy cost so far today, in currency units.
    pub cost_today: Option<f64>,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            schema_version: STATE_SNAPSHOT_VERSION,
            version: None,
            had_errors: None,
            plan_valid: None,
            plan_last_updated: None,
            soc_kwh: None,
            soc_max_kwh: None,
            load_minutes: None,
            cost_today: None,
        }
    }
}

/// A categorized fault inside a collection pass.
///
/// Surfaced to the caller as a result instead of being thrown across it:
/// the periodic driver inspects the outcome, and the pass has already
/// counted itself under `errors_total{type="metrics_collection"}`.
#[derive(Debug, Error)]
pub enum CollectError {
    /// A numeric snapshot field held NaN or an infinity.
    #[error("non-finite value {value} in snapshot field `{field}`")]
    NonFinite { field: &'static str, value: f64 },
    /// The load series held a NaN or infinite sample.
    #[error("non-finite sample at index {index} of the load series")]
    MalformedLoadSeries { index: usize },
}

/// Reads state snapshots and republishes them as instrument updates.
///
/// Stateless: each pass is independent, and the same snapshot yields the
/// same gauge values (counters accumulate in the registry, not here).
#[derive(Debug, Clone)]
pub struct StateCollector {
    registry: MetricsRegistry,
}

impl StateCollector {
    pub fn new(registry: MetricsRegistry) -> Self {
        Self { registry }
    }

    /// Run one collection pass.
    ///
    /// Missing fields are skipped without error; they never block the other
    /// updates. A malformed field aborts the remaining steps, logs, counts
    /// one `metrics_collection` error and surfaces the fault in the result.
    /// Instruments updated by earlier steps keep their new values.
    pub fn collect(&self, snapshot: &StateSnapshot) -> Result<(), CollectError> {
        match self.try_collect(snapshot) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(error = %err, "metrics collection pass aborted");
                self.registry.record_error(error_types::METRICS_COLLECTION);
                Err(err)
            }
        }
    }

    fn try_collect(&self, snapshot: &StateSnapshot) -> Result<(), CollectError> {
        let version = snapshot.version.as_deref().unwrap_or("unknown");

        let plan_age_minutes = match snapshot.plan_last_updated {
            // A plan stamped in the future (clock skew) reads as age 0.
            Some(ts) => ((now_epoch_secs() - ts as f64) / 60.0).max(0.0),
            None => 0.0,
        };

        self.registry.update_app_health(
            version,
            snapshot.had_errors.unwrap_or(false),
            snapshot.plan_valid.unwrap_or(false),
            plan_age_minutes,
        );

        if let (Some(soc), Some(capacity)) = (snapshot.soc_kwh, snapshot.soc_max_kwh) {
            let soc = finite("soc_kwh", soc)?;
            let capacity = finite("soc_max_kwh", capacity)?;
            // Zero or negative capacity reads as an empty battery, not a
            // division fault. A SoC of exactly 0 kWh still publishes 0%.
            let soc_percent = if capacity > 0.0 {
                soc / capacity * 100.0
            } else {
                0.0
            };
            self.registry.update_battery_metrics(Some(soc_percent), None, None);
        }

        if let Some(series) = &snapshot.load_minutes {
            let mut sum_kw = 0.0;
            for (index, sample) in series.iter().enumerate() {
                if !sample.is_finite() {
                    return Err(CollectError::MalformedLoadSeries { index });
                }
                sum_kw += sample;
            }
            // Per-minute kW readings: dividing the sum by 60 gives kWh.
            self.registry.update_energy_metrics(Some(sum_kw / 60.0), None, None, None);
        }

        if let Some(cost) = snapshot.cost_today {
            let cost = finite("cost_today", cost)?;
            self.registry.update_cost_metrics(Some(cost), None);
        }

        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, CollectError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CollectError::NonFinite { field, value })
    }
}
