//! Recorder installation for Prometheus export.
//!
//! With the `prometheus` feature enabled this installs the process-global
//! recorder and hands back a handle that renders text exposition; without
//! the feature [`init_metrics`] returns a no-op handle, so callers never
//! need a cfg of their own.

use std::time::Duration;

use anyhow::Result;
#[cfg(feature = "prometheus")]
use {
    metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle},
    tracing::info,
};

use crate::definitions::{api, buckets, prediction, web};

/// Configuration for the metrics recorder.
#[derive(Debug, Clone)]
pub struct MetricsRecorderConfig {
    /// Histogram buckets keyed by full wire name. Histograms without an
    /// entry here render as quantile summaries instead.
    pub histogram_buckets: Vec<(String, Vec<f64>)>,
    /// How often the recorder drains stale histogram samples.
    pub upkeep_interval: Duration,
}

impl Default for MetricsRecorderConfig {
    fn default() -> Self {
        Self {
            histogram_buckets: vec![
                (api::RESPONSE_TIME_SECONDS.to_owned(), buckets::API_RESPONSE.clone()),
                (
                    prediction::CALCULATION_DURATION_SECONDS.to_owned(),
                    buckets::PREDICTION_DURATION.clone(),
                ),
                (web::RESPONSE_TIME_SECONDS.to_owned(), buckets::WEB_RESPONSE.clone()),
            ],
            upkeep_interval: Duration::from_secs(5),
        }
    }
}

/// Handle onto the installed recorder.
#[derive(Clone)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    inner: PrometheusHandle,
}

impl MetricsHandle {
    /// Render current instrument values in Prometheus text exposition
    /// format. Empty when the `prometheus` feature is disabled.
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.inner.render()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

/// Install the process-global metrics recorder.
///
/// Call once at startup, before constructing the registry, so instrument
/// descriptions land in the recorder. When a tokio runtime is present a
/// background upkeep task keeps histogram memory bounded.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    let mut builder = PrometheusBuilder::new();
    for (name, bounds) in &config.histogram_buckets {
        builder = builder.set_buckets_for_metric(Matcher::Full(name.clone()), bounds)?;
    }
    let handle = builder.install_recorder()?;

    if let Ok(runtime) = tokio::runtime::Handle::try_current() {
        let upkeep = handle.clone();
        let interval = config.upkeep_interval;
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                upkeep.run_upkeep();
            }
        });
    }

    info!("prometheus metrics recorder installed");
    Ok(MetricsHandle { inner: handle })
}

/// Built without the `prometheus` feature: recording still goes through the
/// `metrics` facade (and is dropped), rendering yields an empty string.
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(_config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    Ok(MetricsHandle {})
}
