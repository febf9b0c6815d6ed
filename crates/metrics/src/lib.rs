//! Metrics collection and export for gridplan.
//!
//! This crate owns the instrument catalogue of the home-energy controller
//! and its only mutation surface: a [`MetricsRegistry`] of typed update
//! operations, and a [`StateCollector`] that republishes application state
//! snapshots through it. Recording goes through the `metrics` crate facade;
//! when the `prometheus` feature is enabled, values are exported in
//! Prometheus format.
//!
//! # Usage
//!
//! ```rust,ignore
//! use gridplan_metrics::{MetricsRecorderConfig, MetricsRegistry, init_metrics};
//!
//! let handle = init_metrics(MetricsRecorderConfig::default())?;
//! let registry = MetricsRegistry::new();
//!
//! registry.record_api_request("octopus", true, Some(0.18));
//! registry.update_battery_metrics(Some(72.5), None, None);
//!
//! println!("{}", handle.render());
//! ```
//!
//! # Features
//!
//! - `prometheus`: Enable Prometheus export via the recorder handle

mod collector;
mod definitions;
mod recorder;
mod registry;
mod snapshot;

pub use {
    collector::{CollectError, STATE_SNAPSHOT_VERSION, StateCollector, StateSnapshot},
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
    registry::{InstrumentKind, MetricsRegistry},
    snapshot::{MetricSnapshot, MetricType, MetricsSnapshot},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
