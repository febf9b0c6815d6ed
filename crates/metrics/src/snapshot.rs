//! Parsed view of rendered metrics, for tests and JSON consumers.
//!
//! [`MetricsSnapshot::from_prometheus_text`] turns one render of the
//! exposition text back into typed samples, plus per-domain rollups shaped
//! for dashboard-style consumers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::definitions::{api, app, battery, cost, energy, web};

/// Metric type as declared by a `# TYPE` exposition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricType {
    fn parse(raw: &str) -> Self {
        match raw {
            "counter" => Self::Counter,
            "gauge" => Self::Gauge,
            "histogram" => Self::Histogram,
            "summary" => Self::Summary,
            _ => Self::Untyped,
        }
    }
}

/// One sample line from the exposition text.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSnapshot {
    pub name: String,
    pub metric_type: MetricType,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

/// All samples from one render, with per-domain rollups.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub samples: Vec<MetricSnapshot>,
    pub categories: CategorySummary,
}

impl MetricsSnapshot {
    /// Parse Prometheus text exposition output.
    ///
    /// Lines that do not parse are skipped rather than failing the whole
    /// snapshot; a partially rendered page must not take a dashboard down.
    pub fn from_prometheus_text(text: &str) -> Self {
        let mut types: BTreeMap<String, MetricType> = BTreeMap::new();
        let mut samples = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("# TYPE ") {
                let mut parts = rest.split_whitespace();
                if let (Some(name), Some(ty)) = (parts.next(), parts.next()) {
                    types.insert(name.to_owned(), MetricType::parse(ty));
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            if let Some(sample) = parse_sample(line, &types) {
                samples.push(sample);
            }
        }

        let categories = CategorySummary::from_samples(&samples);
        Self { samples, categories }
    }

    /// Value of the sample with this exact name and label set.
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| {
                s.name == name
                    && s.labels.len() == labels.len()
                    && labels
                        .iter()
                        .all(|(k, v)| s.labels.get(*k).map(String::as_str) == Some(*v))
            })
            .map(|s| s.value)
    }

    /// Sum of a metric's samples across all label combinations, skipping
    /// quantile helper series.
    pub fn total(&self, name: &str) -> f64 {
        self.samples
            .iter()
            .filter(|s| s.name == name && !s.labels.contains_key("quantile"))
            .map(|s| s.value)
            .sum()
    }
}

/// Pre-computed rollups for dashboard-style consumers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategorySummary {
    pub health: HealthSummary,
    pub api: ApiSummary,
    pub battery: BatterySummary,
    pub energy: EnergySummary,
    pub web: WebSummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthSummary {
    pub up: bool,
    pub errors_total: f64,
    pub plan_valid: bool,
    pub plan_age_minutes: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiSummary {
    pub requests_total: f64,
    pub failures_total: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatterySummary {
    pub soc_percent: Option<f64>,
    pub charge_rate_kw: Option<f64>,
    pub discharge_rate_kw: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnergySummary {
    pub load_today_kwh: Option<f64>,
    pub import_today_kwh: Option<f64>,
    pub export_today_kwh: Option<f64>,
    pub pv_today_kwh: Option<f64>,
    pub cost_today: Option<f64>,
    pub savings_total: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WebSummary {
    pub requests_total: f64,
}

impl CategorySummary {
    fn from_samples(samples: &[MetricSnapshot]) -> Self {
        let find = |name: &str| samples.iter().find(|s| s.name == name).map(|s| s.value);
        let sum = |name: &str| -> f64 {
            samples
                .iter()
                .filter(|s| s.name == name && !s.labels.contains_key("quantile"))
                .map(|s| s.value)
                .sum()
        };

        Self {
            health: HealthSummary {
                up: sum(app::UP) > 0.0,
                errors_total: sum(app::ERRORS_TOTAL),
                plan_valid: find(app::PLAN_VALID).unwrap_or(0.0) > 0.0,
                plan_age_minutes: find(app::PLAN_AGE_MINUTES).unwrap_or(0.0),
            },
            api: ApiSummary {
                requests_total: sum(api::REQUESTS_TOTAL),
                failures_total: sum(api::FAILURES_TOTAL),
            },
            battery: BatterySummary {
                soc_percent: find(battery::SOC_PERCENT),
                charge_rate_kw: find(battery::CHARGE_RATE_KW),
                discharge_rate_kw: find(battery::DISCHARGE_RATE_KW),
            },
            energy: EnergySummary {
                load_today_kwh: find(energy::LOAD_TODAY_KWH),
                import_today_kwh: find(energy::IMPORT_TODAY_KWH),
                export_today_kwh: find(energy::EXPORT_TODAY_KWH),
                pv_today_kwh: find(energy::PV_TODAY_KWH),
                cost_today: find(cost::TODAY),
                savings_total: find(cost::SAVINGS_TOTAL),
            },
            web: WebSummary {
                requests_total: sum(web::REQUESTS_TOTAL),
            },
        }
    }
}

fn parse_sample(line: &str, types: &BTreeMap<String, MetricType>) -> Option<MetricSnapshot> {
    let (name, labels, rest) = match line.find('{') {
        Some(open) => {
            let close = line.rfind('}')?;
            (
                &line[..open],
                parse_labels(&line[open + 1..close]),
                line[close + 1..].trim(),
            )
        }
        None => {
            let mut parts = line.splitn(2, char::is_whitespace);
            (parts.next()?, BTreeMap::new(), parts.next()?.trim())
        }
    };

    // The value comes first; an optional timestamp may follow it.
    let value: f64 = rest.split_whitespace().next()?.parse().ok()?;

    let metric_type = types
        .get(name)
        .copied()
        .or_else(|| base_name(name).and_then(|base| types.get(base).copied()))
        .unwrap_or(MetricType::Untyped);

    Some(MetricSnapshot {
        name: name.to_owned(),
        metric_type,
        labels,
        value,
    })
}

/// Histogram and summary helper series carry suffixed names; their `# TYPE`
/// line is declared for the base name.
fn base_name(name: &str) -> Option<&str> {
    ["_bucket", "_count", "_sum"]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
}

fn parse_labels(raw: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    let mut rest = raw;

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].trim().to_owned();
        let Some(quoted) = rest[eq + 1..].strip_prefix('"') else {
            break;
        };

        // Scan to the closing quote, honoring backslash escapes.
        let mut value = String::new();
        let mut end = None;
        let mut chars = quoted.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                '"' => {
                    end = Some(i);
                    break;
                }
                _ => value.push(c),
            }
        }
        let Some(end) = end else { break };

        labels.insert(key, value);
        rest = quoted[end + 1..].trim_start_matches(',').trim_start();
    }

    labels
}
