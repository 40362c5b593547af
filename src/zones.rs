//! Threshold-zone lookups for single biometric values
//!
//! Each configured metric carries up to two critical ranges, up to two caution
//! ranges and one optimal range. Bands of the same kind need not be
//! contiguous: REM sleep, for instance, is critical both when too low and
//! when too high.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::models::{Metric, MetricObservation};

/// Errors that can occur during zone lookups
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("Malformed threshold row for {metric}: unreadable cells {cells:?}")]
    MalformedRow { metric: String, cells: Vec<String> },
}

/// Band a value falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneStatus {
    Critical,
    Caution,
    Optimal,
    /// Metric has no row in the threshold table
    NoConfig,
    /// Value absent or not a number
    NoData,
    /// Value outside every configured band
    Unknown,
    /// Threshold row could not be evaluated
    Error,
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneStatus::Critical => write!(f, "Critical"),
            ZoneStatus::Caution => write!(f, "Caution"),
            ZoneStatus::Optimal => write!(f, "Optimal"),
            ZoneStatus::NoConfig => write!(f, "No Config"),
            ZoneStatus::NoData => write!(f, "No Data"),
            ZoneStatus::Unknown => write!(f, "Unknown"),
            ZoneStatus::Error => write!(f, "Error"),
        }
    }
}

/// Closed interval `[low, high]` whose bounds may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandRange {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl BandRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
        }
    }

    pub fn from_bounds(low: Option<f64>, high: Option<f64>) -> Self {
        Self { low, high }
    }

    /// Both bounds defined (NaN counts as undefined)
    pub fn is_present(&self) -> bool {
        matches!((self.low, self.high), (Some(l), Some(h)) if !l.is_nan() && !h.is_nan())
    }

    /// Inclusive containment; ranges that are not present never match
    pub fn contains(&self, value: f64) -> bool {
        match (self.low, self.high) {
            (Some(low), Some(high)) if self.is_present() => low <= value && value <= high,
            _ => false,
        }
    }
}

/// Threshold row for one metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricThresholds {
    pub metric_name: String,
    pub critical: BandRange,
    pub critical_secondary: BandRange,
    pub caution: BandRange,
    pub caution_secondary: BandRange,
    pub optimal: BandRange,
    pub unit: Option<String>,
    /// Cells the loader could not read as numbers
    #[serde(default)]
    pub invalid_cells: Vec<String>,
}

impl MetricThresholds {
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            ..Self::default()
        }
    }

    pub fn critical(mut self, low: f64, high: f64) -> Self {
        self.critical = BandRange::new(low, high);
        self
    }

    pub fn critical_secondary(mut self, low: f64, high: f64) -> Self {
        self.critical_secondary = BandRange::new(low, high);
        self
    }

    pub fn caution(mut self, low: f64, high: f64) -> Self {
        self.caution = BandRange::new(low, high);
        self
    }

    pub fn caution_secondary(mut self, low: f64, high: f64) -> Self {
        self.caution_secondary = BandRange::new(low, high);
        self
    }

    pub fn optimal(mut self, low: f64, high: f64) -> Self {
        self.optimal = BandRange::new(low, high);
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    fn evaluate(&self, value: f64) -> Result<ZoneStatus, ZoneError> {
        if !self.invalid_cells.is_empty() {
            return Err(ZoneError::MalformedRow {
                metric: self.metric_name.clone(),
                cells: self.invalid_cells.clone(),
            });
        }

        if [self.critical, self.critical_secondary]
            .iter()
            .any(|r| r.contains(value))
        {
            return Ok(ZoneStatus::Critical);
        }

        if [self.caution, self.caution_secondary]
            .iter()
            .any(|r| r.contains(value))
        {
            return Ok(ZoneStatus::Caution);
        }

        if self.optimal.contains(value) {
            return Ok(ZoneStatus::Optimal);
        }

        Ok(ZoneStatus::Unknown)
    }
}

/// Per-metric threshold table, keyed by the literal configured metric name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    metrics: HashMap<String, MetricThresholds>,
}

impl ThresholdConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row. When a metric name repeats, the first row wins.
    pub fn insert(&mut self, thresholds: MetricThresholds) -> bool {
        if self.metrics.contains_key(&thresholds.metric_name) {
            warn!(metric = %thresholds.metric_name, "Duplicate threshold row ignored");
            return false;
        }
        self.metrics
            .insert(thresholds.metric_name.clone(), thresholds);
        true
    }

    pub fn get(&self, metric_name: &str) -> Option<&MetricThresholds> {
        self.metrics.get(metric_name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricThresholds> {
        self.metrics.values()
    }

    /// Built-in sports-science bands, keyed by normalized metric names
    pub fn standard() -> Self {
        let rows = [
            MetricThresholds::new(Metric::RestingHr.config_name())
                .optimal(42.0, 54.0)
                .caution(55.0, 59.0)
                .critical(60.0, 100.0)
                .unit("bpm"),
            MetricThresholds::new(Metric::AvgHrDay.config_name())
                .optimal(50.0, 68.0)
                .caution(69.0, 74.0)
                .critical(75.0, 120.0)
                .unit("bpm"),
            MetricThresholds::new(Metric::Spo2Night.config_name())
                .optimal(97.0, 100.0)
                .caution(95.0, 96.0)
                .critical(0.0, 94.0)
                .unit("%"),
            MetricThresholds::new(Metric::HrvNight.config_name())
                .optimal(90.0, 200.0)
                .caution(70.0, 89.0)
                .critical(0.0, 69.0)
                .unit("ms"),
            MetricThresholds::new(Metric::DeepSleepPct.config_name())
                .optimal(22.0, 100.0)
                .caution(17.0, 21.0)
                .critical(0.0, 16.0)
                .unit("%"),
            MetricThresholds::new(Metric::RemSleepPct.config_name())
                .optimal(20.0, 25.0)
                .caution(16.0, 19.0)
                .caution_secondary(26.0, 30.0)
                .critical(0.0, 15.0)
                .critical_secondary(31.0, 100.0)
                .unit("%"),
            MetricThresholds::new(Metric::LightSleepPct.config_name())
                .optimal(35.0, 45.0)
                .caution(46.0, 50.0)
                .critical(51.0, 100.0)
                .unit("%"),
            MetricThresholds::new(Metric::SleepDurationH.config_name())
                .optimal(8.0, 9.2)
                .caution(7.0, 7.9)
                .critical(0.0, 6.9)
                .unit("h"),
            MetricThresholds::new(Metric::RespRateNight.config_name())
                .optimal(10.0, 14.0)
                .caution(15.0, 16.0)
                .critical(17.0, 100.0)
                .unit("/min"),
            MetricThresholds::new(Metric::TempTrendC.config_name())
                .optimal(36.4, 36.9)
                .caution(37.0, 37.3)
                .caution_secondary(36.3, 36.3)
                .critical(37.4, 42.0)
                .critical_secondary(0.0, 36.2)
                .unit("°C"),
            MetricThresholds::new(Metric::TrainingLoadPct.config_name())
                .optimal(100.0, 100.0)
                .caution(85.0, 99.0)
                .critical(0.0, 70.0)
                .unit("%"),
        ];

        let mut config = Self::new();
        for row in rows {
            config.insert(row);
        }
        config
    }
}

/// Reading from the latest observation together with its zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub metric: Metric,
    pub value: Option<f64>,
    pub status: ZoneStatus,
}

/// Zone lookup utilities
pub struct ZoneClassifier;

impl ZoneClassifier {
    /// Classify a value against the threshold row for `metric_name`.
    ///
    /// Critical ranges are checked before caution ranges, caution before
    /// optimal. Malformed rows degrade to [`ZoneStatus::Error`].
    pub fn classify(value: Option<f64>, metric_name: &str, config: &ThresholdConfig) -> ZoneStatus {
        let value = match value {
            Some(v) if !v.is_nan() => v,
            _ => return ZoneStatus::NoData,
        };

        let Some(thresholds) = config.get(metric_name) else {
            return ZoneStatus::NoConfig;
        };

        match thresholds.evaluate(value) {
            Ok(status) => status,
            Err(e) => {
                warn!(metric = %metric_name, error = %e, "Zone lookup failed");
                ZoneStatus::Error
            }
        }
    }

    /// Classify one metric of an observation under its normalized name
    pub fn classify_metric(
        observation: &MetricObservation,
        metric: Metric,
        config: &ThresholdConfig,
    ) -> ZoneStatus {
        Self::classify(observation.get(metric), &metric.config_name(), config)
    }

    /// Zone status of every display metric in an observation
    pub fn snapshot(observation: &MetricObservation, config: &ThresholdConfig) -> Vec<MetricReading> {
        Metric::DISPLAY
            .iter()
            .map(|&metric| MetricReading {
                metric,
                value: observation.get(metric),
                status: Self::classify_metric(observation, metric, config),
            })
            .collect()
    }
}

/// Map a column name onto the threshold table's naming: underscores become
/// spaces and every alphabetic run is title-cased (`spo2_night` → `Spo2 Night`).
pub fn normalize_metric_name(column: &str) -> String {
    let mut normalized = String::with_capacity(column.len());
    let mut previous_alphabetic = false;

    for c in column.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if previous_alphabetic {
                normalized.extend(c.to_lowercase());
            } else {
                normalized.extend(c.to_uppercase());
            }
            previous_alphabetic = true;
        } else {
            normalized.push(c);
            previous_alphabetic = false;
        }
    }

    normalized
}
