//! Short-horizon performance readiness forecast
//!
//! Scores the last three nights of HRV, resting heart rate and sleep duration.
//! Separate from the alert engine: an athlete can be `optimal` and still show a
//! moderate readiness score, or the other way round.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

use crate::models::{AthleteHistory, Metric};

/// Observations required before a forecast is produced
pub const MIN_FORECAST_OBSERVATIONS: usize = 3;

/// Direction of the latest night against the one before
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Falling,
}

impl TrendDirection {
    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::Rising => "↗",
            TrendDirection::Falling => "↘",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.arrow())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessBand {
    Ready,
    Moderate,
    Low,
}

impl ReadinessBand {
    pub fn from_score(score: f64) -> Self {
        if score > 75.0 {
            ReadinessBand::Ready
        } else if score > 50.0 {
            ReadinessBand::Moderate
        } else {
            ReadinessBand::Low
        }
    }
}

impl fmt::Display for ReadinessBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessBand::Ready => write!(f, "Ready"),
            ReadinessBand::Moderate => write!(f, "Moderate"),
            ReadinessBand::Low => write!(f, "Low"),
        }
    }
}

/// Recent mean and direction for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    /// Mean of the finite readings among the last three nights
    pub recent_mean: Option<f64>,
    pub direction: TrendDirection,
    /// Component score: 0, 0.5 or 1
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessForecast {
    pub hrv: MetricTrend,
    pub resting_hr: MetricTrend,
    pub sleep_duration: MetricTrend,
    /// Mean component score scaled to 0-100
    pub overall_score: f64,
    pub band: ReadinessBand,
}

/// Forecast from the most recent nights, or `None` with fewer than
/// [`MIN_FORECAST_OBSERVATIONS`] observations.
pub fn forecast(history: &AthleteHistory) -> Option<ReadinessForecast> {
    if history.len() < MIN_FORECAST_OBSERVATIONS {
        return None;
    }

    let hrv = metric_trend(history, Metric::HrvNight, hrv_score);
    let resting_hr = metric_trend(history, Metric::RestingHr, rhr_score);
    let sleep_duration = metric_trend(history, Metric::SleepDurationH, sleep_score);

    let overall_score = [hrv.score, resting_hr.score, sleep_duration.score].mean() * 100.0;

    Some(ReadinessForecast {
        hrv,
        resting_hr,
        sleep_duration,
        overall_score,
        band: ReadinessBand::from_score(overall_score),
    })
}

fn metric_trend(history: &AthleteHistory, metric: Metric, score: fn(f64) -> f64) -> MetricTrend {
    let values: Vec<f64> = history
        .recent(MIN_FORECAST_OBSERVATIONS)
        .iter()
        .filter_map(|obs| obs.get(metric))
        .filter(|v| v.is_finite())
        .collect();

    let recent_mean = if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    };

    let latest = history.latest().and_then(|obs| obs.get(metric));
    let previous = history.previous().and_then(|obs| obs.get(metric));
    let direction = match (latest, previous) {
        (Some(l), Some(p)) if l > p => TrendDirection::Rising,
        _ => TrendDirection::Falling,
    };

    MetricTrend {
        recent_mean,
        direction,
        score: recent_mean.map(score).unwrap_or(0.0),
    }
}

fn hrv_score(mean: f64) -> f64 {
    if mean > 45.0 {
        1.0
    } else if mean > 35.0 {
        0.5
    } else {
        0.0
    }
}

fn rhr_score(mean: f64) -> f64 {
    if mean < 65.0 {
        1.0
    } else if mean < 75.0 {
        0.5
    } else {
        0.0
    }
}

fn sleep_score(mean: f64) -> f64 {
    if mean > 7.5 {
        1.0
    } else if mean > 6.5 {
        0.5
    } else {
        0.0
    }
}
