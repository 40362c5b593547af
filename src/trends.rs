//! Deviation and threshold flags for the latest observation
//!
//! Heart-rate variability and resting heart rate are compared against the
//! previous night when one exists; every other flag is a point-in-time check
//! on the latest observation. Missing or NaN readings take the population
//! defaults documented on [`Metric::population_default`].

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ClassificationError;
use crate::models::{AthleteHistory, Metric, MetricObservation};

/// Cut-offs used by the trend detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendThresholds {
    /// Relative night-over-night HRV drop that counts as a decline
    pub hrv_drop_ratio: f64,

    /// Absolute HRV floor (ms) used without a usable previous night
    pub hrv_floor: f64,

    /// Relative night-over-night resting HR rise that counts as elevated
    pub rhr_rise_ratio: f64,

    /// Absolute resting HR ceiling (bpm) used without a usable previous night
    pub rhr_ceiling: f64,

    /// Core temperature (°C) at or above which the temperature flag is set
    pub temp_high_c: f64,

    /// SpO₂ (%) at or below which oxygenation is flagged
    pub spo2_low_pct: f64,

    pub deep_sleep_low_pct: f64,

    pub rem_sleep_low_pct: f64,

    pub sleep_short_h: f64,

    /// Respiratory rate (breaths/min) at or above which it is flagged
    pub resp_rate_high: f64,

    /// Sleep onsets strictly later than this time of day are late
    pub late_onset: NaiveTime,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            hrv_drop_ratio: 0.15,
            hrv_floor: 40.0,
            rhr_rise_ratio: 0.05,
            rhr_ceiling: 70.0,
            temp_high_c: 37.0,
            spo2_low_pct: 94.0,
            deep_sleep_low_pct: 17.0,
            rem_sleep_low_pct: 16.0,
            sleep_short_h: 7.0,
            resp_rate_high: 17.0,
            late_onset: NaiveTime::from_hms_opt(23, 30, 0).unwrap_or_default(),
        }
    }
}

/// Latest readings after default substitution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReadings {
    pub hrv: f64,
    pub resting_hr: f64,
    pub temperature: f64,
    pub spo2: f64,
    pub deep_sleep_pct: f64,
    pub rem_sleep_pct: f64,
    pub sleep_duration_h: f64,
    pub resp_rate: f64,
    pub sleep_onset: Option<NaiveTime>,
}

impl TrendReadings {
    fn from_observation(observation: &MetricObservation) -> Result<Self, ClassificationError> {
        Ok(Self {
            hrv: observation.value_or_default(Metric::HrvNight)?,
            resting_hr: observation.value_or_default(Metric::RestingHr)?,
            temperature: observation.value_or_default(Metric::TempTrendC)?,
            spo2: observation.value_or_default(Metric::Spo2Night)?,
            deep_sleep_pct: observation.value_or_default(Metric::DeepSleepPct)?,
            rem_sleep_pct: observation.value_or_default(Metric::RemSleepPct)?,
            sleep_duration_h: observation.value_or_default(Metric::SleepDurationH)?,
            resp_rate: observation.value_or_default(Metric::RespRateNight)?,
            sleep_onset: observation.sleep_onset,
        })
    }
}

/// Boolean signals consumed by the alert rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendFlags {
    pub hrv_drop: bool,
    pub rhr_rise: bool,
    pub temp_high: bool,
    pub spo2_low: bool,
    pub deep_sleep_low: bool,
    pub rem_sleep_low: bool,
    pub sleep_short: bool,
    pub resp_rate_high: bool,
    pub sleep_late: bool,
}

/// Flags plus the readings they were computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub readings: TrendReadings,
    pub flags: TrendFlags,
    /// Whether a previous night was available for the relative tests
    pub has_previous: bool,
}

/// Computes [`TrendFlags`] for the latest night of a history
#[derive(Debug, Clone, Default)]
pub struct TrendDetector {
    thresholds: TrendThresholds,
}

impl TrendDetector {
    pub fn new(thresholds: TrendThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &TrendThresholds {
        &self.thresholds
    }

    /// Detect flags for the latest observation of `history`
    pub fn detect(&self, history: &AthleteHistory) -> Result<TrendSnapshot, ClassificationError> {
        let latest = history
            .latest()
            .ok_or_else(|| ClassificationError::EmptyHistory {
                athlete_id: history.athlete_id().to_string(),
            })?;

        self.evaluate(latest, history.previous())
    }

    /// Detect flags for `latest`, comparing against `previous` when given
    pub fn evaluate(
        &self,
        latest: &MetricObservation,
        previous: Option<&MetricObservation>,
    ) -> Result<TrendSnapshot, ClassificationError> {
        let readings = TrendReadings::from_observation(latest)?;
        let t = &self.thresholds;

        let (prev_hrv, prev_rhr) = match previous {
            Some(prev) => (
                Some(prev.value_or_default(Metric::HrvNight)?),
                Some(prev.value_or_default(Metric::RestingHr)?),
            ),
            None => (None, None),
        };

        let hrv_drop = match prev_hrv {
            Some(prev) if prev > 0.0 => (prev - readings.hrv) / prev > t.hrv_drop_ratio,
            _ => readings.hrv < t.hrv_floor,
        };

        let rhr_rise = match prev_rhr {
            Some(prev) if prev > 0.0 => (readings.resting_hr - prev) / prev > t.rhr_rise_ratio,
            _ => readings.resting_hr > t.rhr_ceiling,
        };

        let flags = TrendFlags {
            hrv_drop,
            rhr_rise,
            temp_high: readings.temperature >= t.temp_high_c,
            spo2_low: readings.spo2 <= t.spo2_low_pct,
            deep_sleep_low: readings.deep_sleep_pct < t.deep_sleep_low_pct,
            rem_sleep_low: readings.rem_sleep_pct < t.rem_sleep_low_pct,
            sleep_short: readings.sleep_duration_h < t.sleep_short_h,
            resp_rate_high: readings.resp_rate >= t.resp_rate_high,
            sleep_late: readings
                .sleep_onset
                .map_or(false, |onset| onset > t.late_onset),
        };

        Ok(TrendSnapshot {
            readings,
            flags,
            has_previous: previous.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn night(day: u32) -> MetricObservation {
        MetricObservation::new(NaiveDate::from_ymd_opt(2025, 4, day).unwrap())
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_relative_hrv_drop_and_rhr_rise() {
        let history = AthleteHistory::new(
            "jordan",
            vec![
                night(1)
                    .with_value(Metric::HrvNight, 80.0)
                    .with_value(Metric::RestingHr, 55.0),
                night(2)
                    .with_value(Metric::HrvNight, 55.0)
                    .with_value(Metric::RestingHr, 60.0),
            ],
        );

        let snapshot = TrendDetector::default().detect(&history).unwrap();
        assert!(snapshot.has_previous);
        assert!(snapshot.flags.hrv_drop);
        assert!(snapshot.flags.rhr_rise);
    }

    #[test]
    fn test_relative_test_ignores_absolute_thresholds() {
        // 35ms would trip the absolute floor, but it is only a 12.5% drop
        let history = AthleteHistory::new(
            "jordan",
            vec![
                night(1).with_value(Metric::HrvNight, 40.0),
                night(2).with_value(Metric::HrvNight, 35.0),
            ],
        );

        let snapshot = TrendDetector::default().detect(&history).unwrap();
        assert!(!snapshot.flags.hrv_drop);
    }

    #[test]
    fn test_single_observation_uses_absolute_fallback() {
        let detector = TrendDetector::default();

        let low = AthleteHistory::new(
            "alex",
            vec![night(1)
                .with_value(Metric::HrvNight, 39.0)
                .with_value(Metric::RestingHr, 71.0)],
        );
        let snapshot = detector.detect(&low).unwrap();
        assert!(!snapshot.has_previous);
        assert!(snapshot.flags.hrv_drop);
        assert!(snapshot.flags.rhr_rise);

        let boundary = AthleteHistory::new(
            "alex",
            vec![night(1)
                .with_value(Metric::HrvNight, 40.0)
                .with_value(Metric::RestingHr, 70.0)],
        );
        let snapshot = detector.detect(&boundary).unwrap();
        assert!(!snapshot.flags.hrv_drop);
        assert!(!snapshot.flags.rhr_rise);
    }

    #[test]
    fn test_non_positive_previous_forces_fallback() {
        let history = AthleteHistory::new(
            "casey",
            vec![
                night(1)
                    .with_value(Metric::HrvNight, 0.0)
                    .with_value(Metric::RestingHr, -1.0),
                night(2)
                    .with_value(Metric::HrvNight, 30.0)
                    .with_value(Metric::RestingHr, 75.0),
            ],
        );

        let snapshot = TrendDetector::default().detect(&history).unwrap();
        assert!(snapshot.flags.hrv_drop);
        assert!(snapshot.flags.rhr_rise);
    }

    #[test]
    fn test_missing_previous_reading_uses_default() {
        // previous HRV defaults to 50, so 40 is a 20% drop
        let history = AthleteHistory::new(
            "casey",
            vec![night(1), night(2).with_value(Metric::HrvNight, 40.0)],
        );

        let snapshot = TrendDetector::default().detect(&history).unwrap();
        assert!(snapshot.flags.hrv_drop);
        assert!(!snapshot.flags.rhr_rise);
    }

    #[test]
    fn test_point_in_time_flags() {
        let history = AthleteHistory::new(
            "riley",
            vec![night(1)
                .with_value(Metric::TempTrendC, 37.0)
                .with_value(Metric::Spo2Night, 94.0)
                .with_value(Metric::DeepSleepPct, 16.9)
                .with_value(Metric::RemSleepPct, 15.9)
                .with_value(Metric::SleepDurationH, 6.9)
                .with_value(Metric::RespRateNight, 17.0)],
        );

        let flags = TrendDetector::default().detect(&history).unwrap().flags;
        assert!(flags.temp_high);
        assert!(flags.spo2_low);
        assert!(flags.deep_sleep_low);
        assert!(flags.rem_sleep_low);
        assert!(flags.sleep_short);
        assert!(flags.resp_rate_high);
        assert!(!flags.sleep_late);
    }

    #[test]
    fn test_defaults_raise_no_flags() {
        let history = AthleteHistory::new("morgan", vec![night(1)]);
        let snapshot = TrendDetector::default().detect(&history).unwrap();

        assert_eq!(snapshot.flags, TrendFlags::default());
        assert_eq!(snapshot.readings.hrv, 50.0);
        assert_eq!(snapshot.readings.sleep_duration_h, 8.0);
        assert_eq!(snapshot.readings.sleep_onset, None);
    }

    #[test]
    fn test_sleep_late_is_strict_and_same_day() {
        let detector = TrendDetector::default();
        let late = |onset: NaiveTime| {
            let history = AthleteHistory::new("taylor", vec![night(1).with_sleep_onset(onset)]);
            detector.detect(&history).unwrap().flags.sleep_late
        };

        assert!(!late(time(23, 30)));
        assert!(late(time(23, 31)));
        assert!(late(time(23, 45)));
        assert!(!late(time(0, 30)));
        assert!(!late(time(22, 0)));
    }

    #[test]
    fn test_non_finite_reading_is_a_fault() {
        let history = AthleteHistory::new(
            "austin",
            vec![night(1).with_value(Metric::Spo2Night, f64::INFINITY)],
        );

        let err = TrendDetector::default().detect(&history).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::NonFiniteMetric {
                metric: Metric::Spo2Night,
                value: f64::INFINITY
            }
        );
    }

    #[test]
    fn test_nan_previous_reading_uses_default() {
        let history = AthleteHistory::new(
            "austin",
            vec![
                night(1).with_value(Metric::HrvNight, f64::NAN),
                night(2).with_value(Metric::HrvNight, 44.0),
            ],
        );

        // compared against the 50ms default: a 12% drop
        let snapshot = TrendDetector::default().detect(&history).unwrap();
        assert!(!snapshot.flags.hrv_drop);
        assert_eq!(snapshot.readings.hrv, 44.0);
    }

    #[test]
    fn test_empty_history_is_a_fault() {
        let err = TrendDetector::default()
            .detect(&AthleteHistory::empty("nobody"))
            .unwrap_err();
        assert!(matches!(err, ClassificationError::EmptyHistory { .. }));
    }

    #[test]
    fn test_custom_thresholds() {
        let detector = TrendDetector::new(TrendThresholds {
            hrv_floor: 60.0,
            ..TrendThresholds::default()
        });
        let history = AthleteHistory::new("alex", vec![night(1).with_value(Metric::HrvNight, 55.0)]);
        assert!(detector.detect(&history).unwrap().flags.hrv_drop);
    }
}
