//! Athletes, nightly biometric observations and alert records

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::error::ClassificationError;
use crate::zones::normalize_metric_name;

/// Biometric readings tracked per athlete per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Overnight heart rate variability (ms)
    HrvNight,
    /// Resting heart rate (bpm)
    RestingHr,
    /// Average daytime heart rate (bpm)
    AvgHrDay,
    /// Overnight blood-oxygen saturation (%)
    Spo2Night,
    /// Overnight respiratory rate (breaths/min)
    RespRateNight,
    /// Deep sleep share of total sleep (%)
    DeepSleepPct,
    /// REM sleep share of total sleep (%)
    RemSleepPct,
    /// Light sleep share of total sleep (%)
    LightSleepPct,
    /// Total sleep duration (hours)
    SleepDurationH,
    /// Core temperature trend (°C)
    TempTrendC,
    /// Training load relative to plan (%)
    TrainingLoadPct,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::HrvNight,
        Metric::RestingHr,
        Metric::AvgHrDay,
        Metric::Spo2Night,
        Metric::RespRateNight,
        Metric::DeepSleepPct,
        Metric::RemSleepPct,
        Metric::LightSleepPct,
        Metric::SleepDurationH,
        Metric::TempTrendC,
        Metric::TrainingLoadPct,
    ];

    /// Metrics shown on the athlete detail view, in display order
    pub const DISPLAY: [Metric; 9] = [
        Metric::HrvNight,
        Metric::RestingHr,
        Metric::Spo2Night,
        Metric::RespRateNight,
        Metric::DeepSleepPct,
        Metric::RemSleepPct,
        Metric::SleepDurationH,
        Metric::TempTrendC,
        Metric::TrainingLoadPct,
    ];

    /// Column name used by the biometric source
    pub fn column(&self) -> &'static str {
        match self {
            Metric::HrvNight => "hrv_night",
            Metric::RestingHr => "resting_hr",
            Metric::AvgHrDay => "avg_hr_day",
            Metric::Spo2Night => "spo2_night",
            Metric::RespRateNight => "resp_rate_night",
            Metric::DeepSleepPct => "deep_sleep_pct",
            Metric::RemSleepPct => "rem_sleep_pct",
            Metric::LightSleepPct => "light_sleep_pct",
            Metric::SleepDurationH => "sleep_duration_h",
            Metric::TempTrendC => "temp_trend_c",
            Metric::TrainingLoadPct => "training_load_pct",
        }
    }

    pub fn from_column(column: &str) -> Option<Metric> {
        Metric::ALL.iter().copied().find(|m| m.column() == column)
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Metric::HrvNight => "HRV (Night)",
            Metric::RestingHr => "Resting HR",
            Metric::AvgHrDay => "Avg HR (Day)",
            Metric::Spo2Night => "SpO₂ (Night)",
            Metric::RespRateNight => "Respiratory Rate",
            Metric::DeepSleepPct => "Deep Sleep %",
            Metric::RemSleepPct => "REM Sleep %",
            Metric::LightSleepPct => "Light Sleep %",
            Metric::SleepDurationH => "Sleep Duration",
            Metric::TempTrendC => "Temperature",
            Metric::TrainingLoadPct => "Training Load",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::HrvNight => "ms",
            Metric::RestingHr | Metric::AvgHrDay => "bpm",
            Metric::RespRateNight => "/min",
            Metric::SleepDurationH => "h",
            Metric::TempTrendC => "°C",
            Metric::Spo2Night
            | Metric::DeepSleepPct
            | Metric::RemSleepPct
            | Metric::LightSleepPct
            | Metric::TrainingLoadPct => "%",
        }
    }

    /// Name under which the threshold configuration lists this metric
    pub fn config_name(&self) -> String {
        normalize_metric_name(self.column())
    }

    /// Population-typical value substituted when a reading is missing
    ///
    /// | metric           | default |
    /// |------------------|---------|
    /// | hrv_night        | 50      |
    /// | resting_hr       | 60      |
    /// | temp_trend_c     | 36.5    |
    /// | spo2_night       | 97      |
    /// | deep_sleep_pct   | 20      |
    /// | rem_sleep_pct    | 20      |
    /// | sleep_duration_h | 8       |
    /// | resp_rate_night  | 15      |
    pub fn population_default(&self) -> Option<f64> {
        match self {
            Metric::HrvNight => Some(50.0),
            Metric::RestingHr => Some(60.0),
            Metric::TempTrendC => Some(36.5),
            Metric::Spo2Night => Some(97.0),
            Metric::DeepSleepPct => Some(20.0),
            Metric::RemSleepPct => Some(20.0),
            Metric::SleepDurationH => Some(8.0),
            Metric::RespRateNight => Some(15.0),
            Metric::AvgHrDay | Metric::LightSleepPct | Metric::TrainingLoadPct => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// One day's readings for one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricObservation {
    /// Calendar date of the readings
    pub date: NaiveDate,

    values: BTreeMap<Metric, f64>,

    /// Time the athlete fell asleep, if recorded
    pub sleep_onset: Option<NaiveTime>,

    /// Time the athlete woke up, if recorded
    pub wake_time: Option<NaiveTime>,
}

impl MetricObservation {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
            sleep_onset: None,
            wake_time: None,
        }
    }

    pub fn with_value(mut self, metric: Metric, value: f64) -> Self {
        self.values.insert(metric, value);
        self
    }

    pub fn with_sleep_onset(mut self, onset: NaiveTime) -> Self {
        self.sleep_onset = Some(onset);
        self
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        self.values.insert(metric, value);
    }

    /// Raw reading, `None` when absent
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    /// Reading with the population default substituted when absent or NaN.
    ///
    /// Metrics without a documented default fall back to zero. An infinite
    /// reading is reported as a fault.
    pub fn value_or_default(&self, metric: Metric) -> Result<f64, ClassificationError> {
        match self.get(metric) {
            Some(value) if value.is_finite() => Ok(value),
            Some(value) if value.is_infinite() => Err(ClassificationError::NonFiniteMetric { metric, value }),
            _ => Ok(metric.population_default().unwrap_or(0.0)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Date-ordered observations for one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteHistory {
    athlete_id: String,
    observations: Vec<MetricObservation>,
}

impl AthleteHistory {
    /// Build a history, sorting by date and keeping the first row per date
    pub fn new(athlete_id: impl Into<String>, mut observations: Vec<MetricObservation>) -> Self {
        let athlete_id = athlete_id.into();
        observations.sort_by_key(|o| o.date);

        let before = observations.len();
        observations.dedup_by_key(|o| o.date);
        if observations.len() < before {
            warn!(
                athlete = %athlete_id,
                dropped = before - observations.len(),
                "Duplicate observation dates in history, keeping first row per date"
            );
        }

        Self {
            athlete_id,
            observations,
        }
    }

    pub fn empty(athlete_id: impl Into<String>) -> Self {
        Self {
            athlete_id: athlete_id.into(),
            observations: Vec::new(),
        }
    }

    pub fn athlete_id(&self) -> &str {
        &self.athlete_id
    }

    pub fn observations(&self) -> &[MetricObservation] {
        &self.observations
    }

    pub fn latest(&self) -> Option<&MetricObservation> {
        self.observations.last()
    }

    pub fn previous(&self) -> Option<&MetricObservation> {
        let len = self.observations.len();
        if len >= 2 {
            self.observations.get(len - 2)
        } else {
            None
        }
    }

    /// The last `n` observations (fewer if the history is shorter)
    pub fn recent(&self, n: usize) -> &[MetricObservation] {
        let start = self.observations.len().saturating_sub(n);
        &self.observations[start..]
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Gene symbol to genotype label, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenotypeMap {
    entries: Vec<(String, String)>,
}

impl GenotypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a genotype, replacing any earlier label for the same gene
    pub fn insert(&mut self, gene: impl Into<String>, genotype: impl Into<String>) {
        let gene = gene.into();
        let genotype = genotype.into();
        match self.entries.iter_mut().find(|(g, _)| *g == gene) {
            Some(entry) => entry.1 = genotype,
            None => self.entries.push((gene, genotype)),
        }
    }

    pub fn get(&self, gene: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(g, _)| g == gene)
            .map(|(_, genotype)| genotype.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(g, t)| (g.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<G: Into<String>, T: Into<String>> FromIterator<(G, T)> for GenotypeMap {
    fn from_iter<I: IntoIterator<Item = (G, T)>>(iter: I) -> Self {
        let mut map = GenotypeMap::new();
        for (gene, genotype) in iter {
            map.insert(gene, genotype);
        }
        map
    }
}

/// Athlete directory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub athlete_id: String,
    pub name: String,
    pub sport: String,
    pub age: u16,
    pub team: String,
    pub sex: Option<String>,
    pub baseline_start_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Mutually exclusive recovery classifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertCategory {
    Inflammation,
    Circadian,
    Nutrition,
    Airway,
    Optimal,
    NoData,
    Error,
}

impl AlertCategory {
    pub const ALL: [AlertCategory; 7] = [
        AlertCategory::Inflammation,
        AlertCategory::Circadian,
        AlertCategory::Nutrition,
        AlertCategory::Airway,
        AlertCategory::Optimal,
        AlertCategory::NoData,
        AlertCategory::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Inflammation => "inflammation",
            AlertCategory::Circadian => "circadian",
            AlertCategory::Nutrition => "nutrition",
            AlertCategory::Airway => "airway",
            AlertCategory::Optimal => "optimal",
            AlertCategory::NoData => "no-data",
            AlertCategory::Error => "error",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AlertCategory::Inflammation => "Inflammation/Illness Risk",
            AlertCategory::Circadian => "Circadian Misalignment",
            AlertCategory::Nutrition => "Possible Nutrient Gap",
            AlertCategory::Airway => "Airway/Respiratory Stress",
            AlertCategory::Optimal => "Optimal Recovery State",
            AlertCategory::NoData => "No Data",
            AlertCategory::Error => "Analysis Error",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            AlertCategory::Inflammation => {
                "Prioritize rest, hydration, anti-inflammatory nutrition. Monitor temperature closely."
            }
            AlertCategory::Circadian => {
                "Advance bedtime by 45min, increase morning light exposure, avoid screens after 9PM."
            }
            AlertCategory::Nutrition => {
                "Check iron, magnesium, omega-3, B12 status. Increase nutrient-dense foods."
            }
            AlertCategory::Airway => {
                "Evaluate sleep environment, nasal breathing. Consider air quality assessment."
            }
            AlertCategory::Optimal => "Maintain current training and recovery protocols.",
            AlertCategory::NoData => "Please ensure data collection is active.",
            AlertCategory::Error => "Check data quality and re-run the analysis.",
        }
    }

    pub fn priority(&self) -> AlertPriority {
        match self {
            AlertCategory::Inflammation | AlertCategory::Airway => AlertPriority::High,
            AlertCategory::Circadian | AlertCategory::Nutrition => AlertPriority::Monitor,
            AlertCategory::Optimal => AlertPriority::Optimal,
            AlertCategory::NoData | AlertCategory::Error => AlertPriority::Unknown,
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity grouping used by dashboards
///
/// `Unknown` keeps "can't tell" apart from "all clear".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertPriority {
    /// Requires immediate attention
    High,
    /// May need intervention
    Monitor,
    /// Ready for training
    Optimal,
    /// No data or analysis failed
    Unknown,
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertPriority::High => write!(f, "High Priority"),
            AlertPriority::Monitor => write!(f, "Monitor Closely"),
            AlertPriority::Optimal => write!(f, "Optimal"),
            AlertPriority::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Classification output for one athlete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub category: AlertCategory,
    pub title: String,
    pub cause: String,
    pub recommendation: String,
}

impl Alert {
    pub fn new(category: AlertCategory, cause: impl Into<String>) -> Self {
        Self {
            category,
            title: category.title().to_string(),
            cause: cause.into(),
            recommendation: category.recommendation().to_string(),
        }
    }

    pub fn priority(&self) -> AlertPriority {
        self.category.priority()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    #[test]
    fn test_metric_columns_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_column(metric.column()), Some(metric));
        }
        assert_eq!(Metric::from_column("hrv"), None);
    }

    #[test]
    fn test_metric_config_names() {
        assert_eq!(Metric::RemSleepPct.config_name(), "Rem Sleep Pct");
        assert_eq!(Metric::Spo2Night.config_name(), "Spo2 Night");
        assert_eq!(Metric::TempTrendC.config_name(), "Temp Trend C");
    }

    #[test]
    fn test_value_or_default() {
        let obs = MetricObservation::new(date(1))
            .with_value(Metric::HrvNight, 72.0)
            .with_value(Metric::RestingHr, f64::NAN)
            .with_value(Metric::Spo2Night, f64::NEG_INFINITY);

        assert_eq!(obs.value_or_default(Metric::HrvNight), Ok(72.0));
        assert_eq!(obs.value_or_default(Metric::TempTrendC), Ok(36.5));
        assert_eq!(obs.value_or_default(Metric::TrainingLoadPct), Ok(0.0));
        // NaN counts as missing
        assert_eq!(obs.value_or_default(Metric::RestingHr), Ok(60.0));
        assert!(matches!(
            obs.value_or_default(Metric::Spo2Night),
            Err(ClassificationError::NonFiniteMetric { metric: Metric::Spo2Night, .. })
        ));
    }

    #[test]
    fn test_history_sorted_and_deduplicated() {
        let history = AthleteHistory::new(
            "alex",
            vec![
                MetricObservation::new(date(3)).with_value(Metric::HrvNight, 3.0),
                MetricObservation::new(date(1)).with_value(Metric::HrvNight, 1.0),
                MetricObservation::new(date(3)).with_value(Metric::HrvNight, 99.0),
                MetricObservation::new(date(2)).with_value(Metric::HrvNight, 2.0),
            ],
        );

        assert_eq!(history.len(), 3);
        assert_eq!(history.latest().unwrap().get(Metric::HrvNight), Some(3.0));
        assert_eq!(history.previous().unwrap().get(Metric::HrvNight), Some(2.0));
        assert_eq!(history.recent(2).len(), 2);
        assert_eq!(history.recent(10).len(), 3);
    }

    #[test]
    fn test_single_observation_has_no_previous() {
        let history = AthleteHistory::new("alex", vec![MetricObservation::new(date(1))]);
        assert!(history.latest().is_some());
        assert!(history.previous().is_none());
        assert!(AthleteHistory::empty("alex").latest().is_none());
    }

    #[test]
    fn test_genotype_map_replaces_duplicates() {
        let mut map: GenotypeMap = vec![("PER3", "short"), ("CLOCK", "AA")].into_iter().collect();
        map.insert("PER3", "long");

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("PER3"), Some("long"));
        assert_eq!(map.iter().next(), Some(("PER3", "long")));
        assert_eq!(map.get("ACTN3"), None);
    }

    #[test]
    fn test_alert_priorities() {
        assert_eq!(AlertCategory::Inflammation.priority(), AlertPriority::High);
        assert_eq!(AlertCategory::Nutrition.priority(), AlertPriority::Monitor);
        assert_eq!(AlertCategory::Error.priority(), AlertPriority::Unknown);

        let alert = Alert::new(AlertCategory::Optimal, "All metrics within target ranges");
        assert_eq!(alert.title, "Optimal Recovery State");
        assert_eq!(
            serde_json::to_string(&AlertCategory::NoData).unwrap(),
            "\"no-data\""
        );
    }
}
