//! Recovery alert classification
//!
//! Rules are evaluated top-down and the first match wins. The most specific,
//! most urgent combination (inflammation) is checked first; `optimal` is the
//! fallback when nothing matches, so every call yields exactly one category.

use tracing::{debug, warn};

use crate::error::ClassificationError;
use crate::models::{Alert, AlertCategory, AthleteHistory, GenotypeMap};
use crate::trends::{TrendDetector, TrendFlags, TrendReadings, TrendThresholds};

/// Longest fault description embedded in an error alert
const MAX_FAULT_CHARS: usize = 50;

/// One entry of the ordered rule table
#[derive(Debug, Clone, Copy)]
pub struct AlertRule {
    category: AlertCategory,
    predicate: fn(&TrendFlags) -> bool,
    formatter: fn(&TrendReadings) -> String,
}

impl AlertRule {
    pub fn category(&self) -> AlertCategory {
        self.category
    }

    pub fn matches(&self, flags: &TrendFlags) -> bool {
        (self.predicate)(flags)
    }

    /// Cause message with the contributing readings formatted in
    pub fn describe(&self, readings: &TrendReadings) -> String {
        (self.formatter)(readings)
    }
}

static RULES: [AlertRule; 4] = [
    AlertRule {
        category: AlertCategory::Inflammation,
        predicate: inflammation_matches,
        formatter: inflammation_cause,
    },
    AlertRule {
        category: AlertCategory::Circadian,
        predicate: circadian_matches,
        formatter: circadian_cause,
    },
    AlertRule {
        category: AlertCategory::Nutrition,
        predicate: nutrition_matches,
        formatter: nutrition_cause,
    },
    AlertRule {
        category: AlertCategory::Airway,
        predicate: airway_matches,
        formatter: airway_cause,
    },
];

/// The rule table in evaluation order
pub fn rules() -> &'static [AlertRule] {
    &RULES
}

fn inflammation_matches(f: &TrendFlags) -> bool {
    f.hrv_drop && f.rhr_rise && f.temp_high && f.spo2_low
}

fn inflammation_cause(r: &TrendReadings) -> String {
    format!(
        "HRV↓({:.0}) + RHR↑({:.0}) + Temp↑({:.1}) + SpO₂↓({:.1})",
        r.hrv, r.resting_hr, r.temperature, r.spo2
    )
}

fn circadian_matches(f: &TrendFlags) -> bool {
    f.hrv_drop && f.deep_sleep_low && f.sleep_late
}

fn circadian_cause(r: &TrendReadings) -> String {
    // sleep_late implies an onset time; "Late" only guards hand-built readings
    let onset = r
        .sleep_onset
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "Late".to_string());
    format!(
        "HRV↓ + Deep Sleep↓({:.1}%) + Late Sleep({})",
        r.deep_sleep_pct, onset
    )
}

fn nutrition_matches(f: &TrendFlags) -> bool {
    f.hrv_drop && f.rem_sleep_low && !f.temp_high
}

fn nutrition_cause(r: &TrendReadings) -> String {
    format!("HRV↓ + REM↓({:.1}%) with stable temperature", r.rem_sleep_pct)
}

fn airway_matches(f: &TrendFlags) -> bool {
    f.spo2_low && f.resp_rate_high
}

fn airway_cause(r: &TrendReadings) -> String {
    format!("SpO₂={:.1}% + Resp Rate={:.1}/min", r.spo2, r.resp_rate)
}

/// Maps an athlete's history onto exactly one [`AlertCategory`]
#[derive(Debug, Clone, Default)]
pub struct AlertClassifier {
    detector: TrendDetector,
}

impl AlertClassifier {
    pub fn new(thresholds: TrendThresholds) -> Self {
        Self {
            detector: TrendDetector::new(thresholds),
        }
    }

    pub fn detector(&self) -> &TrendDetector {
        &self.detector
    }

    /// Classify the latest night of `history`.
    ///
    /// Never fails: faults become an [`AlertCategory::Error`] alert. The
    /// genotype does not influence the category.
    pub fn classify(&self, athlete_id: &str, history: &AthleteHistory, genotype: &GenotypeMap) -> Alert {
        let alert = match self.try_classify(history) {
            Ok(alert) => alert,
            Err(e) => {
                warn!(athlete = %athlete_id, error = %e, "Classification fault");
                Alert::new(
                    AlertCategory::Error,
                    format!("Error processing data: {}...", truncate_fault(&e.to_string())),
                )
            }
        };

        debug!(
            athlete = %athlete_id,
            observations = history.len(),
            genes = genotype.len(),
            category = %alert.category,
            "Classified recovery state"
        );
        alert
    }

    fn try_classify(&self, history: &AthleteHistory) -> Result<Alert, ClassificationError> {
        if history.is_empty() {
            return Ok(Alert::new(
                AlertCategory::NoData,
                "No recent biometric data available",
            ));
        }

        let snapshot = self.detector.detect(history)?;

        let alert = RULES
            .iter()
            .find(|rule| rule.matches(&snapshot.flags))
            .map(|rule| Alert::new(rule.category, rule.describe(&snapshot.readings)))
            .unwrap_or_else(|| {
                Alert::new(AlertCategory::Optimal, "All metrics within target ranges")
            });

        Ok(alert)
    }
}

fn truncate_fault(message: &str) -> String {
    message.chars().take(MAX_FAULT_CHARS).collect()
}
