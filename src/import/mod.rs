//! Dataset loading
//!
//! The engine never reads files itself; a [`DatasetSource`] hands it a
//! validated [`RecoveryDataset`] with time-ordered histories per athlete.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{AthleteHistory, AthleteProfile, GenotypeMap};
use crate::zones::ThresholdConfig;

pub mod cache;
pub mod csv;
pub mod validation;

pub use cache::{DataVersion, DatasetCache};
pub use self::csv::CsvDirectorySource;

/// Anything that can produce a complete dataset
pub trait DatasetSource: Send + Sync {
    /// Load and validate every source
    fn load(&self) -> Result<RecoveryDataset>;

    /// Content fingerprint; changes whenever the underlying data changes
    fn fingerprint(&self) -> Result<DataVersion>;

    /// Human-readable location for logs and messages
    fn describe(&self) -> String;
}

/// File names inside a dataset directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataFiles {
    pub athletes: String,
    pub genetics: String,
    pub biometrics: String,
    pub metrics_config: String,
    /// Optional reference decision matrix
    pub predictive_rules: String,
}

impl Default for DataFiles {
    fn default() -> Self {
        Self {
            athletes: "athlete_profiles.csv".to_string(),
            genetics: "genetic_profiles.csv".to_string(),
            biometrics: "biometric_daily.csv".to_string(),
            metrics_config: "metrics_config.csv".to_string(),
            predictive_rules: "predictive_rules.csv".to_string(),
        }
    }
}

impl DataFiles {
    /// All source paths under `dir`, required files first
    pub fn paths(&self, dir: &Path) -> Vec<PathBuf> {
        [
            &self.athletes,
            &self.genetics,
            &self.biometrics,
            &self.metrics_config,
            &self.predictive_rules,
        ]
        .iter()
        .map(|name| dir.join(name))
        .collect()
    }
}

/// One row of the reference decision matrix shown next to an athlete's alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictiveRule {
    pub rule_id: String,
    pub metric_drop: String,
    pub genetic_condition: String,
    pub cause: String,
    pub recommendation: String,
}

/// Everything the engine needs, loaded once and shared read-only
#[derive(Debug, Clone, Default)]
pub struct RecoveryDataset {
    pub athletes: Vec<AthleteProfile>,
    pub genetics: HashMap<String, GenotypeMap>,
    pub histories: HashMap<String, AthleteHistory>,
    pub thresholds: ThresholdConfig,
    pub rules: Vec<PredictiveRule>,
}

impl RecoveryDataset {
    pub fn athlete(&self, athlete_id: &str) -> Option<&AthleteProfile> {
        self.athletes.iter().find(|a| a.athlete_id == athlete_id)
    }

    pub fn history(&self, athlete_id: &str) -> Option<&AthleteHistory> {
        self.histories.get(athlete_id)
    }

    pub fn genotype(&self, athlete_id: &str) -> Option<&GenotypeMap> {
        self.genetics.get(athlete_id)
    }

    /// Total observations across all athletes
    pub fn observation_count(&self) -> usize {
        self.histories.values().map(AthleteHistory::len).sum()
    }

    /// Athlete ids with biometric rows but no directory entry
    pub fn orphan_histories(&self) -> Vec<&str> {
        let mut orphans: Vec<&str> = self
            .histories
            .keys()
            .filter(|id| self.athlete(id).is_none())
            .map(String::as_str)
            .collect();
        orphans.sort_unstable();
        orphans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricObservation;
    use chrono::NaiveDate;

    fn profile(id: &str) -> AthleteProfile {
        AthleteProfile {
            athlete_id: id.to_string(),
            name: format!("Athlete {}", id),
            sport: "Rowing".to_string(),
            age: 24,
            team: "Varsity".to_string(),
            sex: None,
            baseline_start_date: None,
            notes: None,
        }
    }

    #[test]
    fn test_default_file_names() {
        let paths = DataFiles::default().paths(Path::new("/data"));
        assert_eq!(paths.len(), 5);
        assert_eq!(paths[0], PathBuf::from("/data/athlete_profiles.csv"));
        assert_eq!(paths[4], PathBuf::from("/data/predictive_rules.csv"));
    }

    #[test]
    fn test_dataset_lookups() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let mut dataset = RecoveryDataset {
            athletes: vec![profile("A1")],
            ..RecoveryDataset::default()
        };
        dataset.histories.insert(
            "A1".to_string(),
            AthleteHistory::new("A1", vec![MetricObservation::new(date)]),
        );
        dataset.histories.insert(
            "Z9".to_string(),
            AthleteHistory::new("Z9", vec![MetricObservation::new(date)]),
        );

        assert!(dataset.athlete("A1").is_some());
        assert!(dataset.genotype("A1").is_none());
        assert_eq!(dataset.observation_count(), 2);
        assert_eq!(dataset.orphan_histories(), vec!["Z9"]);
    }
}
