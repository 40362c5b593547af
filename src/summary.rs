//! Per-athlete assessments and the team dashboard summary

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::info;

use crate::alerts::AlertClassifier;
use crate::genetics::{GeneticAnnotation, GeneticAnnotator};
use crate::import::RecoveryDataset;
use crate::models::{Alert, AlertCategory, AlertPriority, AthleteHistory, AthleteProfile, GenotypeMap, Metric};
use crate::readiness::{self, ReadinessForecast};
use crate::zones::{MetricReading, ZoneClassifier};

/// Everything known about one athlete's latest night
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteAssessment {
    pub athlete_id: String,
    pub name: String,
    pub sport: String,
    pub team: String,
    pub alert: Alert,
    pub priority: AlertPriority,
    pub observations: usize,
    pub latest_date: Option<NaiveDate>,
    pub latest_hrv: Option<f64>,
    pub latest_sleep_h: Option<f64>,
    pub metrics: Vec<MetricReading>,
    pub annotations: Vec<GeneticAnnotation>,
    pub readiness: Option<ReadinessForecast>,
}

impl AthleteAssessment {
    pub fn has_data(&self) -> bool {
        self.observations > 0
    }
}

/// Assess one directory entry against the dataset
pub fn assess_athlete(
    classifier: &AlertClassifier,
    profile: &AthleteProfile,
    dataset: &RecoveryDataset,
) -> AthleteAssessment {
    let empty_history = AthleteHistory::empty(profile.athlete_id.as_str());
    let empty_genotype = GenotypeMap::new();
    let history = dataset.history(&profile.athlete_id).unwrap_or(&empty_history);
    let genotype = dataset.genotype(&profile.athlete_id).unwrap_or(&empty_genotype);

    let alert = classifier.classify(&profile.athlete_id, history, genotype);
    let latest = history.latest();

    AthleteAssessment {
        athlete_id: profile.athlete_id.clone(),
        name: profile.name.clone(),
        sport: profile.sport.clone(),
        team: profile.team.clone(),
        priority: alert.priority(),
        alert,
        observations: history.len(),
        latest_date: latest.map(|obs| obs.date),
        latest_hrv: latest.and_then(|obs| obs.get(Metric::HrvNight)),
        latest_sleep_h: latest.and_then(|obs| obs.get(Metric::SleepDurationH)),
        metrics: latest
            .map(|obs| ZoneClassifier::snapshot(obs, &dataset.thresholds))
            .unwrap_or_default(),
        annotations: GeneticAnnotator::annotate(genotype),
        readiness: readiness::forecast(history),
    }
}

/// Assess every athlete in the directory, in parallel.
///
/// Output order follows the directory order regardless of scheduling.
pub fn assess_team(classifier: &AlertClassifier, dataset: &RecoveryDataset) -> Vec<AthleteAssessment> {
    let assessments: Vec<AthleteAssessment> = dataset
        .athletes
        .par_iter()
        .map(|profile| assess_athlete(classifier, profile, dataset))
        .collect();

    info!(athletes = assessments.len(), "Team assessment complete");
    assessments
}

/// Dashboard-level aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub total_athletes: usize,
    pub athletes_with_data: usize,
    pub counts: BTreeMap<AlertCategory, usize>,
    pub high_priority: usize,
    pub monitor: usize,
    pub optimal: usize,
    /// Share of athletes with data whose alert is `optimal`
    pub readiness_pct: Option<f64>,
    pub avg_hrv: Option<f64>,
    pub avg_sleep_h: Option<f64>,
}

impl TeamSummary {
    pub fn from_assessments(assessments: &[AthleteAssessment]) -> Self {
        let mut counts: BTreeMap<AlertCategory, usize> =
            AlertCategory::ALL.iter().map(|&c| (c, 0)).collect();
        for assessment in assessments {
            *counts.entry(assessment.alert.category).or_insert(0) += 1;
        }

        let count = |category: AlertCategory| counts.get(&category).copied().unwrap_or(0);
        let high_priority = count(AlertCategory::Inflammation) + count(AlertCategory::Airway);
        let monitor = count(AlertCategory::Circadian) + count(AlertCategory::Nutrition);
        let optimal = count(AlertCategory::Optimal);

        let athletes_with_data = assessments.iter().filter(|a| a.has_data()).count();
        let readiness_pct = if athletes_with_data == 0 {
            None
        } else {
            Some(optimal as f64 / athletes_with_data as f64 * 100.0)
        };

        Self {
            total_athletes: assessments.len(),
            athletes_with_data,
            high_priority,
            monitor,
            optimal,
            readiness_pct,
            avg_hrv: finite_mean(assessments.iter().filter_map(|a| a.latest_hrv)),
            avg_sleep_h: finite_mean(assessments.iter().filter_map(|a| a.latest_sleep_h)),
            counts,
        }
    }

    pub fn count(&self, category: AlertCategory) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }
}

fn finite_mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let values: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}
