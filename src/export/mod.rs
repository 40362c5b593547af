use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::import::PredictiveRule;
use crate::summary::{AthleteAssessment, TeamSummary};

pub mod csv;
pub mod json;
pub mod text;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Json,
    Text,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] ::csv::Error),
}

/// Snapshot of a team assessment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamReport {
    pub generated_at: DateTime<Utc>,
    pub summary: TeamSummary,
    pub athletes: Vec<AthleteAssessment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<PredictiveRule>,
}

impl TeamReport {
    pub fn new(athletes: Vec<AthleteAssessment>) -> Self {
        Self {
            generated_at: Utc::now(),
            summary: TeamSummary::from_assessments(&athletes),
            athletes,
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<PredictiveRule>) -> Self {
        self.rules = rules;
        self
    }
}

/// Write `report` to `output_path` in the requested format
pub fn export_report<P: AsRef<Path>>(
    report: &TeamReport,
    format: ExportFormat,
    output_path: P,
) -> Result<(), ExportError> {
    let output_path = output_path.as_ref();
    match format {
        ExportFormat::Json => json::export_json(report, output_path)?,
        ExportFormat::Csv => csv::export_assessments(&report.athletes, output_path)?,
        ExportFormat::Text => text::export_team_report(report, output_path)?,
    }

    info!(
        path = %output_path.display(),
        format = ?format,
        athletes = report.athletes.len(),
        "Exported team report"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_empty_report() {
        let report = TeamReport::new(Vec::new());
        assert_eq!(report.summary.total_athletes, 0);
        assert!(report.rules.is_empty());
    }
}
