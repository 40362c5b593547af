use super::{ExportError, TeamReport};
use crate::import::PredictiveRule;
use crate::models::AlertCategory;
use crate::summary::{AthleteAssessment, TeamSummary};
use crate::zones::MetricReading;
use std::io::Write;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct AthleteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Sport")]
    sport: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "HRV (ms)")]
    hrv: String,
    #[tabled(rename = "Sleep (h)")]
    sleep: String,
    #[tabled(rename = "Readiness")]
    readiness: String,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Zone")]
    zone: String,
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Pattern")]
    metric_drop: String,
    #[tabled(rename = "Genetic Factors")]
    genetic_condition: String,
    #[tabled(rename = "Cause")]
    cause: String,
    #[tabled(rename = "Intervention")]
    recommendation: String,
}

fn or_dash(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.*}", precision, v))
}

/// One row per athlete
pub fn assessment_table(assessments: &[AthleteAssessment]) -> String {
    let rows = assessments.iter().map(|a| AthleteRow {
        id: a.athlete_id.clone(),
        name: a.name.clone(),
        sport: a.sport.clone(),
        status: a.alert.title.clone(),
        priority: a.priority.to_string(),
        hrv: or_dash(a.latest_hrv, 0),
        sleep: or_dash(a.latest_sleep_h, 1),
        readiness: a
            .readiness
            .as_ref()
            .map_or_else(|| "-".to_string(), |r| format!("{:.0}% {}", r.overall_score, r.band)),
    });

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Latest readings with unit and zone
pub fn metric_table(readings: &[MetricReading]) -> String {
    let rows = readings.iter().map(|r| MetricRow {
        metric: r.metric.label().to_string(),
        value: r
            .value
            .map_or_else(|| "-".to_string(), |v| format!("{:.1} {}", v, r.metric.unit())),
        zone: r.status.to_string(),
    });

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Reference decision matrix
pub fn rules_table(rules: &[PredictiveRule]) -> String {
    let rows = rules.iter().map(|r| RuleRow {
        metric_drop: r.metric_drop.clone(),
        genetic_condition: r.genetic_condition.clone(),
        cause: r.cause.clone(),
        recommendation: r.recommendation.clone(),
    });

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Dashboard headline lines, without colour
pub fn summary_lines(summary: &TeamSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Total Athletes: {}", summary.total_athletes),
        format!("Athletes With Data: {}", summary.athletes_with_data),
        format!("Avg HRV: {}", or_dash(summary.avg_hrv, 0) + " ms"),
        format!("Avg Sleep: {}", or_dash(summary.avg_sleep_h, 1) + "h"),
        format!("Team Readiness: {}", or_dash(summary.readiness_pct, 0) + "%"),
        format!(
            "High Priority: {}  Monitor: {}  Optimal: {}",
            summary.high_priority, summary.monitor, summary.optimal
        ),
    ];

    let unknown = summary.count(AlertCategory::NoData) + summary.count(AlertCategory::Error);
    if unknown > 0 {
        lines.push(format!("Unknown (no data or errors): {}", unknown));
    }
    lines
}

/// Export a team report to human-readable text format
pub fn export_team_report<P: AsRef<Path>>(report: &TeamReport, output_path: P) -> Result<(), ExportError> {
    let mut file = std::fs::File::create(output_path)?;

    writeln!(file, "{:=<60}", "")?;
    writeln!(file, "TEAM RECOVERY REPORT")?;
    writeln!(file, "{:=<60}", "")?;
    writeln!(file, "Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(file)?;

    writeln!(file, "TEAM SUMMARY")?;
    writeln!(file, "{:-<60}", "")?;
    for line in summary_lines(&report.summary) {
        writeln!(file, "{}", line)?;
    }
    writeln!(file)?;

    writeln!(file, "{}", assessment_table(&report.athletes))?;
    writeln!(file)?;

    writeln!(file, "ALERTS")?;
    writeln!(file, "{:-<60}", "")?;
    for a in &report.athletes {
        writeln!(file, "{} ({}): {}", a.name, a.athlete_id, a.alert.title)?;
        writeln!(file, "  Cause: {}", a.alert.cause)?;
        writeln!(file, "  Action: {}", a.alert.recommendation)?;
        for annotation in &a.annotations {
            writeln!(file, "  {}: {}", annotation.gene, annotation.trait_name)?;
        }
    }

    if !report.rules.is_empty() {
        writeln!(file)?;
        writeln!(file, "RULES REFERENCE")?;
        writeln!(file, "{}", rules_table(&report.rules))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Alert, Metric};
    use crate::zones::ZoneStatus;
    use tempfile::NamedTempFile;

    fn assessment(id: &str, category: AlertCategory, hrv: Option<f64>) -> AthleteAssessment {
        let alert = Alert::new(category, "All metrics within target ranges");
        AthleteAssessment {
            athlete_id: id.to_string(),
            name: format!("Athlete {}", id),
            sport: "Soccer".to_string(),
            team: "First".to_string(),
            priority: alert.priority(),
            alert,
            observations: usize::from(hrv.is_some()),
            latest_date: None,
            latest_hrv: hrv,
            latest_sleep_h: None,
            metrics: Vec::new(),
            annotations: Vec::new(),
            readiness: None,
        }
    }

    #[test]
    fn test_assessment_table() {
        let table = assessment_table(&[assessment("A1", AlertCategory::Optimal, Some(62.4))]);
        assert!(table.contains("Athlete A1"));
        assert!(table.contains("Optimal Recovery State"));
        assert!(table.contains("62"));
    }

    #[test]
    fn test_metric_table() {
        let table = metric_table(&[
            MetricReading {
                metric: Metric::Spo2Night,
                value: Some(93.0),
                status: ZoneStatus::Critical,
            },
            MetricReading {
                metric: Metric::HrvNight,
                value: None,
                status: ZoneStatus::NoData,
            },
        ]);
        assert!(table.contains("93.0 %"));
        assert!(table.contains("Critical"));
        assert!(table.contains("No Data"));
    }

    #[test]
    fn test_summary_lines_flag_unknowns() {
        let report = TeamReport::new(vec![
            assessment("A1", AlertCategory::Optimal, Some(60.0)),
            assessment("A2", AlertCategory::NoData, None),
        ]);
        let lines = summary_lines(&report.summary);
        assert!(lines.contains(&"Team Readiness: 100%".to_string()));
        assert!(lines.contains(&"Unknown (no data or errors): 1".to_string()));
    }

    #[test]
    fn test_export_team_report() {
        let report = TeamReport::new(vec![assessment("A1", AlertCategory::Optimal, Some(60.0))]);
        let temp_file = NamedTempFile::new().unwrap();
        export_team_report(&report, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("TEAM RECOVERY REPORT"));
        assert!(content.contains("Total Athletes: 1"));
        assert!(content.contains("Cause: All metrics within target ranges"));
        assert!(!content.contains("RULES REFERENCE"));
    }
}
