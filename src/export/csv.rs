use super::ExportError;
use crate::summary::AthleteAssessment;
use std::path::Path;

const HEADER: [&str; 16] = [
    "athlete_id",
    "name",
    "sport",
    "team",
    "category",
    "priority",
    "title",
    "cause",
    "recommendation",
    "observations",
    "latest_date",
    "latest_hrv",
    "latest_sleep_h",
    "readiness_score",
    "readiness_band",
    "genetic_traits",
];

/// Export one row per athlete assessment
pub fn export_assessments<P: AsRef<Path>>(
    assessments: &[AthleteAssessment],
    output_path: P,
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(output_path)?;
    writer.write_record(HEADER)?;

    for a in assessments {
        let optional = |v: Option<f64>, precision: usize| {
            v.map_or(String::new(), |v| format!("{:.*}", precision, v))
        };
        let traits = a
            .annotations
            .iter()
            .map(|ann| ann.gene.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        writer.write_record([
            a.athlete_id.clone(),
            a.name.clone(),
            a.sport.clone(),
            a.team.clone(),
            a.alert.category.to_string(),
            a.priority.to_string(),
            a.alert.title.clone(),
            a.alert.cause.clone(),
            a.alert.recommendation.clone(),
            a.observations.to_string(),
            a.latest_date.map_or(String::new(), |d| d.format("%Y-%m-%d").to_string()),
            optional(a.latest_hrv, 1),
            optional(a.latest_sleep_h, 2),
            optional(a.readiness.as_ref().map(|r| r.overall_score), 0),
            a.readiness.as_ref().map_or(String::new(), |r| r.band.to_string()),
            traits,
        ])?;
    }

    writer.flush()?;
    Ok(())
}
