use super::ExportError;
use std::io::Write;
use std::path::Path;

/// Export any serializable data structure to JSON
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<(), ExportError>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let json_data = serde_json::to_string_pretty(data)
        .map_err(|e| ExportError::SerializationError(e.to_string()))?;

    let mut file = std::fs::File::create(output_path)?;
    file.write_all(json_data.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::TeamReport;
    use crate::models::{Alert, AlertCategory};
    use crate::summary::AthleteAssessment;
    use tempfile::NamedTempFile;

    #[test]
    fn test_export_team_report() {
        let alert = Alert::new(AlertCategory::NoData, "No recent biometric data available");
        let report = TeamReport::new(vec![AthleteAssessment {
            athlete_id: "A7".to_string(),
            name: "Jo".to_string(),
            sport: "Rowing".to_string(),
            team: "Varsity".to_string(),
            priority: alert.priority(),
            alert,
            observations: 0,
            latest_date: None,
            latest_hrv: None,
            latest_sleep_h: None,
            metrics: Vec::new(),
            annotations: Vec::new(),
            readiness: None,
        }]);

        let temp_file = NamedTempFile::new().unwrap();
        export_json(&report, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("\"athlete_id\": \"A7\""));
        assert!(content.contains("\"category\": \"no-data\""));
        assert!(content.contains("\"priority\": \"Unknown\""));

        let parsed: TeamReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.athletes[0].alert, report.athletes[0].alert);
        assert_eq!(parsed.summary.athletes_with_data, 0);
    }
}
