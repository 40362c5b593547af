use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{ImportError, Result};
use crate::import::validation::{
    non_blank, parse_age, parse_bound, parse_date, parse_metric_value, parse_time, BoundCell,
};
use crate::import::{DataFiles, DataVersion, DatasetSource, PredictiveRule, RecoveryDataset};
use crate::models::{AthleteHistory, AthleteProfile, GenotypeMap, Metric, MetricObservation};
use crate::zones::{BandRange, MetricThresholds, ThresholdConfig};

const SLEEP_ONSET: &str = "sleep_onset_time";
const WAKE_TIME: &str = "wake_time";

/// Loads a dataset from one CSV file per source inside a directory
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
    files: DataFiles,
    column_mapping: HashMap<String, String>,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_files(dir, DataFiles::default())
    }

    pub fn with_files(dir: impl Into<PathBuf>, files: DataFiles) -> Self {
        let mut column_mapping = HashMap::new();

        // Common header variations in exported spreadsheets
        Self::add_mapping(&mut column_mapping, "hrv_night", &["hrv", "hrv_ms", "rmssd", "night_hrv"]);
        Self::add_mapping(&mut column_mapping, "resting_hr", &["rhr", "resting_heart_rate", "resting_hr_bpm"]);
        Self::add_mapping(&mut column_mapping, "avg_hr_day", &["avg_hr", "average_hr", "day_hr"]);
        Self::add_mapping(&mut column_mapping, "spo2_night", &["spo2", "spo2_pct", "oxygen_saturation"]);
        Self::add_mapping(&mut column_mapping, "resp_rate_night", &["resp_rate", "respiratory_rate", "rr"]);
        Self::add_mapping(&mut column_mapping, "deep_sleep_pct", &["deep_sleep", "deep_pct"]);
        Self::add_mapping(&mut column_mapping, "rem_sleep_pct", &["rem_sleep", "rem_pct"]);
        Self::add_mapping(&mut column_mapping, "light_sleep_pct", &["light_sleep", "light_pct"]);
        Self::add_mapping(
            &mut column_mapping,
            "sleep_duration_h",
            &["sleep_duration", "sleep_hours", "total_sleep_h"],
        );
        Self::add_mapping(&mut column_mapping, "temp_trend_c", &["temp", "temperature", "skin_temp_c"]);
        Self::add_mapping(&mut column_mapping, "training_load_pct", &["training_load", "load_pct"]);
        Self::add_mapping(&mut column_mapping, SLEEP_ONSET, &["sleep_onset", "bedtime", "sleep_start"]);
        Self::add_mapping(&mut column_mapping, WAKE_TIME, &["wake", "wake_up_time", "sleep_end"]);

        Self {
            dir: dir.into(),
            files,
            column_mapping,
        }
    }

    fn add_mapping(mapping: &mut HashMap<String, String>, standard: &str, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard.to_string());
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn normalize_column_name(&self, name: &str) -> String {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");

        self.column_mapping
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }

    fn open(&self, file_name: &str) -> Result<(csv::Reader<File>, ColumnIndex)> {
        let path = self.dir.join(file_name);
        if !path.exists() {
            return Err(ImportError::FileNotFound { path }.into());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_path(&path)
            .map_err(ImportError::from)?;

        let headers = reader.headers().map_err(ImportError::from)?.clone();
        let index = ColumnIndex::new(file_name, &headers, |h| self.normalize_column_name(h));
        Ok((reader, index))
    }

    pub fn load_athletes(&self) -> Result<Vec<AthleteProfile>> {
        let file = &self.files.athletes;
        let (mut reader, columns) = self.open(file)?;
        columns.require(&["athlete_id", "name", "sport", "age", "team"])?;

        let mut athletes = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(ImportError::from)?;
            let line = row as u64 + 2;

            let required = (
                columns.text(&record, "athlete_id"),
                columns.text(&record, "name"),
                columns.text(&record, "sport"),
                columns.text(&record, "team"),
            );
            let (Some(athlete_id), Some(name), Some(sport), Some(team)) = required else {
                warn!(file = %file, line, "Dropping athlete row with blank required field");
                continue;
            };

            let Some(age) = columns.get(&record, "age").and_then(parse_age) else {
                warn!(file = %file, line, athlete = %athlete_id, "Dropping athlete row with invalid age");
                continue;
            };

            athletes.push(AthleteProfile {
                athlete_id: athlete_id.to_string(),
                name: name.to_string(),
                sport: sport.to_string(),
                age,
                team: team.to_string(),
                sex: columns.text(&record, "sex").map(str::to_string),
                baseline_start_date: columns.get(&record, "baseline_start_date").and_then(parse_date),
                notes: columns.text(&record, "notes").map(str::to_string),
            });
        }

        debug!(file = %file, count = athletes.len(), "Loaded athlete profiles");
        Ok(athletes)
    }

    pub fn load_genetics(&self) -> Result<HashMap<String, GenotypeMap>> {
        let file = &self.files.genetics;
        let (mut reader, columns) = self.open(file)?;
        columns.require(&["athlete_id", "gene", "genotype"])?;

        let mut genetics: HashMap<String, GenotypeMap> = HashMap::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(ImportError::from)?;

            match (
                columns.text(&record, "athlete_id"),
                columns.text(&record, "gene"),
                columns.text(&record, "genotype"),
            ) {
                (Some(athlete_id), Some(gene), Some(genotype)) => {
                    genetics
                        .entry(athlete_id.to_string())
                        .or_default()
                        .insert(gene, genotype);
                }
                _ => warn!(file = %file, line = row as u64 + 2, "Dropping incomplete genotype row"),
            }
        }

        debug!(file = %file, athletes = genetics.len(), "Loaded genetic profiles");
        Ok(genetics)
    }

    pub fn load_biometrics(&self) -> Result<HashMap<String, AthleteHistory>> {
        let file = &self.files.biometrics;
        let (mut reader, columns) = self.open(file)?;
        columns.require(&["athlete_id", "date"])?;

        let metric_columns: Vec<Metric> = Metric::ALL
            .iter()
            .copied()
            .filter(|m| columns.has(m.column()))
            .collect();

        let mut rows: BTreeMap<String, Vec<MetricObservation>> = BTreeMap::new();
        let mut dropped = 0usize;

        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(ImportError::from)?;
            let line = row as u64 + 2;

            let Some(athlete_id) = columns.text(&record, "athlete_id") else {
                warn!(file = %file, line, "Dropping biometric row without athlete id");
                dropped += 1;
                continue;
            };
            let Some(date) = columns.get(&record, "date").and_then(parse_date) else {
                warn!(file = %file, line, athlete = %athlete_id, "Dropping biometric row with unparseable date");
                dropped += 1;
                continue;
            };

            let mut observation = MetricObservation::new(date);
            for &metric in &metric_columns {
                if let Some(value) = columns.get(&record, metric.column()).and_then(parse_metric_value) {
                    observation.set(metric, value);
                }
            }
            observation.sleep_onset = columns.get(&record, SLEEP_ONSET).and_then(parse_time);
            observation.wake_time = columns.get(&record, WAKE_TIME).and_then(parse_time);

            rows.entry(athlete_id.to_string()).or_default().push(observation);
        }

        if dropped > 0 {
            warn!(file = %file, dropped, "Some biometric rows could not be used");
        }

        Ok(rows
            .into_iter()
            .map(|(athlete_id, observations)| {
                let history = AthleteHistory::new(athlete_id.clone(), observations);
                (athlete_id, history)
            })
            .collect())
    }

    pub fn load_thresholds(&self) -> Result<ThresholdConfig> {
        let file = &self.files.metrics_config;
        let (mut reader, columns) = self.open(file)?;
        columns.require(&["metric_name"])?;

        let mut config = ThresholdConfig::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(ImportError::from)?;
            let Some(metric_name) = columns.text(&record, "metric_name") else {
                warn!(file = %file, line = row as u64 + 2, "Dropping threshold row without metric name");
                continue;
            };

            let mut thresholds = MetricThresholds::new(metric_name);
            let invalid = &mut thresholds.invalid_cells;
            thresholds.critical = columns.band(&record, "red_low", "red_high", invalid);
            thresholds.critical_secondary = columns.band(&record, "red_low2", "red_high2", invalid);
            thresholds.caution = columns.band(&record, "yellow_low", "yellow_high", invalid);
            thresholds.caution_secondary = columns.band(&record, "yellow_low2", "yellow_high2", invalid);
            thresholds.optimal = columns.band(&record, "green_low", "green_high", invalid);
            thresholds.unit = columns.text(&record, "unit").map(str::to_string);

            if !thresholds.invalid_cells.is_empty() {
                warn!(
                    file = %file,
                    metric = %metric_name,
                    cells = ?thresholds.invalid_cells,
                    "Threshold row has unreadable cells"
                );
            }
            config.insert(thresholds);
        }

        debug!(file = %file, metrics = config.len(), "Loaded threshold table");
        Ok(config)
    }

    /// The rules file is optional; a missing file yields an empty matrix
    pub fn load_rules(&self) -> Result<Vec<PredictiveRule>> {
        let file = &self.files.predictive_rules;
        if !self.dir.join(file).exists() {
            debug!(file = %file, "No predictive rules file");
            return Ok(Vec::new());
        }

        let (mut reader, columns) = self.open(file)?;
        columns.require(&["rule_id", "metric_drop", "genetic_condition", "cause", "recommendation"])?;

        let mut rules = Vec::new();
        for result in reader.records() {
            let record = result.map_err(ImportError::from)?;
            let cell = |name: &str| columns.text(&record, name).unwrap_or_default().to_string();
            let rule_id = cell("rule_id");
            if rule_id.is_empty() {
                continue;
            }
            rules.push(PredictiveRule {
                rule_id,
                metric_drop: cell("metric_drop"),
                genetic_condition: cell("genetic_condition"),
                cause: cell("cause"),
                recommendation: cell("recommendation"),
            });
        }
        Ok(rules)
    }
}

impl DatasetSource for CsvDirectorySource {
    fn load(&self) -> Result<RecoveryDataset> {
        let dataset = RecoveryDataset {
            athletes: self.load_athletes()?,
            genetics: self.load_genetics()?,
            histories: self.load_biometrics()?,
            thresholds: self.load_thresholds()?,
            rules: self.load_rules()?,
        };

        let orphans = dataset.orphan_histories();
        if !orphans.is_empty() {
            warn!(athletes = ?orphans, "Biometric rows for athletes missing from the directory");
        }

        info!(
            dir = %self.dir.display(),
            athletes = dataset.athletes.len(),
            observations = dataset.observation_count(),
            metrics = dataset.thresholds.len(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    fn fingerprint(&self) -> Result<DataVersion> {
        DataVersion::from_files(&self.files.paths(&self.dir))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Header positions keyed by normalized column name
struct ColumnIndex {
    file: String,
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(file: &str, headers: &StringRecord, normalize: impl Fn(&str) -> String) -> Self {
        let mut positions = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            // First occurrence of a column wins
            positions.entry(normalize(header)).or_insert(i);
        }
        Self {
            file: file.to_string(),
            positions,
        }
    }

    fn has(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    fn require(&self, columns: &[&str]) -> Result<()> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !self.has(c))
            .map(|c| c.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumns {
                file: self.file.clone(),
                columns: missing,
            }
            .into())
        }
    }

    fn get<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.positions.get(column).and_then(|&i| record.get(i))
    }

    /// Non-blank cell contents
    fn text<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.get(record, column).and_then(non_blank)
    }

    /// Read a `[low, high]` pair, recording unreadable cells in `invalid`
    fn band(&self, record: &StringRecord, low: &str, high: &str, invalid: &mut Vec<String>) -> BandRange {
        let mut bound = |column: &str| match self.get(record, column).map(parse_bound) {
            Some(BoundCell::Value(v)) => Some(v),
            Some(BoundCell::Invalid) => {
                invalid.push(column.to_string());
                None
            }
            Some(BoundCell::Absent) | None => None,
        };
        let low = bound(low);
        let high = bound(high);
        BandRange::from_bounds(low, high)
    }
}
