use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RecoveryError;
use crate::import::DataFiles;
use crate::logging::LogConfig;
use crate::trends::TrendThresholds;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Where the dataset lives
    #[serde(default)]
    pub data: DataSettings,

    /// Classification thresholds
    #[serde(default)]
    pub engine: EngineSettings,

    /// Logging output
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Dataset location and file names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory holding the CSV sources
    pub data_dir: PathBuf,

    /// File names inside `data_dir`
    pub files: DataFiles,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            files: DataFiles::default(),
        }
    }
}

/// Alert engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub trends: TrendThresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            data: DataSettings::default(),
            engine: EngineSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML configuration: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".recoverrs")
            .join("config.toml")
    }

    /// Load the configuration at `path`, or the defaults when no file exists.
    ///
    /// A file that exists but cannot be read or parsed is an error rather than
    /// a silent fallback.
    pub fn load_or_default_from<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_file(path).map_err(|e| RecoveryError::Configuration(format!("{:#}", e)))
    }

    /// Load the configuration from the default path
    pub fn load_or_default() -> crate::Result<Self> {
        Self::load_or_default_from(Self::default_config_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.engine, deserialized.engine);
        assert_eq!(config.data, deserialized.data);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            [metadata]
            version = "1.0"
            created_at = "2025-04-01T00:00:00Z"
            updated_at = "2025-04-01T00:00:00Z"

            [data]
            data_dir = "/srv/recovery"

            [engine.trends]
            hrv_floor = 42.0
            late_onset = "23:00:00"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data.data_dir, PathBuf::from("/srv/recovery"));
        assert_eq!(config.data.files.biometrics, "biometric_daily.csv");
        assert_eq!(config.engine.trends.hrv_floor, 42.0);
        assert_eq!(config.engine.trends.rhr_ceiling, 70.0);
        assert_eq!(
            config.engine.trends.late_onset,
            NaiveTime::from_hms_opt(23, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original_config = AppConfig::default();
        original_config.data.data_dir = PathBuf::from("/tmp/team-data");
        original_config.engine.trends.spo2_low_pct = 93.0;

        original_config.save_to_file(&config_path).unwrap();
        let loaded_config = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded_config.data.data_dir, PathBuf::from("/tmp/team-data"));
        assert_eq!(loaded_config.engine.trends.spo2_low_pct, 93.0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        assert!(AppConfig::load_from_file(temp_dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_absent_config_falls_back_to_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = AppConfig::load_or_default_from(temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config.engine, EngineSettings::default());
        assert_eq!(config.data, DataSettings::default());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[metadata]\nversion = \"1.0\"\ncreated_at = \"2025-04-01T00:00:00Z\"\nupdated_at = \"2025-04-01T00:00:00Z\"\n\n[engine.trends]\nhrv_floor = \"forty\"\n",
        )
        .unwrap();

        match AppConfig::load_or_default_from(&config_path) {
            Err(err @ RecoveryError::Configuration(_)) => {
                let message = err.user_message();
                assert!(message.starts_with("Invalid configuration: Failed to parse TOML configuration"));
                assert!(message.contains("config.toml"));
                assert!(message.contains("hrv_floor"));
            }
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }
}
