// Library interface for RecoverRS modules
// This allows integration tests and benchmarks to access the engine

pub mod alerts;
pub mod config;
pub mod error;
pub mod export;
pub mod genetics;
pub mod import;
pub mod logging;
pub mod models;
pub mod readiness;
pub mod summary;
pub mod trends;
pub mod zones;

// Re-export commonly used types for convenience
pub use models::*;
pub use alerts::{AlertClassifier, AlertRule};
pub use trends::{TrendDetector, TrendFlags, TrendThresholds};
pub use zones::{normalize_metric_name, ThresholdConfig, ZoneClassifier, ZoneStatus};
pub use genetics::{GeneticAnnotation, GeneticAnnotator};
pub use import::{CsvDirectorySource, DatasetCache, DatasetSource, RecoveryDataset};
pub use summary::{assess_athlete, assess_team, AthleteAssessment, TeamSummary};
pub use config::AppConfig;
pub use error::{RecoveryError, Result};
pub use logging::{LogConfig, LogLevel, LogFormat};
