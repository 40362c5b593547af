//! Unified error hierarchy for RecoverRS
//!
//! The classification engine itself never surfaces these errors to callers;
//! it degrades them into `error` alerts or zone statuses. The hierarchy is used
//! by the loaders, the configuration layer and the CLI.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::Metric;

/// Top-level error type for all RecoverRS operations
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Dataset loading errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Faults raised while evaluating a history
    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    /// Configuration file present but unreadable or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the dataset loaders
#[derive(Debug, Error)]
pub enum ImportError {
    /// Source file not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Required columns absent from a source file
    #[error("Missing columns in {file}: {columns:?}")]
    MissingColumns { file: String, columns: Vec<String> },

    /// Underlying CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Faults inside trend detection or alert classification
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationError {
    /// A reading is present but not a finite number
    #[error("non-finite value {value} for {metric}")]
    NonFiniteMetric { metric: Metric, value: f64 },

    /// A history was expected to contain at least one observation
    #[error("history for {athlete_id} is empty")]
    EmptyHistory { athlete_id: String },
}

/// Result type alias for RecoverRS operations
pub type Result<T> = std::result::Result<T, RecoveryError>;

impl RecoveryError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RecoveryError::Import(ImportError::Csv(_)) => ErrorSeverity::Critical,
            RecoveryError::Import(_) => ErrorSeverity::Error,
            RecoveryError::Classification(_) => ErrorSeverity::Warning,
            RecoveryError::Configuration(_) => ErrorSeverity::Error,
            RecoveryError::Io(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RecoveryError::Import(ImportError::FileNotFound { path }) => {
                format!(
                    "Could not find data file: {}. Expected athlete_profiles, genetic_profiles, biometric_daily and metrics_config CSV files.",
                    path.display()
                )
            }
            RecoveryError::Import(ImportError::MissingColumns { file, columns }) => {
                format!("{} is missing required columns: {}", file, columns.join(", "))
            }
            RecoveryError::Configuration(reason) => {
                format!("Invalid configuration: {}. Fix the file or remove it to use the defaults.", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The data could not be read at all
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
