//! Error types for rusty-dfm

use std::path::PathBuf;
use thiserror::Error;

use crate::transform::tcode::ALLOWED_TCODES;

/// A transform code that failed validation, optionally tied to a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCode {
    pub series: Option<String>,
    pub code: i64,
}

impl std::fmt::Display for InvalidCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.series {
            Some(series) => write!(f, "{}={}", series, self.code),
            None => write!(f, "{}", self.code),
        }
    }
}

fn join_codes(entries: &[InvalidCode]) -> String {
    entries
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Main error type for rusty-dfm
#[derive(Error, Debug)]
pub enum DfmError {
    #[error("No transform code provided for series: {}", .series.join(", "))]
    MissingTransformCode { series: Vec<String> },

    #[error("Invalid transform code(s) [{}]; allowed codes are {:?}", join_codes(.entries), ALLOWED_TCODES)]
    InvalidTransformCode { entries: Vec<InvalidCode> },

    #[error("Empty panel: {stage} requires at least one timestamp")]
    EmptyPanel { stage: &'static str },

    #[error("Non-monotonic or invalid timestamp index: {0}")]
    NonMonotonicOrInvalidIndex(String),

    #[error("Duplicate series name: {0}")]
    DuplicateSeries(String),

    #[error("Length mismatch for series '{series}': expected {expected} values, got {actual}")]
    LengthMismatch {
        series: String,
        expected: usize,
        actual: usize,
    },

    #[error("Series not found: {0}")]
    SeriesNotFound(String),

    #[error("Invalid parameter '{name}': {value} (expected {expected})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Artifact already exists: {0} (set overwrite to replace)")]
    ArtifactExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
}

impl DfmError {
    /// Build an `InvalidTransformCode` for a bare code with no series attached
    pub fn invalid_code(code: i64) -> Self {
        DfmError::InvalidTransformCode {
            entries: vec![InvalidCode { series: None, code }],
        }
    }
}

/// Result type alias for rusty-dfm operations
pub type Result<T> = std::result::Result<T, DfmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_code_lists_every_series() {
        let err = DfmError::MissingTransformCode {
            series: vec!["RPI".to_string(), "INDPRO".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("RPI"));
        assert!(msg.contains("INDPRO"));
    }

    #[test]
    fn test_invalid_code_names_allowed_set() {
        let msg = DfmError::invalid_code(9).to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains("[1, 2, 3, 4, 5, 6, 7]"));
    }
}
