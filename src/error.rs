//! Unified error hierarchy for stridelog
//!
//! Mirrors the propagation policy of the engine: file-level parse failures
//! abort only the offending file, row-level validation failures abort only
//! the offending record and are collected as warnings, and collaborator
//! failures degrade a single feature instead of the whole pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all stridelog operations
#[derive(Debug, Error)]
pub enum StrideError {
    /// Malformed input file; aborts that file only
    #[error("Parse error in {file}: {reason}")]
    Parse { file: PathBuf, reason: String },

    /// Recognized-but-invalid field in a single record
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Missing or invalid athlete setting; aborts the dependent calculation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No data at all to compute over
    #[error("No training data: {0}")]
    DataGap(String),

    /// External collaborator unreachable or failed
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Persistence failures
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Row-level validation errors, surfaced individually so the remaining
/// records of a file can still be processed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Intensity code not present in the athlete's factor mapping
    #[error("Unknown intensity code '{code}' in row {row}")]
    UnknownIntensityCode { code: String, row: usize },

    /// Plan segment token that does not match `<number>[mi|min]<CODE>`
    #[error("Malformed plan segment '{token}' in row {row}")]
    MalformedSegment { token: String, row: usize },

    /// Field present but out of the accepted domain
    #[error("Invalid value for {field} in row {row}: {reason}")]
    InvalidField {
        field: String,
        row: usize,
        reason: String,
    },
}

/// External collaborator errors (AI commentary, weather forecast)
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Quota exhausted")]
    Quota,

    #[error("Malformed service response: {0}")]
    BadResponse(String),
}

impl ServiceError {
    /// Transient failures are retried at most once before the caller
    /// receives a degraded result.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Timeout { .. } | ServiceError::Transport(_) => true,
            ServiceError::Http { status } => *status >= 500,
            ServiceError::Quota | ServiceError::BadResponse(_) => false,
        }
    }
}

/// Keyed-store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Non-fatal report for a record rejected during bulk ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    /// Source file the record came from
    pub file: PathBuf,

    /// One-based row number, when the source is tabular
    pub row: Option<usize>,

    /// Human-readable reason the record was skipped
    pub reason: String,
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.row {
            Some(row) => write!(f, "{} row {}: {}", self.file.display(), row, self.reason),
            None => write!(f, "{}: {}", self.file.display(), self.reason),
        }
    }
}

/// Result type alias for stridelog operations
pub type Result<T> = std::result::Result<T, StrideError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::Timeout { seconds: 10 }.is_transient());
        assert!(ServiceError::Transport("reset".to_string()).is_transient());
        assert!(ServiceError::Http { status: 503 }.is_transient());
        assert!(!ServiceError::Http { status: 401 }.is_transient());
        assert!(!ServiceError::Quota.is_transient());
    }

    #[test]
    fn test_validation_error_names_code_and_row() {
        let err = ValidationError::UnknownIntensityCode {
            code: "X".to_string(),
            row: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("'X'"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn test_import_warning_display() {
        let warning = ImportWarning {
            file: PathBuf::from("history.csv"),
            row: Some(4),
            reason: "missing distance".to_string(),
        };
        assert_eq!(warning.to_string(), "history.csv row 4: missing distance");
    }
}
