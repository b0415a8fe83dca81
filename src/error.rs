//! Error types for breathsync

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while aligning and post-processing sensor streams
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("Malformed timestamp {value:?}: {reason}")]
    Format { value: String, reason: String },

    #[error("Input file missing or unreadable: {path}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required column {column:?} in {stream} stream")]
    MissingColumn { stream: String, column: String },

    #[error("Non-numeric value {value:?} in column {column:?} (row {row})")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Channel {0:?} has zero range and cannot be normalized")]
    DegenerateChannel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl AlignError {
    pub(crate) fn format(value: &str, reason: impl Into<String>) -> Self {
        AlignError::Format {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
