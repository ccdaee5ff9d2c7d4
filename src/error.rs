use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for labelcraft operations.
#[derive(Debug, Error)]
pub enum LabelcraftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse labeling configuration: {message}")]
    ConfigParse { message: String },

    #[error("Failed to parse task data from {path}: {source}")]
    TaskJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse results from {path}: {source}")]
    ResultsJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write results to {path}: {source}")]
    ResultsJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse settings from {path}: {message}")]
    SettingsParse { path: PathBuf, message: String },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Invalid result payload: {message}")]
    Deserialization { message: String },

    #[error("Failed to serialize results: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown element '{name}'")]
    UnknownElement { name: String },

    #[error("Element '{name}' is not {expected}")]
    ElementKindMismatch {
        name: String,
        expected: &'static str,
    },

    #[error("Unknown area '{id}'")]
    UnknownArea { id: String },

    #[error("Unknown annotation '{id}'")]
    UnknownAnnotation { id: String },

    #[error("Draft submission failed: {message}")]
    DraftSubmit { message: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
