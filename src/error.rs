//! Error types for secpipe

use thiserror::Error;

/// Errors that can occur during a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Failed to parse CSV input: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Timestamp parse error: {0}")]
    TimestampParseError(String),

    #[error("Feature derivation error: {0}")]
    FeatureError(String),

    #[error("Upstream contract violated: {0}")]
    ContractViolation(String),

    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
