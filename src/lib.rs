//! secpipe - Batch pipeline for security event logs
//!
//! secpipe transforms raw security event records into an enriched,
//! analytics-ready table through a deterministic pipeline: cleaning →
//! normalization → feature derivation (severity scoring, per-user activity
//! aggregates, inactivity-gap sessionization).
//!
//! ## Modules
//!
//! - **cleaning / normalizer**: missing-value handling, duplicate removal,
//!   timestamp and categorical standardization
//! - **features**: the derivation core - severity scores, user frequency and
//!   daily-rate aggregates, session segmentation and aggregation
//! - **pipeline**: orchestration of a full run over an in-memory batch
//! - **io**: CSV and NDJSON adapters (string-based; no file access)

pub mod cleaning;
pub mod error;
pub mod features;
pub mod io;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod types;

pub use error::PipelineError;
pub use features::{enrich, FeatureConfig, DEFAULT_GAP_MINUTES};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineRun, RunSummary};
pub use schema::{RawBatch, RawRecord, SchemaIssue, ValidateMode, REQUIRED_COLUMNS};
pub use types::{
    Column, ColumnSet, EnrichedEvent, EnrichedTable, EventRecord, EventTable, Severity, Status,
};

/// secpipe version embedded in CLI output
pub const SECPIPE_VERSION: &str = env!("CARGO_PKG_VERSION");
