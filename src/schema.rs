//! Input schema definition and validation
//!
//! Defines the raw record shape as it arrives from CSV, the required column
//! set, and the lightweight post-run schema validation that reports (rather
//! than repairs) out-of-domain values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::PipelineError;
use crate::types::{Column, ColumnSet, EnrichedTable};

/// Columns every input batch must carry
pub const REQUIRED_COLUMNS: [Column; 7] = [
    Column::EventId,
    Column::Timestamp,
    Column::UserId,
    Column::EventType,
    Column::Status,
    Column::Severity,
    Column::SourceIp,
];

/// Severity labels considered in-domain after normalization
pub const ALLOWED_SEVERITIES: [&str; 6] = ["info", "low", "medium", "high", "critical", "unknown"];

/// Status labels considered in-domain after normalization
pub const ALLOWED_STATUSES: [&str; 3] = ["success", "failure", "unknown"];

/// One row exactly as read from the input, before any cleaning.
///
/// Every field is optional: a `None` means the cell was empty or the column
/// was absent entirely (the [`ColumnSet`] on the batch distinguishes the two).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
}

/// A parsed input batch: the observed column set plus the raw rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBatch {
    pub columns: ColumnSet,
    pub records: Vec<RawRecord>,
}

impl RawBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Ensure the batch carries all required columns.
///
/// Missing columns are a hard error before any processing; the optional-column
/// no-op policy applies only inside the feature stages, never at intake.
pub fn validate_required_columns(columns: &ColumnSet) -> Result<(), PipelineError> {
    let missing = columns.missing_of(&REQUIRED_COLUMNS);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns(missing))
    }
}

/// How schema-validation findings are handled at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidateMode {
    /// Skip validation entirely
    Off,
    /// Report findings but keep the output
    #[default]
    Warn,
    /// Fail the run on any finding
    Strict,
}

/// A single schema-validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum SchemaIssue {
    /// Rows whose timestamp is absent despite the column being present
    MissingTimestamps { count: usize },
    /// Status values outside the allowed set
    InvalidStatusValues { values: Vec<String> },
    /// Severity values outside the allowed set
    InvalidSeverityValues { values: Vec<String> },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::MissingTimestamps { count } => {
                write!(f, "{count} rows have no timestamp")
            }
            SchemaIssue::InvalidStatusValues { values } => {
                write!(f, "status values outside allowed set: {values:?}")
            }
            SchemaIssue::InvalidSeverityValues { values } => {
                write!(f, "severity values outside allowed set: {values:?}")
            }
        }
    }
}

/// Validate the enriched table after the run.
///
/// Checks:
/// - no missing timestamps (the normalizer should have dropped them)
/// - status restricted to {success, failure, unknown}
/// - severity restricted to {info, low, medium, high, critical, unknown}
pub fn validate_schema(table: &EnrichedTable) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();

    if table.columns.contains(Column::Timestamp) {
        let missing = table
            .rows
            .iter()
            .filter(|r| r.record.timestamp.is_none())
            .count();
        if missing > 0 {
            issues.push(SchemaIssue::MissingTimestamps { count: missing });
        }
    }

    if table.columns.contains(Column::Status) {
        let invalid: BTreeSet<String> = table
            .rows
            .iter()
            .filter(|r| !r.record.status.is_in_domain())
            .map(|r| r.record.status.as_str().to_string())
            .collect();
        if !invalid.is_empty() {
            issues.push(SchemaIssue::InvalidStatusValues {
                values: invalid.into_iter().collect(),
            });
        }
    }

    if table.columns.contains(Column::Severity) {
        let invalid: BTreeSet<String> = table
            .rows
            .iter()
            .filter(|r| !r.record.severity.is_in_domain())
            .map(|r| r.record.severity.as_str().to_string())
            .collect();
        if !invalid.is_empty() {
            issues.push(SchemaIssue::InvalidSeverityValues {
                values: invalid.into_iter().collect(),
            });
        }
    }

    issues
}
