//! Pipeline orchestration
//!
//! This module provides the public API for secpipe. It runs the full batch
//! pipeline over an in-memory table: required-column validation, cleaning,
//! normalization, feature derivation, and schema validation.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

use crate::cleaning::{handle_missing_values, remove_duplicates};
use crate::error::PipelineError;
use crate::features::{self, FeatureConfig, DEFAULT_GAP_MINUTES};
use crate::normalizer::Normalizer;
use crate::schema::{validate_required_columns, validate_schema, RawBatch, SchemaIssue, ValidateMode};
use crate::types::{EnrichedTable, Severity};

/// Configuration for a full pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Inactivity gap (minutes) splitting sessions
    pub gap_minutes: f64,
    /// Drop rows whose normalized severity is `unknown` before enrichment
    pub drop_unknown_severity: bool,
    /// How schema-validation findings are handled
    pub validate: ValidateMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gap_minutes: DEFAULT_GAP_MINUTES,
            drop_unknown_severity: false,
            validate: ValidateMode::Warn,
        }
    }
}

/// The result of a pipeline run: the augmented table plus any
/// schema-validation findings collected along the way
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub table: EnrichedTable,
    pub issues: Vec<SchemaIssue>,
}

impl PipelineRun {
    /// Compute a brief post-run summary
    pub fn summary(&self) -> RunSummary {
        let mut users = HashSet::new();
        let mut sessions = HashSet::new();
        let mut first_event: Option<DateTime<Utc>> = None;
        let mut last_event: Option<DateTime<Utc>> = None;
        let mut severity_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut event_type_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();

        for row in &self.table.rows {
            if let Some(user) = &row.record.user_id {
                users.insert(user.clone());
                if let Some(session) = row.session_id {
                    sessions.insert((user.clone(), session));
                }
            }
            if let Some(ts) = row.record.timestamp {
                first_event = Some(first_event.map_or(ts, |t| t.min(ts)));
                last_event = Some(last_event.map_or(ts, |t| t.max(ts)));
            }
            *severity_counts
                .entry(row.record.severity.as_str().to_string())
                .or_default() += 1;
            *event_type_counts
                .entry(row.record.event_type.clone())
                .or_default() += 1;
            *status_counts
                .entry(row.record.status.as_str().to_string())
                .or_default() += 1;
        }

        RunSummary {
            rows: self.table.len(),
            users: users.len(),
            sessions: sessions.len(),
            first_event,
            last_event,
            severity_counts,
            event_type_counts,
            status_counts,
        }
    }
}

/// Brief post-run statistics for reporting
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RunSummary {
    pub rows: usize,
    pub users: usize,
    pub sessions: usize,
    pub first_event: Option<DateTime<Utc>>,
    pub last_event: Option<DateTime<Utc>>,
    pub severity_counts: BTreeMap<String, usize>,
    pub event_type_counts: BTreeMap<String, usize>,
    pub status_counts: BTreeMap<String, usize>,
}

/// Run the full pipeline over an in-memory batch.
///
/// Stages:
/// 1. required-column validation (hard error on missing columns)
/// 2. missing-value handling
/// 3. duplicate removal (keep last)
/// 4. timestamp standardization to UTC (unparsable rows dropped) and
///    categorical normalization
/// 5. optional unknown-severity filter
/// 6. feature derivation (severity score, user aggregates, sessions)
/// 7. schema validation per [`ValidateMode`]
pub fn run_pipeline(batch: RawBatch, config: &PipelineConfig) -> Result<PipelineRun, PipelineError> {
    info!(rows = batch.len(), "validating required columns");
    validate_required_columns(&batch.columns)?;

    let records = handle_missing_values(batch.records);
    info!(rows = records.len(), "handled missing values");

    let records = remove_duplicates(records);
    info!(rows = records.len(), "removed duplicates");

    let mut table = Normalizer::normalize(batch.columns, records);
    info!(rows = table.len(), "normalized timestamps and categoricals");

    if config.drop_unknown_severity {
        table.rows.retain(|r| r.severity != Severity::Unknown);
        info!(rows = table.len(), "dropped unknown-severity rows");
    }

    let enriched = features::enrich(
        table,
        &FeatureConfig {
            gap_minutes: config.gap_minutes,
        },
    )?;
    info!(rows = enriched.len(), "derived features");

    let issues = match config.validate {
        ValidateMode::Off => Vec::new(),
        ValidateMode::Warn => {
            let issues = validate_schema(&enriched);
            for issue in &issues {
                warn!(%issue, "schema validation finding");
            }
            issues
        }
        ValidateMode::Strict => {
            let issues = validate_schema(&enriched);
            if !issues.is_empty() {
                let details = issues
                    .iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(PipelineError::SchemaValidation(details));
            }
            issues
        }
    };

    Ok(PipelineRun {
        table: enriched,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawRecord;
    use crate::types::ColumnSet;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn make_raw(event_id: &str, timestamp: &str, user: &str, severity: &str) -> RawRecord {
        RawRecord {
            event_id: Some(event_id.to_string()),
            timestamp: Some(timestamp.to_string()),
            user_id: Some(user.to_string()),
            event_type: Some("Login Attempt".to_string()),
            status: Some("OK".to_string()),
            severity: Some(severity.to_string()),
            source_ip: Some("10.0.0.1".to_string()),
        }
    }

    fn make_batch(records: Vec<RawRecord>) -> RawBatch {
        RawBatch {
            columns: ColumnSet::full(),
            records,
        }
    }

    #[test]
    fn test_end_to_end_run() {
        let batch = make_batch(vec![
            make_raw("e1", "2024-03-01T00:00:00Z", "U1", "Info"),
            make_raw("e2", "2024-03-01T00:20:00Z", "u1", "High"),
            make_raw("e3", "2024-03-01T01:05:00Z", "u1", "CRIT"),
        ]);

        let run = run_pipeline(batch, &PipelineConfig::default()).unwrap();

        assert_eq!(run.table.len(), 3);
        assert!(run.issues.is_empty());

        // "U1" and "u1" normalize to the same user
        let row = &run.table.rows[0];
        assert_eq!(row.record.user_id.as_deref(), Some("u1"));
        assert_eq!(row.record.event_type, "login_attempt");
        assert_eq!(row.user_event_count_total, Some(3));
        assert_eq!(row.severity_score, Some(0.0));

        let ids: Vec<_> = run.table.rows.iter().map(|r| r.session_id).collect();
        assert_eq!(ids, vec![Some(0), Some(0), Some(1)]);
    }

    #[test]
    fn test_missing_required_column_is_hard_error() {
        let batch = RawBatch {
            columns: ColumnSet::from_headers(&["event_id", "timestamp"]),
            records: vec![make_raw("e1", "2024-03-01T00:00:00Z", "u1", "info")],
        };

        let err = run_pipeline(batch, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumns(_)));
    }

    #[test]
    fn test_duplicates_and_invalid_timestamps_are_dropped() {
        let batch = make_batch(vec![
            make_raw("e1", "2024-03-01T00:00:00Z", "u1", "info"),
            make_raw("e1", "2024-03-01T00:01:00Z", "u1", "low"),
            make_raw("e2", "not a timestamp", "u1", "info"),
        ]);

        let run = run_pipeline(batch, &PipelineConfig::default()).unwrap();

        // e1 deduplicated keeping the later row, e2 dropped for its timestamp
        assert_eq!(run.table.len(), 1);
        assert_eq!(run.table.rows[0].record.severity, Severity::Low);
    }

    #[test]
    fn test_drop_unknown_severity_filter() {
        let batch = make_batch(vec![
            make_raw("e1", "2024-03-01T00:00:00Z", "u1", "info"),
            make_raw("e2", "2024-03-01T00:01:00Z", "u1", ""),
        ]);

        let config = PipelineConfig {
            drop_unknown_severity: true,
            ..Default::default()
        };
        let run = run_pipeline(batch, &config).unwrap();

        assert_eq!(run.table.len(), 1);
        assert_eq!(run.table.rows[0].record.event_id, "e1");
    }

    #[test]
    fn test_strict_validation_fails_on_out_of_domain_severity() {
        let batch = make_batch(vec![make_raw(
            "e1",
            "2024-03-01T00:00:00Z",
            "u1",
            "catastrophic",
        )]);

        let config = PipelineConfig {
            validate: ValidateMode::Strict,
            ..Default::default()
        };
        let err = run_pipeline(batch, &config).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaValidation(_)));
    }

    #[test]
    fn test_warn_mode_collects_issues_without_failing() {
        let batch = make_batch(vec![make_raw(
            "e1",
            "2024-03-01T00:00:00Z",
            "u1",
            "catastrophic",
        )]);

        let run = run_pipeline(batch, &PipelineConfig::default()).unwrap();
        assert_eq!(run.issues.len(), 1);
        assert_eq!(run.table.len(), 1);
        assert_eq!(run.table.rows[0].severity_score, None);
    }

    #[test]
    fn test_summary() {
        let batch = make_batch(vec![
            make_raw("e1", "2024-03-01T00:00:00Z", "u1", "info"),
            make_raw("e2", "2024-03-01T00:20:00Z", "u1", "high"),
            make_raw("e3", "2024-03-01T01:05:00Z", "u2", "high"),
        ]);

        let run = run_pipeline(batch, &PipelineConfig::default()).unwrap();
        let summary = run.summary();

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.users, 2);
        // u1's two events are 20 minutes apart (one session), u2 has one
        assert_eq!(summary.sessions, 2);
        assert_eq!(
            summary.first_event,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            summary.last_event,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 1, 5, 0).unwrap())
        );
        assert_eq!(summary.severity_counts.get("high"), Some(&2));
        assert_eq!(summary.status_counts.get("success"), Some(&3));
    }
}
