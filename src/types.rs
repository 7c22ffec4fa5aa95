//! Core types for the secpipe pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: cleaned event records, the column capability set, and the enriched
//! (feature-augmented) table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalized severity label for a security event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
    Unknown,
    /// Values outside the fixed label set pass through verbatim and are
    /// surfaced by schema validation rather than erased
    #[serde(untagged)]
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Unknown => "unknown",
            Severity::Other(label) => label.as_str(),
        }
    }

    /// True for the six labels the pipeline considers in-domain
    pub fn is_in_domain(&self) -> bool {
        !matches!(self, Severity::Other(_))
    }
}

/// Normalized outcome status for a security event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
    Unknown,
    #[serde(untagged)]
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Unknown => "unknown",
            Status::Other(label) => label.as_str(),
        }
    }

    pub fn is_in_domain(&self) -> bool {
        !matches!(self, Status::Other(_))
    }
}

/// Named columns the pipeline knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    EventId,
    Timestamp,
    UserId,
    EventType,
    Status,
    Severity,
    SourceIp,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::EventId => "event_id",
            Column::Timestamp => "timestamp",
            Column::UserId => "user_id",
            Column::EventType => "event_type",
            Column::Status => "status",
            Column::Severity => "severity",
            Column::SourceIp => "source_ip",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        match name {
            "event_id" => Some(Column::EventId),
            "timestamp" => Some(Column::Timestamp),
            "user_id" => Some(Column::UserId),
            "event_type" => Some(Column::EventType),
            "status" => Some(Column::Status),
            "severity" => Some(Column::Severity),
            "source_ip" => Some(Column::SourceIp),
            _ => None,
        }
    }
}

/// Explicit capability set: which named columns the input table carried.
///
/// Feature stages branch on column presence through this set instead of
/// probing individual rows, so the "no-op on missing optional column"
/// policy is a single explicit check per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    present: BTreeSet<Column>,
}

impl ColumnSet {
    /// Build from a CSV header row; unrecognized header names are ignored
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let present = headers
            .iter()
            .filter_map(|h| Column::from_name(h.as_ref().trim()))
            .collect();
        Self { present }
    }

    /// Capability set containing every known column
    pub fn full() -> Self {
        let present = [
            Column::EventId,
            Column::Timestamp,
            Column::UserId,
            Column::EventType,
            Column::Status,
            Column::Severity,
            Column::SourceIp,
        ]
        .into_iter()
        .collect();
        Self { present }
    }

    pub fn contains(&self, column: Column) -> bool {
        self.present.contains(&column)
    }

    pub fn insert(&mut self, column: Column) {
        self.present.insert(column);
    }

    pub fn remove(&mut self, column: Column) {
        self.present.remove(&column);
    }

    /// Names of the given columns that are absent from this set
    pub fn missing_of(&self, required: &[Column]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.contains(**c))
            .map(|c| c.name().to_string())
            .collect()
    }
}

/// One cleaned, normalized event record.
///
/// `timestamp` and `user_id` are `Option` to model column absence: when the
/// corresponding column is present in [`ColumnSet`], cleaning guarantees every
/// row carries a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event identifier
    pub event_id: String,
    /// Event time, timezone-normalized to UTC
    pub timestamp: Option<DateTime<Utc>>,
    /// Acting principal, trimmed and lowercased
    pub user_id: Option<String>,
    /// Normalized event type label
    pub event_type: String,
    /// Normalized outcome status
    pub status: Status,
    /// Normalized severity label
    pub severity: Severity,
    /// Source IP as a trimmed string ("0.0.0.0" placeholder when absent)
    pub source_ip: String,
}

/// A cleaned, normalized table ready for feature derivation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    pub columns: ColumnSet,
    pub rows: Vec<EventRecord>,
}

impl EventTable {
    pub fn new(columns: ColumnSet, rows: Vec<EventRecord>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An event record augmented with derived per-user and per-session features.
///
/// Each derived field is `None` when its value is undefined: either the owning
/// stage was skipped (optional column absent) or the value has no defined
/// score (severity outside the scored set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub record: EventRecord,
    /// Ordinal severity encoding (0-4); undefined for unscored labels
    pub severity_score: Option<f64>,
    /// Total events for this record's user across the whole batch
    pub user_event_count_total: Option<u64>,
    /// Mean events per active calendar day (UTC) for this record's user
    pub user_daily_avg_events: Option<f64>,
    /// Per-user session sequence number, starting at 0
    pub session_id: Option<u64>,
    /// Number of events in this record's session
    pub session_event_count: Option<u64>,
    /// Session span (last event - first event) in seconds
    pub session_duration_seconds: Option<f64>,
}

impl EnrichedEvent {
    /// Wrap a record with all derived fields undefined
    pub fn new(record: EventRecord) -> Self {
        Self {
            record,
            severity_score: None,
            user_event_count_total: None,
            user_daily_avg_events: None,
            session_id: None,
            session_event_count: None,
            session_duration_seconds: None,
        }
    }
}

/// The augmented output table: same rows as the input, in the original order,
/// plus the derived feature columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedTable {
    pub columns: ColumnSet,
    pub rows: Vec<EnrichedEvent>,
}

impl EnrichedTable {
    /// Lift an [`EventTable`] into an enriched table with empty features
    pub fn from_table(table: EventTable) -> Self {
        Self {
            columns: table.columns,
            rows: table.rows.into_iter().map(EnrichedEvent::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
