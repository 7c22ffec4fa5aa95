//! Record normalization
//!
//! Turns cleaned raw records into typed [`EventRecord`]s:
//! - timestamps parsed into UTC, rows with unparsable timestamps dropped
//! - categorical fields lowercased, trimmed, and mapped through fixed
//!   synonym tables
//! - unmapped categorical values pass through verbatim (as `Other`) for
//!   schema validation to report

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::cleaning::{UNKNOWN, UNKNOWN_IP};
use crate::schema::RawRecord;
use crate::types::{Column, ColumnSet, EventRecord, EventTable, Severity, Status};

/// Accepted timestamp layouts besides RFC 3339; naive values are taken as UTC
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Normalizer for converting cleaned raw records into typed event records
pub struct Normalizer;

impl Normalizer {
    /// Normalize a cleaned batch into an [`EventTable`].
    ///
    /// When the timestamp column is present, rows whose timestamp fails to
    /// parse are dropped; when it is absent, rows pass through with no
    /// timestamp and the downstream capability checks take over.
    pub fn normalize(columns: ColumnSet, records: Vec<RawRecord>) -> EventTable {
        let has_timestamp = columns.contains(Column::Timestamp);
        let has_user_id = columns.contains(Column::UserId);

        let rows = records
            .into_iter()
            .filter_map(|record| {
                let timestamp = match (has_timestamp, record.timestamp.as_deref()) {
                    (true, Some(raw)) => Some(parse_timestamp(raw)?),
                    (true, None) => return None,
                    (false, _) => None,
                };

                let user_id = if has_user_id {
                    Some(normalize_user_id(record.user_id.as_deref().unwrap_or("")))
                } else {
                    None
                };

                Some(EventRecord {
                    event_id: record.event_id.unwrap_or_default(),
                    timestamp,
                    user_id,
                    event_type: normalize_event_type(record.event_type.as_deref().unwrap_or("")),
                    status: normalize_status(record.status.as_deref().unwrap_or("")),
                    severity: normalize_severity(record.severity.as_deref().unwrap_or("")),
                    source_ip: normalize_source_ip(record.source_ip.as_deref().unwrap_or("")),
                })
            })
            .collect();

        EventTable::new(columns, rows)
    }
}

/// Parse a timestamp into UTC, accepting RFC 3339 and the common naive layouts
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }

    // Date-only values land on UTC midnight
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}

/// Lowercase, trim, and collapse whitespace/hyphen runs to a single underscore
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_separator = false;

    for ch in raw.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            if !last_was_separator && !out.is_empty() {
                out.push('_');
            }
            last_was_separator = true;
        } else {
            out.extend(ch.to_lowercase());
            last_was_separator = false;
        }
    }

    // A trailing separator run leaves a dangling underscore
    if out.ends_with('_') {
        out.pop();
    }
    out
}

/// Map a raw status label into the fixed status set
pub fn normalize_status(raw: &str) -> Status {
    let normalized = normalize_text(raw);
    match normalized.as_str() {
        "ok" | "pass" | "passed" | "success" | "succeeded" | "allowed" | "grant" => {
            Status::Success
        }
        "failure" | "failed" | "error" | "denied" | "deny" | "blocked" | "unauthorized" => {
            Status::Failure
        }
        "unknown" | "" => Status::Unknown,
        _ => Status::Other(normalized),
    }
}

/// Map a raw severity label into the fixed severity set
pub fn normalize_severity(raw: &str) -> Severity {
    let normalized = normalize_text(raw);
    match normalized.as_str() {
        "informational" | "information" | "info" => Severity::Info,
        "notice" | "low" => Severity::Low,
        "warn" | "warning" | "medium" | "med" => Severity::Medium,
        "high" | "severe" => Severity::High,
        "critical" | "crit" | "emergency" => Severity::Critical,
        "unknown" | "" => Severity::Unknown,
        _ => Severity::Other(normalized),
    }
}

pub fn normalize_event_type(raw: &str) -> String {
    let normalized = normalize_text(raw);
    if normalized.is_empty() {
        UNKNOWN.to_string()
    } else {
        normalized
    }
}

pub fn normalize_user_id(raw: &str) -> String {
    let normalized = normalize_text(raw);
    if normalized.is_empty() {
        UNKNOWN.to_string()
    } else {
        normalized
    }
}

pub fn normalize_source_ip(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN_IP.to_string()
    } else {
        trimmed.to_string()
    }
}
