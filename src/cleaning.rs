//! Record cleaning
//!
//! Applies the simple, explicit cleaning rules that run before normalization:
//! - drop rows without an event identifier
//! - fill missing categorical values with placeholders
//! - trim surrounding whitespace from every text field
//! - remove duplicate rows, keeping the last occurrence

use std::collections::HashSet;

use crate::schema::RawRecord;

/// Placeholder for missing categorical values
pub const UNKNOWN: &str = "unknown";

/// Placeholder for a missing source IP
pub const UNKNOWN_IP: &str = "0.0.0.0";

/// Handle missing values with explicit rules:
/// - a missing or blank `event_id` drops the row (it cannot be de-duplicated
///   or joined reliably)
/// - `user_id`, `event_type`, `status`, `severity` fall back to `"unknown"`
/// - `source_ip` falls back to `"0.0.0.0"`
///
/// All surviving text fields are whitespace-trimmed. Timestamp parsing and
/// invalid timestamps are handled by the normalizer, not here.
pub fn handle_missing_values(records: Vec<RawRecord>) -> Vec<RawRecord> {
    records
        .into_iter()
        .filter_map(|record| {
            let event_id = trimmed(record.event_id)?;

            Some(RawRecord {
                event_id: Some(event_id),
                timestamp: record.timestamp.map(|t| t.trim().to_string()),
                user_id: Some(fill(record.user_id, UNKNOWN)),
                event_type: Some(fill(record.event_type, UNKNOWN)),
                status: Some(fill(record.status, UNKNOWN)),
                severity: Some(fill(record.severity, UNKNOWN)),
                source_ip: Some(fill(record.source_ip, UNKNOWN_IP)),
            })
        })
        .collect()
}

/// Remove duplicate records, preserving the original relative order of the
/// survivors.
///
/// Strategy:
/// - drop fully duplicated rows first, keeping the last occurrence
/// - then drop duplicates by `event_id`, keeping the last occurrence
pub fn remove_duplicates(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let full = keep_last(records, |record| record.clone());
    keep_last(full, |record| record.event_id.clone())
}

/// Keep the last occurrence per key, preserving relative order
fn keep_last<K, F>(records: Vec<RawRecord>, key: F) -> Vec<RawRecord>
where
    K: std::hash::Hash + Eq,
    F: Fn(&RawRecord) -> K,
{
    let mut seen = HashSet::new();
    let mut kept: Vec<RawRecord> = records
        .into_iter()
        .rev()
        .filter(|record| seen.insert(key(record)))
        .collect();
    kept.reverse();
    kept
}

fn trimmed(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn fill(value: Option<String>, placeholder: &str) -> String {
    match trimmed(value) {
        Some(value) => value,
        None => placeholder.to_string(),
    }
}
