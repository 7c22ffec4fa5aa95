//! Severity scoring
//!
//! Maps the bounded severity label set to an ordinal numeric score for
//! analytics and ranking. Labels outside the scored set (including
//! `unknown`) get an explicitly-undefined score, distinguishable from 0.

use crate::types::{EnrichedTable, Severity};

/// Ordinal score for a severity label; `None` for unscored labels
pub fn severity_score(severity: &Severity) -> Option<f64> {
    match severity {
        Severity::Info => Some(0.0),
        Severity::Low => Some(1.0),
        Severity::Medium => Some(2.0),
        Severity::High => Some(3.0),
        Severity::Critical => Some(4.0),
        Severity::Unknown | Severity::Other(_) => None,
    }
}

/// Attach `severity_score` to every row. Pure column addition, no side effects.
pub fn apply(table: &mut EnrichedTable) {
    for row in &mut table.rows {
        row.severity_score = severity_score(&row.record.severity);
    }
}
