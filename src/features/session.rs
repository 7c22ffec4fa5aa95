//! Session segmentation and aggregation
//!
//! Splits each user's chronologically ordered events into sessions separated
//! by inactivity gaps, then computes per-session event counts and durations.
//!
//! Segmentation works on row indices grouped per user: each group is stable-
//! sorted by timestamp (ties keep the original row order) and folded with a
//! running session counter. Assignment happens by index, so the table itself
//! is never reordered and the output keeps the original row order. Groups are
//! independent of each other, so the per-user folds could run in parallel and
//! merge by key without locking.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::PipelineError;
use crate::types::EnrichedTable;

/// Assign `session_id` per user: a new session starts when the gap to the
/// previous event of the same user is strictly greater than
/// `gap_minutes * 60` seconds. Ids count up from 0 per user.
///
/// Requires every row to carry a user and a timestamp; a missing value here
/// is an upstream contract violation, not a recoverable condition.
pub fn segment(table: &mut EnrichedTable, gap_minutes: f64) -> Result<(), PipelineError> {
    let gap_seconds = gap_minutes * 60.0;

    let mut by_user: HashMap<String, Vec<(usize, DateTime<Utc>)>> = HashMap::new();
    for (idx, row) in table.rows.iter().enumerate() {
        let user = row.record.user_id.as_deref().ok_or_else(|| {
            PipelineError::ContractViolation(format!("row {idx} has no user_id"))
        })?;
        let ts = row.record.timestamp.ok_or_else(|| {
            PipelineError::ContractViolation(format!("row {idx} has no timestamp"))
        })?;
        by_user.entry(user.to_string()).or_default().push((idx, ts));
    }

    for group in by_user.values_mut() {
        // Entries arrive in original row order; the stable sort keeps that
        // order for equal timestamps
        group.sort_by_key(|&(_, ts)| ts);

        let mut session: u64 = 0;
        let mut previous: Option<DateTime<Utc>> = None;
        for &(idx, ts) in group.iter() {
            if let Some(prev) = previous {
                if delta_seconds(prev, ts) > gap_seconds {
                    session += 1;
                }
            }
            table.rows[idx].session_id = Some(session);
            previous = Some(ts);
        }
    }

    Ok(())
}

/// Attach `session_event_count` and `session_duration_seconds`: group by
/// `(user_id, session_id)`, reduce to count/min/max, join back by the
/// composite key. Joining through a map cannot multiply rows.
pub fn aggregate(table: &mut EnrichedTable) -> Result<(), PipelineError> {
    struct SessionSpan {
        count: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    }

    let mut spans: HashMap<(String, u64), SessionSpan> = HashMap::new();
    let mut keys: Vec<(String, u64)> = Vec::with_capacity(table.len());
    for (idx, row) in table.rows.iter().enumerate() {
        let user = row.record.user_id.as_deref().ok_or_else(|| {
            PipelineError::ContractViolation(format!("row {idx} has no user_id"))
        })?;
        let session = row.session_id.ok_or_else(|| {
            PipelineError::ContractViolation(format!(
                "row {idx} has no session_id; segmentation must run before aggregation"
            ))
        })?;
        let ts = row.record.timestamp.ok_or_else(|| {
            PipelineError::ContractViolation(format!("row {idx} has no timestamp"))
        })?;

        spans
            .entry((user.to_string(), session))
            .and_modify(|span| {
                span.count += 1;
                span.start = span.start.min(ts);
                span.end = span.end.max(ts);
            })
            .or_insert(SessionSpan {
                count: 1,
                start: ts,
                end: ts,
            });
        keys.push((user.to_string(), session));
    }

    for (row, key) in table.rows.iter_mut().zip(keys) {
        let span = &spans[&key];
        row.session_event_count = Some(span.count);
        row.session_duration_seconds = Some(delta_seconds(span.start, span.end));
    }

    Ok(())
}

fn delta_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnSet, EnrichedEvent, EventRecord, Severity, Status};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn make_row(event_id: &str, user: &str, ts: DateTime<Utc>) -> EnrichedEvent {
        EnrichedEvent::new(EventRecord {
            event_id: event_id.to_string(),
            timestamp: Some(ts),
            user_id: Some(user.to_string()),
            event_type: "login".to_string(),
            status: Status::Success,
            severity: Severity::Info,
            source_ip: "10.0.0.1".to_string(),
        })
    }

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, second).unwrap()
    }

    fn make_table(rows: Vec<EnrichedEvent>) -> EnrichedTable {
        EnrichedTable {
            columns: ColumnSet::full(),
            rows,
        }
    }

    #[test]
    fn test_gap_boundary_is_strictly_greater() {
        // Exactly 30 minutes apart: same session. One second more: split.
        let mut exact = make_table(vec![
            make_row("e1", "u", at(0, 0, 0)),
            make_row("e2", "u", at(0, 30, 0)),
        ]);
        segment(&mut exact, 30.0).unwrap();
        assert_eq!(exact.rows[0].session_id, Some(0));
        assert_eq!(exact.rows[1].session_id, Some(0));

        let mut over = make_table(vec![
            make_row("e1", "u", at(0, 0, 0)),
            make_row("e2", "u", at(0, 30, 1)),
        ]);
        segment(&mut over, 30.0).unwrap();
        assert_eq!(over.rows[0].session_id, Some(0));
        assert_eq!(over.rows[1].session_id, Some(1));
    }

    #[test]
    fn test_session_ids_are_monotonic_per_user() {
        let mut table = make_table(vec![
            make_row("e1", "u", at(0, 0, 0)),
            make_row("e2", "u", at(1, 0, 0)),
            make_row("e3", "u", at(2, 0, 0)),
            make_row("e4", "u", at(2, 10, 0)),
        ]);

        segment(&mut table, 30.0).unwrap();

        let ids: Vec<_> = table.rows.iter().map(|r| r.session_id).collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2), Some(2)]);
    }

    #[test]
    fn test_users_are_segmented_independently() {
        // Interleaved users; each gets its own 0-based session numbering
        let mut table = make_table(vec![
            make_row("e1", "alice", at(0, 0, 0)),
            make_row("e2", "bob", at(0, 5, 0)),
            make_row("e3", "alice", at(2, 0, 0)),
            make_row("e4", "bob", at(0, 10, 0)),
        ]);

        segment(&mut table, 30.0).unwrap();

        let ids: Vec<_> = table.rows.iter().map(|r| r.session_id).collect();
        assert_eq!(ids, vec![Some(0), Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn test_equal_timestamps_keep_original_row_order() {
        // Two events at the same instant: the stable sort must keep them in
        // input order, so the earlier row anchors the session fold
        let ts = at(0, 0, 0);
        let mut table = make_table(vec![
            make_row("first", "u", ts),
            make_row("second", "u", ts),
            make_row("third", "u", at(3, 0, 0)),
        ]);

        segment(&mut table, 30.0).unwrap();

        assert_eq!(table.rows[0].session_id, Some(0));
        assert_eq!(table.rows[1].session_id, Some(0));
        assert_eq!(table.rows[2].session_id, Some(1));
    }

    #[test]
    fn test_out_of_order_input_is_sorted_internally() {
        // Rows arrive time-shuffled; ids follow chronological order but the
        // table keeps its original row order
        let mut table = make_table(vec![
            make_row("late", "u", at(5, 0, 0)),
            make_row("early", "u", at(0, 0, 0)),
        ]);

        segment(&mut table, 30.0).unwrap();

        assert_eq!(table.rows[0].record.event_id, "late");
        assert_eq!(table.rows[0].session_id, Some(1));
        assert_eq!(table.rows[1].session_id, Some(0));
    }

    #[test]
    fn test_single_event_user() {
        let mut table = make_table(vec![make_row("e1", "solo", at(12, 0, 0))]);

        segment(&mut table, 30.0).unwrap();
        aggregate(&mut table).unwrap();

        assert_eq!(table.rows[0].session_id, Some(0));
        assert_eq!(table.rows[0].session_event_count, Some(1));
        assert_eq!(table.rows[0].session_duration_seconds, Some(0.0));
    }

    #[test]
    fn test_aggregate_consistency() {
        let mut table = make_table(vec![
            make_row("e1", "u", at(0, 0, 0)),
            make_row("e2", "u", at(0, 20, 0)),
            make_row("e3", "u", at(1, 5, 0)),
        ]);

        segment(&mut table, 30.0).unwrap();
        aggregate(&mut table).unwrap();

        // Per session: count equals rows sharing the key, duration is
        // max - min within the group
        assert_eq!(table.rows[0].session_event_count, Some(2));
        assert_eq!(table.rows[0].session_duration_seconds, Some(1200.0));
        assert_eq!(table.rows[1].session_event_count, Some(2));
        assert_eq!(table.rows[2].session_event_count, Some(1));
        assert_eq!(table.rows[2].session_duration_seconds, Some(0.0));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_session_partition_property() {
        // Every row lands in exactly one session; per-user counts sum to the
        // user's total rows
        let mut table = make_table(vec![
            make_row("e1", "a", at(0, 0, 0)),
            make_row("e2", "a", at(0, 10, 0)),
            make_row("e3", "a", at(4, 0, 0)),
            make_row("e4", "b", at(1, 0, 0)),
        ]);

        segment(&mut table, 30.0).unwrap();
        aggregate(&mut table).unwrap();

        let mut session_sizes: HashMap<(String, u64), u64> = HashMap::new();
        for row in &table.rows {
            assert!(row.session_id.is_some());
            let key = (row.record.user_id.clone().unwrap(), row.session_id.unwrap());
            *session_sizes.entry(key).or_default() += 1;
        }
        for row in &table.rows {
            let key = (row.record.user_id.clone().unwrap(), row.session_id.unwrap());
            assert_eq!(Some(session_sizes[&key]), row.session_event_count);
        }
        let total: u64 = session_sizes
            .iter()
            .filter(|((user, _), _)| user == "a")
            .map(|(_, n)| n)
            .sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_segment_rejects_missing_timestamp() {
        let mut row = make_row("e1", "u", at(0, 0, 0));
        row.record.timestamp = None;
        let mut table = make_table(vec![row]);

        let err = segment(&mut table, 30.0).unwrap_err();
        assert!(matches!(err, PipelineError::ContractViolation(_)));
    }

    #[test]
    fn test_aggregate_rejects_unsegmented_rows() {
        let mut table = make_table(vec![make_row("e1", "u", at(0, 0, 0))]);

        let err = aggregate(&mut table).unwrap_err();
        assert!(matches!(err, PipelineError::ContractViolation(_)));
    }
}
