//! Per-user activity aggregates
//!
//! Two grouped-by-user reductions joined back onto the row level:
//! - total event count per user over the whole batch
//! - mean events per *active* calendar day (UTC) per user
//!
//! Both are defensive-compatibility stages: when the columns they depend on
//! are absent the caller skips them and the derived fields stay undefined.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::types::EnrichedTable;

/// Attach `user_event_count_total`: the count of records sharing each row's
/// `user_id`, over the entire batch (not a rolling count).
pub fn apply_user_totals(table: &mut EnrichedTable) {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in &table.rows {
        if let Some(user) = &row.record.user_id {
            *counts.entry(user.clone()).or_default() += 1;
        }
    }

    for row in &mut table.rows {
        row.user_event_count_total = row
            .record
            .user_id
            .as_ref()
            .and_then(|user| counts.get(user).copied());
    }
}

/// Attach `user_daily_avg_events`: the arithmetic mean, over the calendar
/// days (UTC) on which a user has at least one event, of that user's per-day
/// event count.
///
/// Days with zero events are not part of the denominator: a user active on
/// two days out of a month averages over those two days only.
pub fn apply_daily_average(table: &mut EnrichedTable) {
    let mut daily_counts: HashMap<(String, NaiveDate), u64> = HashMap::new();
    for row in &table.rows {
        if let (Some(user), Some(ts)) = (&row.record.user_id, row.record.timestamp) {
            *daily_counts
                .entry((user.clone(), ts.date_naive()))
                .or_default() += 1;
        }
    }

    // (total events on active days, active day count) per user
    let mut per_user: HashMap<String, (u64, u64)> = HashMap::new();
    for ((user, _date), count) in daily_counts {
        let entry = per_user.entry(user).or_default();
        entry.0 += count;
        entry.1 += 1;
    }

    let averages: HashMap<String, f64> = per_user
        .into_iter()
        .map(|(user, (total, days))| (user, total as f64 / days as f64))
        .collect();

    for row in &mut table.rows {
        row.user_daily_avg_events = row
            .record
            .user_id
            .as_ref()
            .and_then(|user| averages.get(user).copied());
    }
}
