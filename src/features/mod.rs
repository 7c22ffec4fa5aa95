//! Feature derivation
//!
//! The analytical core of the pipeline. Five stages run in order over a
//! cleaned, normalized [`EventTable`], each adding derived columns:
//!
//! 1. Severity scoring - ordinal encoding of the severity label
//! 2. User frequency - total event count per user over the whole batch
//! 3. User daily rate - mean events per active calendar day per user
//! 4. Session segmentation - inactivity-gap splitting of each user's events
//! 5. Session aggregation - per-session event count and duration
//!
//! Stages 2 and 3 degrade to a no-op when their optional columns are absent;
//! stages 1, 4, and 5 have no such fallback and fail fast instead.

pub mod activity;
pub mod session;
pub mod severity;

use tracing::debug;

use crate::error::PipelineError;
use crate::types::{Column, EnrichedTable, EventTable};

/// Default inactivity gap separating sessions, in minutes
pub const DEFAULT_GAP_MINUTES: f64 = 30.0;

/// Configuration for feature derivation
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    /// Inactivity gap (minutes) above which a new session starts.
    /// A gap exactly equal to the threshold does not split.
    pub gap_minutes: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            gap_minutes: DEFAULT_GAP_MINUTES,
        }
    }
}

/// Run all five feature stages over the table.
///
/// Returns the augmented table with the same rows in the original order.
/// Row count is preserved; a change in row count is a programming-contract
/// violation and surfaces as a hard error.
pub fn enrich(table: EventTable, config: &FeatureConfig) -> Result<EnrichedTable, PipelineError> {
    if !config.gap_minutes.is_finite() || config.gap_minutes <= 0.0 {
        return Err(PipelineError::FeatureError(format!(
            "gap_minutes must be positive, got {}",
            config.gap_minutes
        )));
    }

    let missing = table.columns.missing_of(&[Column::Severity]);
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }

    let input_len = table.len();
    let mut enriched = EnrichedTable::from_table(table);

    severity::apply(&mut enriched);

    // Defensive-compatibility branches: frequency and daily-rate skip
    // themselves when their columns are absent
    if enriched.columns.contains(Column::UserId) {
        activity::apply_user_totals(&mut enriched);
    } else {
        debug!("user_id column absent, skipping user frequency stage");
    }
    if enriched.columns.contains(Column::UserId) && enriched.columns.contains(Column::Timestamp) {
        activity::apply_daily_average(&mut enriched);
    } else {
        debug!("user_id or timestamp column absent, skipping daily-rate stage");
    }

    // Segmentation has no defensive fallback: its columns must be present
    let missing = enriched
        .columns
        .missing_of(&[Column::UserId, Column::Timestamp]);
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }

    session::segment(&mut enriched, config.gap_minutes)?;
    session::aggregate(&mut enriched)?;

    if enriched.len() != input_len {
        return Err(PipelineError::ContractViolation(format!(
            "feature derivation changed row count: {input_len} in, {} out",
            enriched.len()
        )));
    }

    Ok(enriched)
}
