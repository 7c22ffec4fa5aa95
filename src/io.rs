//! Tabular input/output adapters
//!
//! String-based CSV parsing and emission plus an NDJSON writer. File and
//! stream handling belongs to the caller (the CLI); the library never touches
//! the filesystem itself.

use crate::error::PipelineError;
use crate::schema::{RawBatch, RawRecord};
use crate::types::{ColumnSet, EnrichedTable};

/// Column order of the emitted CSV: the input columns followed by the six
/// derived feature columns
pub const OUTPUT_COLUMNS: [&str; 13] = [
    "event_id",
    "timestamp",
    "user_id",
    "event_type",
    "status",
    "severity",
    "source_ip",
    "severity_score",
    "user_event_count_total",
    "user_daily_avg_events",
    "session_id",
    "session_event_count",
    "session_duration_seconds",
];

/// CSV adapter for raw event batches and enriched output
pub struct CsvAdapter;

impl CsvAdapter {
    /// Parse CSV text into a raw batch.
    ///
    /// The header row determines the [`ColumnSet`]; unknown columns are
    /// ignored, empty cells become `None`.
    pub fn parse(data: &str) -> Result<RawBatch, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let columns = ColumnSet::from_headers(&headers);

        let mut records = Vec::new();
        for result in reader.deserialize::<RawRecord>() {
            records.push(result?);
        }

        Ok(RawBatch { columns, records })
    }

    /// Emit the enriched table as CSV text, derived columns last.
    ///
    /// Undefined values (skipped stages, unscored severities) become empty
    /// cells.
    pub fn write(table: &EnrichedTable) -> Result<String, PipelineError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(OUTPUT_COLUMNS)?;

        for row in &table.rows {
            let record = &row.record;
            writer.write_record([
                record.event_id.clone(),
                record
                    .timestamp
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_default(),
                record.user_id.clone().unwrap_or_default(),
                record.event_type.clone(),
                record.status.as_str().to_string(),
                record.severity.as_str().to_string(),
                record.source_ip.clone(),
                fmt_float(row.severity_score),
                fmt_int(row.user_event_count_total),
                fmt_float(row.user_daily_avg_events),
                fmt_int(row.session_id),
                fmt_int(row.session_event_count),
                fmt_float(row.session_duration_seconds),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| PipelineError::EncodingError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| PipelineError::EncodingError(e.to_string()))
    }
}

/// Emit the enriched table as newline-delimited JSON, one event per line
pub fn to_ndjson(table: &EnrichedTable) -> Result<String, PipelineError> {
    let mut out = String::new();
    for row in &table.rows {
        out.push_str(&serde_json::to_string(row)?);
        out.push('\n');
    }
    Ok(out)
}

// Floats keep a decimal point so scores stay visually distinct from counts
fn fmt_float(value: Option<f64>) -> String {
    value.map(|v| format!("{v:?}")).unwrap_or_default()
}

fn fmt_int(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
