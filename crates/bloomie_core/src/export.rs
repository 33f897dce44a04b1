//! crates/bloomie_core/src/export.rs
//!
//! Flat CSV export of log entries, ready to hand to a share sheet or download.

use csv::Writer;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{LogEntry, Nurture};

pub const CSV_HEADER: [&str; 7] = ["date", "nurture", "kind", "action", "details", "mood", "health_score"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to flush CSV output: {0}")]
    Flush(String),
    #[error("CSV output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

// One log, one line: newlines inside free text are flattened.
fn single_line(text: &str) -> String {
    text.split(['\r', '\n']).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
}

/// Writes one header row plus one row per log, in the order given.
/// Logs whose nurture is not in `nurtures` get an empty name and kind.
pub fn export_logs_csv(nurtures: &[Nurture], logs: &[LogEntry]) -> Result<String, ExportError> {
    let by_id: HashMap<Uuid, &Nurture> = nurtures.iter().map(|n| (n.id, n)).collect();
    let mut wtr = Writer::from_writer(Vec::new());

    wtr.write_record(CSV_HEADER)?;

    for log in logs {
        let nurture = by_id.get(&log.nurture_id);
        wtr.write_record(&[
            log.created_at.to_rfc3339(),
            nurture.map(|n| single_line(&n.name)).unwrap_or_default(),
            nurture.map(|n| n.kind.as_str().to_string()).unwrap_or_default(),
            single_line(log.parsed.action.as_deref().unwrap_or_default()),
            single_line(&log.raw_input),
            single_line(log.mood.as_deref().unwrap_or_default()),
            log.health_score.map(|s| s.to_string()).unwrap_or_default(),
        ])?;
    }

    let bytes = wtr.into_inner().map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
