//! Note log parser
//!
//! The operator note log is a tab-separated export of the chamber software:
//! a signature line, one more preamble line, a header row naming the columns
//! (`Date`, `Time`, `Comment` among them), a separator row, then one row per
//! note. Rows that fail to parse are dropped; only a wrong signature or a
//! missing column is fatal.

use chrono::NaiveDateTime;

use crate::types::{NoteEvent, PipelineError, Result};
use crate::{DATETIME_FORMAT, DEVICE_SIGNATURE, NOTE_PREAMBLE_LINES};

/// Parse a note log into events, keeping the log's row order
pub fn parse_note_log(lines: &[String]) -> Result<Vec<NoteEvent>> {
    let first = lines
        .first()
        .ok_or_else(|| PipelineError::Format("note log is empty".to_string()))?;
    if !first.starts_with(DEVICE_SIGNATURE) {
        return Err(PipelineError::Format(format!(
            "note log does not start with `{DEVICE_SIGNATURE}`"
        )));
    }

    let body = &lines[NOTE_PREAMBLE_LINES.min(lines.len())..];
    let header = body
        .first()
        .ok_or_else(|| PipelineError::Format("note log has no header row".to_string()))?;
    let columns: Vec<&str> = header.trim().split('\t').collect();

    let date_idx = column_index(&columns, "Date")?;
    let time_idx = column_index(&columns, "Time")?;
    let comment_idx = column_index(&columns, "Comment")?;

    let mut events = Vec::new();
    // body[1] is the separator row under the header
    for line in body.iter().skip(2) {
        let cells: Vec<&str> = line.trim().split('\t').collect();
        let (Some(date), Some(time), Some(comment)) = (
            cells.get(date_idx),
            cells.get(time_idx),
            cells.get(comment_idx),
        ) else {
            continue;
        };
        let stamp = format!("{} {}", date.trim(), time.trim());
        let Ok(timestamp) = NaiveDateTime::parse_from_str(&stamp, DATETIME_FORMAT) else {
            continue;
        };
        events.push(NoteEvent::new(timestamp, comment.trim()));
    }
    Ok(events)
}

fn column_index(columns: &[&str], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c.trim() == name)
        .ok_or_else(|| PipelineError::MissingData(format!("note log column `{name}`")))
}

// =============================================================================
// TESTS
// =============================================================================
