//! CSV persistence of metadata and streams
//!
//! Streams are written as plain CSV with a `timestamp` column, the channel
//! columns, `protocol` and `relative_time_minutes`, and can be read back for
//! segment extraction. Rows that fail to parse on the way back in are
//! dropped; a missing `protocol` or `timestamp` column is fatal.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::types::{
    MeasurementRecord, MeasurementStream, PipelineError, Result, SubjectMetadata,
};

/// Timestamp format of persisted CSVs
const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write a subject metadata block as a two-row CSV (keys, values)
pub fn write_metadata_csv(metadata: &SubjectMetadata, path: &Path) -> Result<()> {
    let keys: Vec<String> = metadata.iter().map(|(k, _)| escape(k)).collect();
    let values: Vec<String> = metadata.iter().map(|(_, v)| escape(v)).collect();
    fs::write(path, format!("{}\n{}\n", keys.join(","), values.join(",")))?;
    Ok(())
}

/// Write a measurement stream as CSV
pub fn write_stream_csv(stream: &MeasurementStream, path: &Path) -> Result<()> {
    let mut out = String::new();
    out.push_str("timestamp,");
    for channel in &stream.channels {
        out.push_str(&escape(channel));
        out.push(',');
    }
    out.push_str("protocol,relative_time_minutes\n");

    for row in &stream.rows {
        out.push_str(&row.timestamp.format(CSV_DATETIME_FORMAT).to_string());
        out.push(',');
        for value in &row.values {
            if !value.is_nan() {
                out.push_str(&value.to_string());
            }
            out.push(',');
        }
        out.push_str(&format!("{},{}\n", row.protocol, row.relative_minutes));
    }

    fs::write(path, out)?;
    Ok(())
}

/// Read a stream back from CSV
///
/// The `protocol` column must be present: extraction only makes sense on an
/// annotated stream.
pub fn read_stream_csv(path: &Path) -> Result<MeasurementStream> {
    let content = fs::read_to_string(path)?;
    let mut lines = content.lines();

    let header = lines
        .next()
        .ok_or_else(|| PipelineError::Format(format!("`{}` is empty", path.display())))?;
    let columns: Vec<&str> = header.split(',').collect();

    let timestamp_idx = required_column(&columns, "timestamp", path)?;
    let protocol_idx = required_column(&columns, "protocol", path)?;
    let relative_idx = columns.iter().position(|c| *c == "relative_time_minutes");

    let channel_indices: Vec<usize> = (0..columns.len())
        .filter(|&i| i != timestamp_idx && i != protocol_idx && Some(i) != relative_idx)
        .collect();
    let channels: Vec<String> = channel_indices
        .iter()
        .map(|&i| columns[i].to_string())
        .collect();

    let mut stream = MeasurementStream::new(channels);
    for line in lines {
        let cells: Vec<&str> = line.split(',').collect();
        let Some(raw_timestamp) = cells.get(timestamp_idx) else {
            continue;
        };
        let Ok(timestamp) = NaiveDateTime::parse_from_str(raw_timestamp, CSV_DATETIME_FORMAT)
        else {
            continue;
        };
        let Some(Ok(protocol)) = cells.get(protocol_idx).map(|c| c.parse::<i64>()) else {
            continue;
        };
        let relative_minutes = relative_idx
            .and_then(|i| cells.get(i))
            .and_then(|c| c.parse::<f64>().ok())
            .unwrap_or(0.0);
        let values: Vec<f64> = channel_indices
            .iter()
            .map(|&i| {
                cells
                    .get(i)
                    .and_then(|c| c.parse::<f64>().ok())
                    .unwrap_or(f64::NAN)
            })
            .collect();

        stream.rows.push(MeasurementRecord {
            timestamp,
            values,
            protocol,
            relative_minutes,
        });
    }
    Ok(stream)
}

fn required_column(columns: &[&str], name: &str, path: &Path) -> Result<usize> {
    columns.iter().position(|c| *c == name).ok_or_else(|| {
        PipelineError::MissingData(format!("`{name}` column in `{}`", path.display()))
    })
}

/// Quote a cell when it would break the row
fn escape(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
