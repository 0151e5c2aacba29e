//! Measurement export parser
//!
//! The chamber software exports one tab-separated .txt per session: a
//! signature line, per-room subject metadata blocks, a `Room 1 Set 1` marker
//! and then the tabular data. Every logical column appears four times, once
//! per (set, room) combination, and each row repeats the date and time cells
//! four times as well.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::types::{
    MeasurementRecord, MeasurementStream, PipelineError, Result, SubjectMetadata,
};
use crate::{DATA_START_MARKER, DATETIME_FORMAT, DEVICE_SIGNATURE};

/// Logical columns of one (room, set) block, in export order.
/// The vendor's export swaps the kcal and kJ energy columns; the names below
/// restore the intended order.
pub const LOGICAL_COLUMNS: &[&str] = &[
    "Date",
    "Time",
    "VO2",
    "VCO2",
    "RER",
    "FiO2",
    "FeO2",
    "FiCO2",
    "FeCO2",
    "Flow",
    "Activity Monitor",
    "Energy Expenditure (kcal/min)",
    "Energy Expenditure (kJ/min)",
    "Pressure Ambient",
    "Temperature",
    "Relative Humidity",
];

/// Sets per room in the export
const SETS: [&str; 2] = ["S1", "S2"];

/// A fully parsed device export: per-room metadata and streams
#[derive(Debug, Clone)]
pub struct DeviceExport {
    pub r1_metadata: SubjectMetadata,
    pub r2_metadata: SubjectMetadata,
    pub room1: MeasurementStream,
    pub room2: MeasurementStream,
}

/// Read raw lines from a chamber export `.txt` path
pub fn read_export_lines(path: &Path) -> Result<Vec<String>> {
    let is_txt = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("txt"))
        .unwrap_or(false);
    if !is_txt {
        return Err(PipelineError::Format(format!(
            "expected a .txt export, got `{}`",
            path.display()
        )));
    }
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(String::from).collect())
}

/// Parse a complete device export
pub fn parse_export(lines: &[String]) -> Result<DeviceExport> {
    check_signature(lines)?;
    let (r1_metadata, r2_metadata) = parse_metadata(lines)?;
    let (room1, room2) = parse_streams(lines)?;
    Ok(DeviceExport {
        r1_metadata,
        r2_metadata,
        room1,
        room2,
    })
}

fn check_signature(lines: &[String]) -> Result<()> {
    let first = lines
        .first()
        .ok_or_else(|| PipelineError::Format("export is empty".to_string()))?;
    if !first.starts_with(DEVICE_SIGNATURE) {
        return Err(PipelineError::Format(format!(
            "export does not start with `{DEVICE_SIGNATURE}`"
        )));
    }
    Ok(())
}

/// Subject metadata sits on file lines 4-7: a key row and a value row per
/// room, keys offset one cell by the block label
fn parse_metadata(lines: &[String]) -> Result<(SubjectMetadata, SubjectMetadata)> {
    if lines.len() < 7 {
        return Err(PipelineError::Format(
            "export too short for the metadata block".to_string(),
        ));
    }
    let rows: Vec<Vec<&str>> = lines[3..7]
        .iter()
        .map(|l| l.trim().split('\t').collect())
        .collect();

    let r1 = SubjectMetadata::from_rows(&rows[0][1..], &rows[1]);
    let r2 = SubjectMetadata::from_rows(&rows[2][1..], &rows[3]);
    Ok((r1, r2))
}

fn parse_streams(lines: &[String]) -> Result<(MeasurementStream, MeasurementStream)> {
    let marker = lines
        .iter()
        .position(|l| l.starts_with(DATA_START_MARKER))
        .ok_or_else(|| {
            PipelineError::Format(format!("no `{DATA_START_MARKER}` section marker"))
        })?;

    // The line after the marker is the device's own header row; data follows it
    let data_start = (marker + 2).min(lines.len());
    let cells: Vec<Vec<&str>> = lines[data_start..]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.split('\t').map(str::trim).collect())
        .collect();
    let table = drop_empty_columns(cells);

    let expected = SETS.len() * 2 * LOGICAL_COLUMNS.len();
    let width = table.first().map(|r| r.len()).unwrap_or(expected);
    if width != expected {
        return Err(PipelineError::Format(format!(
            "expected {expected} data columns, found {width}"
        )));
    }

    let channels = room_channels();
    let mut room1 = MeasurementStream::new(channels.clone());
    let mut room2 = MeasurementStream::new(channels);

    for row in &table {
        if row.len() != expected {
            // Truncated trailing row; drop it rather than misalign columns
            continue;
        }
        let Some(timestamp) = consistent_timestamp(row)? else {
            continue;
        };
        room1.rows.push(record(row, 0, timestamp));
        room2.rows.push(record(row, 1, timestamp));
    }

    Ok((room1, room2))
}

/// Channel names of one room's stream: both sets' sensor columns
fn room_channels() -> Vec<String> {
    let mut names = Vec::new();
    for set in SETS {
        for col in &LOGICAL_COLUMNS[2..] {
            names.push(format!("{set}_{col}"));
        }
    }
    names
}

/// Flat cell index of a logical column for a (set, room) block
fn flat_index(set: usize, room: usize, col: usize) -> usize {
    (set * 2 + room) * LOGICAL_COLUMNS.len() + col
}

/// The row's timestamp, verified identical across all four (set, room) blocks
///
/// Returns Ok(None) when the agreed cells fail to parse (row dropped).
fn consistent_timestamp(row: &[&str]) -> Result<Option<NaiveDateTime>> {
    let date = row[flat_index(0, 0, 0)];
    let time = row[flat_index(0, 0, 1)];
    for set in 0..SETS.len() {
        for room in 0..2 {
            if row[flat_index(set, room, 0)] != date || row[flat_index(set, room, 1)] != time {
                return Err(PipelineError::Format(
                    "Date or Time columns do not match in some rows".to_string(),
                ));
            }
        }
    }
    Ok(NaiveDateTime::parse_from_str(&format!("{date} {time}"), DATETIME_FORMAT).ok())
}

fn record(row: &[&str], room: usize, timestamp: NaiveDateTime) -> MeasurementRecord {
    let mut values = Vec::with_capacity(2 * (LOGICAL_COLUMNS.len() - 2));
    for set in 0..SETS.len() {
        for col in 2..LOGICAL_COLUMNS.len() {
            let cell = row[flat_index(set, room, col)];
            values.push(cell.parse::<f64>().unwrap_or(f64::NAN));
        }
    }
    MeasurementRecord {
        timestamp,
        values,
        protocol: 0,
        relative_minutes: 0.0,
    }
}

/// Drop columns that are empty in every row (separator artifacts between the
/// export's section blocks)
fn drop_empty_columns(cells: Vec<Vec<&str>>) -> Vec<Vec<&str>> {
    let width = cells.iter().map(|r| r.len()).max().unwrap_or(0);
    let keep: Vec<bool> = (0..width)
        .map(|j| cells.iter().any(|row| row.get(j).map_or(false, |c| !c.is_empty())))
        .collect();

    cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .filter(|(j, _)| keep[*j])
                .map(|(_, c)| c)
                .collect()
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Build a minimal export: signature, metadata, marker and data rows with
    /// one value column pattern per (set, room) block
    fn export(rows: &[(&str, &str, [f64; 4])]) -> Vec<String> {
        let mut lines = vec![
            "OmniCal software v6.1 export".to_string(),
            "".to_string(),
            "Subject information".to_string(),
            "Room 1\tSubject ID\tComments".to_string(),
            "02LK\tvisit2".to_string(),
            "Room 2\tSubject ID\tComments".to_string(),
            "04HH\tvisit1".to_string(),
            "Room 1 Set 1".to_string(),
            vec!["Date\tTime"; 4].join("\t"),
        ];
        for (date, time, vo2) in rows {
            let mut cells: Vec<String> = Vec::new();
            for block in 0..4 {
                cells.push((*date).to_string());
                cells.push((*time).to_string());
                cells.push(format!("{}", vo2[block]));
                for _ in 3..LOGICAL_COLUMNS.len() {
                    cells.push("1.0".to_string());
                }
            }
            lines.push(cells.join("\t"));
        }
        lines
    }

    #[test]
    fn test_parses_metadata_per_room() {
        let parsed = parse_export(&export(&[("11/13/23", "08:00:00", [1.0, 2.0, 3.0, 4.0])]))
            .unwrap();
        assert_eq!(parsed.r1_metadata.get("Subject ID"), Some("02LK"));
        assert_eq!(parsed.r2_metadata.get("Subject ID"), Some("04HH"));
    }

    #[test]
    fn test_splits_rooms_and_reshapes_channels() {
        let parsed = parse_export(&export(&[("11/13/23", "08:00:00", [1.0, 2.0, 3.0, 4.0])]))
            .unwrap();

        assert_eq!(parsed.room1.channels.len(), 28);
        assert_eq!(parsed.room1.channels[0], "S1_VO2");
        assert_eq!(parsed.room1.channels[14], "S2_VO2");

        // Block order in the export is S1/R1, S1/R2, S2/R1, S2/R2
        assert_eq!(parsed.room1.rows[0].values[0], 1.0);
        assert_eq!(parsed.room2.rows[0].values[0], 2.0);
        assert_eq!(parsed.room1.rows[0].values[14], 3.0);
        assert_eq!(parsed.room2.rows[0].values[14], 4.0);
    }

    #[test]
    fn test_combines_date_and_time_cells() {
        let parsed = parse_export(&export(&[("11/13/23", "08:01:30", [0.0; 4])])).unwrap();
        assert_eq!(
            parsed.room1.rows[0].timestamp,
            NaiveDate::from_ymd_opt(2023, 11, 13)
                .unwrap()
                .and_hms_opt(8, 1, 30)
                .unwrap()
        );
    }

    #[test]
    fn test_inconsistent_time_cells_are_fatal() {
        let mut lines = export(&[("11/13/23", "08:00:00", [0.0; 4])]);
        // Corrupt the time cell of the last block
        let last = lines.last().unwrap().clone();
        let mut cells: Vec<&str> = last.split('\t').collect();
        let idx = 3 * LOGICAL_COLUMNS.len() + 1;
        cells[idx] = "09:00:00";
        let corrupted = cells.join("\t");
        *lines.last_mut().unwrap() = corrupted;

        let err = parse_export(&lines).unwrap_err();
        assert!(matches!(err, PipelineError::Format(_)));
    }

    #[test]
    fn test_wrong_signature_is_fatal() {
        let mut lines = export(&[]);
        lines[0] = "CSV export".to_string();
        assert!(matches!(
            parse_export(&lines).unwrap_err(),
            PipelineError::Format(_)
        ));
    }

    #[test]
    fn test_missing_marker_is_fatal() {
        let mut lines = export(&[]);
        lines.retain(|l| !l.starts_with(DATA_START_MARKER));
        assert!(matches!(
            parse_export(&lines).unwrap_err(),
            PipelineError::Format(_)
        ));
    }

    #[test]
    fn test_separator_columns_are_dropped() {
        let mut lines = export(&[("11/13/23", "08:00:00", [1.0, 2.0, 3.0, 4.0])]);
        // Insert an always-empty trailing column
        let patched = format!("{}\t", lines.last().unwrap());
        *lines.last_mut().unwrap() = patched;

        let parsed = parse_export(&lines).unwrap();
        assert_eq!(parsed.room1.rows.len(), 1);
    }

    #[test]
    fn test_unparsable_cell_becomes_nan() {
        let mut lines = export(&[("11/13/23", "08:00:00", [1.0; 4])]);
        let last = lines.last().unwrap().clone();
        let mut cells: Vec<&str> = last.split('\t').collect();
        cells[2] = "n/a"; // S1/R1 VO2
        let corrupted = cells.join("\t");
        *lines.last_mut().unwrap() = corrupted;

        let parsed = parse_export(&lines).unwrap();
        assert!(parsed.room1.rows[0].values[0].is_nan());
    }
}
