//! Calorix: protocol annotation and temporal alignment for two-chamber
//! respirometry data
//!
//! Pipeline: note log → classifier → drift correction → timeline merge,
//! with chamber occupancy detection and protocol segment extraction on top.

pub mod core;
pub mod types;

// =============================================================================
// PROTOCOL CODE VOCABULARY [stable]
// =============================================================================

/// No annotated activity in effect
pub const PROTOCOL_NORMAL: i64 = 0;

/// Participant is sleeping
pub const PROTOCOL_SLEEPING: i64 = 1;

/// Participant is eating a meal or snack
pub const PROTOCOL_EATING: i64 = 2;

/// Participant performs physical activity (step test, exercise)
pub const PROTOCOL_ACTIVE: i64 = 3;

/// Resting energy expenditure measurement in progress
pub const PROTOCOL_REE: i64 = 4;

// =============================================================================
// DEVICE EXPORT FORMAT
// =============================================================================

/// Leading signature every export of the chamber software starts with
pub const DEVICE_SIGNATURE: &str = "OmniCal software";

/// Marker line directly above the first tabular data row
pub const DATA_START_MARKER: &str = "Room 1 Set 1";

/// Date + Time cell combination format used by both the note log and the
/// measurement export
pub const DATETIME_FORMAT: &str = "%m/%d/%y %H:%M:%S";

/// Preamble lines before the note log's header row
pub const NOTE_PREAMBLE_LINES: usize = 2;

// =============================================================================
// HEURISTIC WINDOWS
// =============================================================================

/// An occupancy start/end note only counts when it sits among this many
/// chronologically first/last notes
pub const OCCUPANCY_EDGE_NOTES: usize = 2;

/// Default mean-relative-delta threshold (percent) for the duplicate-sensor
/// discrepancy check
pub const DISCREPANCY_THRESHOLD_PCT: f64 = 0.05;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
