//! Measurement stream model
//!
//! One stream per chamber: a row per sampling tick carrying the sensor
//! channel values, the merged protocol code and the relative time within the
//! analysis window. Rows are kept in file order; the annotation merge relies
//! on the caller keeping them timestamp-ascending and never reorders them.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One sampling tick of a chamber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub timestamp: NaiveDateTime,
    /// Sensor channel values, parallel to the stream's channel names.
    /// Unparsable cells are carried as NaN rather than dropping the tick.
    pub values: Vec<f64>,
    /// Protocol code in effect at this tick; 0 until a change point applies
    pub protocol: i64,
    /// Minutes since the analysis window start (negative before it)
    pub relative_minutes: f64,
}

/// A chamber's measurement series plus its channel naming
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementStream {
    /// Channel column names, shared by every row
    pub channels: Vec<String>,
    pub rows: Vec<MeasurementRecord>,
}

impl MeasurementStream {
    pub fn new(channels: Vec<String>) -> Self {
        Self {
            channels,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a channel by name
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == name)
    }

    /// Earliest timestamp in the stream
    pub fn min_timestamp(&self) -> Option<NaiveDateTime> {
        self.rows.iter().map(|r| r.timestamp).min()
    }

    /// Latest timestamp in the stream
    pub fn max_timestamp(&self) -> Option<NaiveDateTime> {
        self.rows.iter().map(|r| r.timestamp).max()
    }

    /// Shift every row's timestamp by `offset`
    pub fn shift_timestamps(&mut self, offset: Duration) {
        if offset.is_zero() {
            return;
        }
        for row in &mut self.rows {
            row.timestamp += offset;
        }
    }

    /// Keep only rows with `start <= timestamp <= end`; an absent bound is
    /// unbounded on that side
    pub fn crop(&mut self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) {
        self.rows.retain(|row| {
            start.map_or(true, |s| row.timestamp >= s)
                && end.map_or(true, |e| row.timestamp <= e)
        });
    }

    /// Recompute `relative_minutes` from `origin`, or from the first row when
    /// no origin is given
    pub fn add_relative_time(&mut self, origin: Option<NaiveDateTime>) {
        let origin = match origin.or_else(|| self.rows.first().map(|r| r.timestamp)) {
            Some(o) => o,
            None => return,
        };
        for row in &mut self.rows {
            let delta = row.timestamp - origin;
            row.relative_minutes = delta.num_milliseconds() as f64 / 60_000.0;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
