//! Protocol segment extraction
//!
//! Locates the Nth occurrence of a protocol state in an annotated stream via
//! rising/falling edges of the membership mask, pads the span, crops and
//! validates the crop. Padding and contamination problems are warnings;
//! asking for an occurrence that does not exist is an error.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::types::{MeasurementStream, PipelineError, Result};
use crate::{
    PROTOCOL_ACTIVE, PROTOCOL_EATING, PROTOCOL_NORMAL, PROTOCOL_REE, PROTOCOL_SLEEPING,
};

/// Map a protocol name to its code
pub fn protocol_code(name: &str) -> Result<i64> {
    match name {
        "normal" => Ok(PROTOCOL_NORMAL),
        "sleep" => Ok(PROTOCOL_SLEEPING),
        "eat" => Ok(PROTOCOL_EATING),
        "active" => Ok(PROTOCOL_ACTIVE),
        "ree" => Ok(PROTOCOL_REE),
        other => Err(PipelineError::Configuration(format!(
            "unknown protocol `{other}`; use normal, sleep, eat, active or ree"
        ))),
    }
}

/// Non-fatal problems found while cropping a segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SegmentWarning {
    /// Padded start fell before the stream; clamped to its first tick
    StartClamped {
        requested: NaiveDateTime,
        actual: NaiveDateTime,
    },
    /// Padded end fell after the stream; clamped to its last tick
    EndClamped {
        requested: NaiveDateTime,
        actual: NaiveDateTime,
    },
    /// Padding pulled rows of other protocol states into the crop
    Contaminated { foreign_codes: Vec<i64> },
}

impl std::fmt::Display for SegmentWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentWarning::StartClamped { requested, actual } => write!(
                f,
                "start {requested} is earlier than the earliest data point; using {actual}"
            ),
            SegmentWarning::EndClamped { requested, actual } => write!(
                f,
                "end {requested} is later than the latest data point; using {actual}"
            ),
            SegmentWarning::Contaminated { foreign_codes } => write!(
                f,
                "crop includes other protocol states {foreign_codes:?}; \
                 be aware of that for your analysis"
            ),
        }
    }
}

/// A cropped protocol segment plus everything noticed while cropping
#[derive(Debug, Clone, Serialize)]
pub struct SegmentExtract {
    pub stream: MeasurementStream,
    /// Crop bounds actually applied (after padding and clamping)
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub warnings: Vec<SegmentWarning>,
}

/// Extract the `occurrence`-th span of `target_code` from an annotated stream
///
/// `occurrence` is 1-based; padding is in minutes and may be fractional.
/// Relative time is recomputed from the crop's first tick.
pub fn extract_segment(
    stream: &MeasurementStream,
    target_code: i64,
    occurrence: usize,
    pad_before_min: f64,
    pad_after_min: f64,
) -> Result<SegmentExtract> {
    if occurrence == 0 {
        return Err(PipelineError::Configuration(
            "occurrence is 1-based; use 1 for the first span".to_string(),
        ));
    }

    let mask: Vec<bool> = stream.rows.iter().map(|r| r.protocol == target_code).collect();
    let rising: Vec<usize> = (0..mask.len())
        .filter(|&i| mask[i] && (i == 0 || !mask[i - 1]))
        .collect();
    let falling: Vec<usize> = (0..mask.len())
        .filter(|&i| !mask[i] && i > 0 && mask[i - 1])
        .collect();

    if rising.len() < occurrence {
        return Err(PipelineError::SegmentNotFound {
            code: target_code,
            found: rising.len(),
            requested: occurrence,
        });
    }

    // rising is non-empty here, so the stream has rows and bounds
    let earliest = stream.min_timestamp().ok_or_else(|| {
        PipelineError::MissingData("stream has no rows".to_string())
    })?;
    let latest = stream.max_timestamp().ok_or_else(|| {
        PipelineError::MissingData("stream has no rows".to_string())
    })?;

    let raw_start = stream.rows[rising[occurrence - 1]].timestamp;
    // The matching falling edge may not exist; the span then runs to the end
    let raw_end = falling
        .get(occurrence - 1)
        .map(|&i| stream.rows[i].timestamp);

    let mut warnings = Vec::new();

    let mut start = raw_start - minutes(pad_before_min);
    if start < earliest {
        warnings.push(SegmentWarning::StartClamped {
            requested: start,
            actual: earliest,
        });
        start = earliest;
    }

    let mut end = match raw_end {
        Some(e) => e + minutes(pad_after_min),
        None => latest,
    };
    if end > latest {
        warnings.push(SegmentWarning::EndClamped {
            requested: end,
            actual: latest,
        });
        end = latest;
    }

    let mut cropped = stream.clone();
    cropped.crop(Some(start), Some(end));

    let mut foreign: Vec<i64> = cropped
        .rows
        .iter()
        .map(|r| r.protocol)
        .filter(|&c| c != PROTOCOL_NORMAL && c != target_code)
        .collect();
    foreign.sort_unstable();
    foreign.dedup();
    if !foreign.is_empty() {
        warnings.push(SegmentWarning::Contaminated {
            foreign_codes: foreign,
        });
    }

    cropped.add_relative_time(None);

    for warning in &warnings {
        log::warn!("{warning}");
    }

    Ok(SegmentExtract {
        stream: cropped,
        start,
        end,
        warnings,
    })
}

fn minutes(m: f64) -> Duration {
    Duration::milliseconds((m * 60_000.0).round() as i64)
}

// =============================================================================
// TESTS
// =============================================================================
