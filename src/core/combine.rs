//! Duplicate-sensor combination and quality checks
//!
//! Each chamber is sampled by two sensor sets. Analysis usually wants one
//! value per channel, so the S1/S2 pairs are collapsed with a configurable
//! method; the discrepancy check reports how far the two sets disagree before
//! anything is collapsed.

use serde::{Deserialize, Serialize};

use crate::types::{MeasurementStream, PipelineError, Result};

/// How an S1/S2 channel pair is collapsed into one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineMethod {
    Mean,
    Median,
    S1,
    S2,
    Min,
    Max,
}

impl CombineMethod {
    fn apply(&self, s1: f64, s2: f64) -> f64 {
        match self {
            // The median of two samples is their mean
            CombineMethod::Mean | CombineMethod::Median => (s1 + s2) / 2.0,
            CombineMethod::S1 => s1,
            CombineMethod::S2 => s2,
            CombineMethod::Min => s1.min(s2),
            CombineMethod::Max => s1.max(s2),
        }
    }
}

impl std::str::FromStr for CombineMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(CombineMethod::Mean),
            "median" => Ok(CombineMethod::Median),
            "s1" => Ok(CombineMethod::S1),
            "s2" => Ok(CombineMethod::S2),
            "min" => Ok(CombineMethod::Min),
            "max" => Ok(CombineMethod::Max),
            other => Err(PipelineError::Configuration(format!(
                "method `{other}` is not supported; use mean, median, s1, s2, min or max"
            ))),
        }
    }
}

impl std::fmt::Display for CombineMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CombineMethod::Mean => "mean",
            CombineMethod::Median => "median",
            CombineMethod::S1 => "s1",
            CombineMethod::S2 => "s2",
            CombineMethod::Min => "min",
            CombineMethod::Max => "max",
        };
        write!(f, "{name}")
    }
}

/// Channel pairs (S1 index, S2 index, plain name) of a stream
fn paired_channels(stream: &MeasurementStream) -> Vec<(usize, usize, String)> {
    let mut pairs = Vec::new();
    for (i, channel) in stream.channels.iter().enumerate() {
        if let Some(name) = channel.strip_prefix("S1_") {
            if let Some(j) = stream.channel_index(&format!("S2_{name}")) {
                pairs.push((i, j, name.to_string()));
            }
        }
    }
    pairs
}

/// Collapse every S1/S2 channel pair with `method`
///
/// Channels without a set qualifier are carried over unchanged; the set
/// prefix is dropped from the combined channel names.
pub fn combine_sets(stream: &MeasurementStream, method: CombineMethod) -> MeasurementStream {
    let pairs = paired_channels(stream);
    let paired: Vec<usize> = pairs.iter().flat_map(|&(i, j, _)| [i, j]).collect();
    let loose: Vec<usize> = (0..stream.channels.len())
        .filter(|i| !paired.contains(i))
        .collect();

    let mut channels: Vec<String> = loose.iter().map(|&i| stream.channels[i].clone()).collect();
    channels.extend(pairs.iter().map(|(_, _, name)| name.clone()));

    let mut combined = MeasurementStream::new(channels);
    combined.rows = stream
        .rows
        .iter()
        .map(|row| {
            let mut values: Vec<f64> = loose.iter().map(|&i| row.values[i]).collect();
            values.extend(
                pairs
                    .iter()
                    .map(|&(i, j, _)| method.apply(row.values[i], row.values[j])),
            );
            let mut out = row.clone();
            out.values = values;
            out
        })
        .collect();
    combined
}

/// Environmental channels excluded from the discrepancy check
const ENV_CHANNELS: &[&str] = &[
    "Pressure Ambient",
    "Temperature",
    "Relative Humidity",
    "Activity Monitor",
];

/// Per-channel disagreement between the two sensor sets
#[derive(Debug, Clone, Serialize)]
pub struct ChannelDiscrepancy {
    pub channel: String,
    /// Mean of (s1 - s2) / pair mean over all rows
    pub mean_relative_delta: f64,
    pub exceeds_threshold: bool,
}

/// Compare every non-environmental S1/S2 pair; `threshold_pct` is in percent
///
/// Diagnostic only: results are logged and returned, processing never stops.
pub fn check_discrepancies(
    stream: &MeasurementStream,
    threshold_pct: f64,
    individual: bool,
) -> Vec<ChannelDiscrepancy> {
    let mut report = Vec::new();
    for (i, j, name) in paired_channels(stream) {
        if ENV_CHANNELS.iter().any(|env| name.contains(env)) {
            continue;
        }

        let deltas: Vec<f64> = stream
            .rows
            .iter()
            .map(|row| {
                let (s1, s2) = (row.values[i], row.values[j]);
                (s1 - s2) / ((s1 + s2) / 2.0)
            })
            .collect();
        let mean = deltas.iter().sum::<f64>() / deltas.len().max(1) as f64;
        let exceeds = mean.abs() > threshold_pct / 100.0;

        if exceeds {
            log::warn!(
                "{name}: mean relative delta {mean:.4} exceeds the {threshold_pct}% threshold"
            );
        } else {
            log::info!(
                "{name}: mean relative delta {mean:.4} within the {threshold_pct}% threshold"
            );
        }
        if individual {
            for (row, delta) in deltas.iter().enumerate() {
                if delta.abs() > threshold_pct / 100.0 {
                    log::warn!("row {}: {name} sets differ by {delta:.4}", row + 1);
                }
            }
        }

        report.push(ChannelDiscrepancy {
            channel: name,
            mean_relative_delta: mean,
            exceeds_threshold: exceeds,
        });
    }
    report
}

// =============================================================================
// TESTS
// =============================================================================
