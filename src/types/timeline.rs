//! Protocol facts, timelines and the drift offset
//!
//! Classified note events become protocol facts; per participant the facts
//! form a piecewise-constant timeline read as a sorted sequence of change
//! points. Facts are stored in an ordered map keyed by instant so that a
//! later-evaluated rule writing to the same instant overwrites the earlier
//! one (last-write-wins).

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::Participant;

/// One classified note event: a participant enters a protocol state at an
/// instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtocolFact {
    pub participant: Participant,
    /// Effective time: the note's timestamp, or the clock time embedded in
    /// its text
    pub at: NaiveDateTime,
    pub code: i64,
}

/// A protocol transition on a single participant's timeline
///
/// The state entered at `at` extends until superseded by the next change
/// point; there is no implicit end marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangePoint {
    pub at: NaiveDateTime,
    pub code: i64,
}

/// Per-participant fact storage with last-write-wins collision handling
#[derive(Debug, Default)]
pub struct FactTable {
    maps: [BTreeMap<NaiveDateTime, i64>; 2],
}

impl FactTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fact; a fact already present at the same (participant,
    /// instant) key is overwritten
    pub fn insert(&mut self, fact: ProtocolFact) {
        self.maps[fact.participant.index()].insert(fact.at, fact.code);
    }

    /// Number of facts stored for one participant
    pub fn len(&self, participant: Participant) -> usize {
        self.maps[participant.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.iter().all(|m| m.is_empty())
    }

    /// Read one participant's facts as an ascending change-point sequence
    pub fn change_points(&self, participant: Participant) -> Vec<ChangePoint> {
        self.maps[participant.index()]
            .iter()
            .map(|(&at, &code)| ChangePoint { at, code })
            .collect()
    }

    /// Shift every stored fact by a drift offset
    pub fn shift(&mut self, offset: DriftOffset) {
        if offset.is_zero() {
            return;
        }
        for map in &mut self.maps {
            let shifted: BTreeMap<NaiveDateTime, i64> =
                map.iter().map(|(&at, &code)| (at + offset.0, code)).collect();
            *map = shifted;
        }
    }
}

/// A one-shot clock offset between the note log and the measurement device
///
/// Detected at most once per run, from the first note event only. Positive
/// means the note log's clock runs behind the true time written in the
/// marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftOffset(pub Duration);

impl DriftOffset {
    pub fn zero() -> Self {
        DriftOffset(Duration::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl std::fmt::Display for DriftOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0.num_seconds();
        let sign = if secs < 0 { '-' } else { '+' };
        let abs = secs.abs();
        write!(f, "{}{}m{:02}s", sign, abs / 60, abs % 60)
    }
}

// =============================================================================
// TESTS
// =============================================================================
