//! Note log model
//!
//! A note event is one operator log line: a timestamp and free text. The text
//! prefix decides which chamber the note applies to ("1" or "2"; anything
//! else addresses both participants).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One of the two chamber occupants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Participant {
    One,
    Two,
}

impl Participant {
    /// Both participants, in chamber order
    pub const ALL: [Participant; 2] = [Participant::One, Participant::Two];

    /// Zero-based array index for per-participant storage
    pub fn index(&self) -> usize {
        match self {
            Participant::One => 0,
            Participant::Two => 1,
        }
    }

    /// Chamber number as written in the note log
    pub fn number(&self) -> u8 {
        match self {
            Participant::One => 1,
            Participant::Two => 2,
        }
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Which participants a note event addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantScope {
    Room1,
    Room2,
    Both,
}

impl ParticipantScope {
    /// Participants covered by this scope
    pub fn participants(&self) -> &'static [Participant] {
        match self {
            ParticipantScope::Room1 => &[Participant::One],
            ParticipantScope::Room2 => &[Participant::Two],
            ParticipantScope::Both => &Participant::ALL,
        }
    }
}

/// A single timestamped operator note
///
/// Ordering of a parsed sequence is the log's row order, which is not
/// guaranteed chronological.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Timestamp combined from the log's Date and Time cells
    pub timestamp: NaiveDateTime,
    /// The Comment cell, surrounding whitespace removed
    pub text: String,
}

impl NoteEvent {
    pub fn new(timestamp: NaiveDateTime, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }

    /// Determine participant scope from the text prefix
    pub fn scope(&self) -> ParticipantScope {
        if self.text.starts_with('1') {
            ParticipantScope::Room1
        } else if self.text.starts_with('2') {
            ParticipantScope::Room2
        } else {
            ParticipantScope::Both
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 11, 13)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_prefix_selects_participant() {
        assert_eq!(
            NoteEvent::new(ts(), "1 start eating").scope(),
            ParticipantScope::Room1
        );
        assert_eq!(
            NoteEvent::new(ts(), "2 going to bed").scope(),
            ParticipantScope::Room2
        );
    }

    #[test]
    fn test_no_prefix_addresses_both() {
        let scope = NoteEvent::new(ts(), "lights out").scope();
        assert_eq!(scope, ParticipantScope::Both);
        assert_eq!(scope.participants(), &Participant::ALL);
    }

    #[test]
    fn test_scope_is_prefix_only() {
        // A chamber number later in the text does not narrow the scope
        let scope = NoteEvent::new(ts(), "meal delivered to 2").scope();
        assert_eq!(scope, ParticipantScope::Both);
    }
}
