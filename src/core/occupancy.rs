//! Chamber occupancy detection
//!
//! An independent pass over the parsed notes, chronologically sorted. Entry
//! must be announced in one of the first two notes, exit in one of the last
//! two; anything else in the log mentioning these words (door openings for
//! meal delivery, nurse visits) must not move the window.

use crate::types::{ChamberOccupancy, NoteEvent};
use crate::OCCUPANCY_EDGE_NOTES;

/// Words announcing that a participant entered the chamber
const START_KEYWORDS: &[&str] = &["ind i kammer", "enter", "ind", "entry"];

/// Words announcing that a participant left the chamber
const END_KEYWORDS: &[&str] = &["ud", "exit", "out"];

/// Detect per-participant entry/exit times from the note log
///
/// Each window field commits at most once, first qualifying hit wins. Fields
/// stay absent when no note qualifies; the caller falls back to the stream's
/// own bounds.
pub fn detect_occupancy(notes: &[NoteEvent]) -> ChamberOccupancy {
    let mut sorted: Vec<&NoteEvent> = notes.iter().collect();
    sorted.sort_by_key(|n| n.timestamp);

    let head_end = OCCUPANCY_EDGE_NOTES.min(sorted.len());
    let tail_start = sorted.len().saturating_sub(OCCUPANCY_EDGE_NOTES);

    let mut occupancy = ChamberOccupancy::default();
    for (index, note) in sorted.iter().enumerate() {
        let text = note.text.to_lowercase();
        for &participant in note.scope().participants() {
            let window = occupancy.get_mut(participant);
            if window.start.is_none()
                && contains_any(&text, START_KEYWORDS)
                && index < head_end
            {
                window.start = Some(note.timestamp);
            } else if window.end.is_none()
                && contains_any(&text, END_KEYWORDS)
                && index >= tail_start
            {
                window.end = Some(note.timestamp);
            }
        }
    }
    occupancy
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

// =============================================================================
// TESTS
// =============================================================================
