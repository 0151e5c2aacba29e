//! Note event classifier
//!
//! Turns note events into protocol facts via an ordered keyword-rule table,
//! and detects the one-shot clock drift marker. The table mixes English and
//! Danish because that is what the chamber operators write.
//!
//! Rules are evaluated in declared order against every event; every match
//! emits a fact per participant in scope. Collisions on the same
//! (participant, instant) key resolve last-write-wins, so a later rule in the
//! table overrides an earlier one.

use chrono::{NaiveDateTime, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{DriftOffset, FactTable, KeywordRule, NoteEvent, ProtocolFact};
use crate::{
    PROTOCOL_ACTIVE, PROTOCOL_EATING, PROTOCOL_NORMAL, PROTOCOL_REE, PROTOCOL_SLEEPING,
};

lazy_static! {
    // =========================================================================
    // Embedded clock time: H:MM or HH:MM, first occurrence only
    // =========================================================================
    static ref RE_EMBEDDED_TIME: Regex = Regex::new(
        r"([01]?[0-9]|2[0-3]):[0-5][0-9]"
    ).unwrap();

    // =========================================================================
    // Drift marker: a note that is nothing but a clock time (HH:MM or HH:MM:SS)
    // =========================================================================
    static ref RE_DRIFT_MARKER: Regex = Regex::new(
        r"^\d{2}:\d{2}(:\d{2})?$"
    ).unwrap();
}

/// The classification rule table, in evaluation order
///
/// Extend or reorder to suit the study protocol; a later rule wins same-instant
/// collisions. Keywords are matched case-insensitively as substrings.
pub const RULES: &[KeywordRule] = &[
    KeywordRule {
        category: "sleeping",
        groups: &[&[
            "seng", "sleeping", "bed", "sove", "soeve", "godnat", "night", "sleep",
        ]],
        code: PROTOCOL_SLEEPING,
    },
    KeywordRule {
        category: "eating",
        groups: &[
            &["start", "begin", "began"],
            &[
                "maaltid",
                "måltid",
                "eat",
                "meal",
                "food",
                "spis",
                "maal",
                "måd",
                "mad",
                "frokost",
                "morgenmad",
                "middag",
                "snack",
                "aftensmad",
            ],
        ],
        code: PROTOCOL_EATING,
    },
    KeywordRule {
        category: "stop_sleeping",
        groups: &[&[
            "vaagen", "vågen", "vaekke", "væk", "wake", "woken", "vaagnet",
        ]],
        code: PROTOCOL_NORMAL,
    },
    KeywordRule {
        category: "stop_anything",
        groups: &[&["faerdig", "færdig", "stop", "end ", "finished", "slut"]],
        code: PROTOCOL_NORMAL,
    },
    KeywordRule {
        category: "activity",
        groups: &[
            &["start", "begin", "began"],
            &["step", "exercise", "physical activity", "active", "motion", "aktiv"],
        ],
        code: PROTOCOL_ACTIVE,
    },
    KeywordRule {
        category: "ree_start",
        groups: &[
            &["start", "begin", "began"],
            &["REE", "BEE", "BMR", "RMR", "RER"],
        ],
        code: PROTOCOL_REE,
    },
];

/// Result of classifying a note sequence
#[derive(Debug, Default)]
pub struct Classification {
    /// Collected facts, keyed (participant, instant), last write wins
    pub facts: FactTable,
    /// Clock drift, when the first note was an unmatched bare clock time
    pub drift: Option<DriftOffset>,
}

/// Classify note events in file order
pub fn classify(notes: &[NoteEvent]) -> Classification {
    let mut result = Classification::default();

    for (index, note) in notes.iter().enumerate() {
        let mut matched = false;
        for rule in RULES {
            if !rule.matches(&note.text) {
                continue;
            }
            matched = true;
            let at = effective_time(note);
            for &participant in note.scope().participants() {
                result.facts.insert(ProtocolFact {
                    participant,
                    at,
                    code: rule.code,
                });
            }
        }

        // Only the very first logged note may carry a clock-sync marker, and
        // only when it classified as nothing else
        if !matched && index == 0 {
            if let Some(marked) = parse_drift_marker(note) {
                let offset = DriftOffset(marked - note.timestamp);
                log::info!("clock drift marker in first note: {}", offset);
                result.drift = Some(offset);
            }
        }
    }

    result
}

/// Effective time of an event: the first clock time embedded in its text,
/// combined with the event's own date; the event timestamp otherwise
fn effective_time(note: &NoteEvent) -> NaiveDateTime {
    let Some(found) = RE_EMBEDDED_TIME.find(&note.text) else {
        return note.timestamp;
    };
    match NaiveTime::parse_from_str(found.as_str(), "%H:%M") {
        Ok(time) => note.timestamp.date().and_time(time),
        Err(_) => note.timestamp,
    }
}

/// The marker's clock time on the note's own date, when the whole text is a
/// bare clock time
fn parse_drift_marker(note: &NoteEvent) -> Option<NaiveDateTime> {
    let text = note.text.trim();
    if !RE_DRIFT_MARKER.is_match(text) {
        return None;
    }
    let time = NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()?;
    Some(note.timestamp.date().and_time(time))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Participant;
    use chrono::{Duration, NaiveDate};

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 11, 13)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn note(h: u32, m: u32, text: &str) -> NoteEvent {
        NoteEvent::new(at(h, m, 0), text)
    }

    #[test]
    fn test_eating_fact_for_prefixed_participant() {
        let result = classify(&[note(8, 0, "1 start eating breakfast")]);

        let points = result.facts.change_points(Participant::One);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].code, PROTOCOL_EATING);
        assert_eq!(points[0].at, at(8, 0, 0));
        assert!(result.facts.change_points(Participant::Two).is_empty());
    }

    #[test]
    fn test_unprefixed_note_fans_out_to_both() {
        let result = classify(&[note(23, 40, "sleep 23:45")]);

        for participant in Participant::ALL {
            let points = result.facts.change_points(participant);
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].code, PROTOCOL_SLEEPING);
            // Embedded time overrides the event timestamp
            assert_eq!(points[0].at, at(23, 45, 0));
        }
    }

    #[test]
    fn test_drift_from_unmatched_first_note() {
        let result = classify(&[
            NoteEvent::new(at(8, 0, 0), "08:02:15"),
            note(9, 0, "1 going to bed"),
        ]);

        assert_eq!(result.drift, Some(DriftOffset(Duration::seconds(135))));
        // Classification continued past the marker
        assert_eq!(result.facts.len(Participant::One), 1);
    }

    #[test]
    fn test_drift_only_checked_on_first_note() {
        let result = classify(&[note(8, 0, "1 start breakfast meal"), note(9, 0, "09:05")]);
        assert_eq!(result.drift, None);
    }

    #[test]
    fn test_matched_first_note_never_yields_drift() {
        // "23:45" alone would be a marker, but the sleep rule matches first
        let result = classify(&[note(23, 40, "sleep 23:45")]);
        assert_eq!(result.drift, None);
    }

    #[test]
    fn test_later_rule_wins_same_instant() {
        // "stop sleeping" hits both the sleeping rule (code 1) and the
        // stop_anything rule (code 0); the later rule's write survives
        let result = classify(&[note(7, 0, "2 stop sleeping")]);

        let points = result.facts.change_points(Participant::Two);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].code, PROTOCOL_NORMAL);
    }

    #[test]
    fn test_multi_group_rule_requires_both_groups() {
        let result = classify(&[note(12, 0, "1 frokost delivered")]);
        // "frokost" alone misses the start/begin group
        assert!(result.facts.is_empty());
    }

    #[test]
    fn test_ree_rule_case_insensitive() {
        let result = classify(&[note(6, 30, "1 start REE measurement")]);
        let points = result.facts.change_points(Participant::One);
        assert_eq!(points[0].code, PROTOCOL_REE);
    }

    #[test]
    fn test_unparsable_embedded_time_falls_back() {
        // No H:MM pattern in range; event timestamp is used
        let result = classify(&[note(10, 0, "1 started snack at noon")]);
        let points = result.facts.change_points(Participant::One);
        assert_eq!(points[0].at, at(10, 0, 0));
    }

    #[test]
    fn test_drift_marker_without_seconds() {
        let result = classify(&[NoteEvent::new(at(8, 0, 0), "08:03")]);
        assert_eq!(result.drift, Some(DriftOffset(Duration::seconds(180))));
    }

    #[test]
    fn test_negative_drift() {
        let result = classify(&[NoteEvent::new(at(8, 5, 0), "08:02")]);
        assert_eq!(result.drift, Some(DriftOffset(Duration::seconds(-180))));
    }
}
