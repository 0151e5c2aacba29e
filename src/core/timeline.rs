//! Timeline building and merging
//!
//! A participant's classified facts become a sorted change-point sequence;
//! merging walks stream and timeline once with a shared cursor, assigning the
//! protocol code in effect at each tick. The stream must already be
//! timestamp-ascending; the merge never reorders rows.

use crate::types::{ChangePoint, FactTable, MeasurementStream, Participant};
use crate::PROTOCOL_NORMAL;

/// Read one participant's facts as an ascending change-point timeline
///
/// No implicit end marker: each change point's state extends until the next
/// one supersedes it.
pub fn build_timeline(facts: &FactTable, participant: Participant) -> Vec<ChangePoint> {
    facts.change_points(participant)
}

/// Merge a change-point timeline onto a timestamp-ascending stream
///
/// Pure fold carrying (timeline cursor, current code): for each row, every
/// change point at an instant ≤ the row's timestamp is consumed in order and
/// the last consumed code is assigned. An empty timeline leaves every row at
/// 0; change points before the first row apply from row one.
pub fn apply_timeline(timeline: &[ChangePoint], stream: &mut MeasurementStream) {
    stream
        .rows
        .iter_mut()
        .fold((0usize, PROTOCOL_NORMAL), |(mut cursor, mut current), row| {
            while cursor < timeline.len() && timeline[cursor].at <= row.timestamp {
                current = timeline[cursor].code;
                cursor += 1;
            }
            row.protocol = current;
            (cursor, current)
        });
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MeasurementRecord;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 11, 13)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn stream(minutes: &[u32]) -> MeasurementStream {
        let mut s = MeasurementStream::new(vec!["VO2".to_string()]);
        for &m in minutes {
            s.rows.push(MeasurementRecord {
                timestamp: at(8, m),
                values: vec![0.3],
                protocol: 0,
                relative_minutes: 0.0,
            });
        }
        s
    }

    fn point(h: u32, m: u32, code: i64) -> ChangePoint {
        ChangePoint { at: at(h, m), code }
    }

    #[test]
    fn test_single_change_point_splits_stream() {
        let mut s = stream(&[0, 1, 2, 3, 4]);
        apply_timeline(&[point(8, 2, 1)], &mut s);

        let codes: Vec<i64> = s.rows.iter().map(|r| r.protocol).collect();
        assert_eq!(codes, vec![0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_empty_timeline_keeps_default() {
        let mut s = stream(&[0, 1, 2]);
        apply_timeline(&[], &mut s);
        assert!(s.rows.iter().all(|r| r.protocol == PROTOCOL_NORMAL));
    }

    #[test]
    fn test_change_point_before_first_row() {
        let mut s = stream(&[10, 11]);
        apply_timeline(&[point(7, 0, 2)], &mut s);
        assert!(s.rows.iter().all(|r| r.protocol == 2));
    }

    #[test]
    fn test_change_point_after_last_row() {
        let mut s = stream(&[0, 1]);
        apply_timeline(&[point(9, 0, 3)], &mut s);
        assert!(s.rows.iter().all(|r| r.protocol == 0));
    }

    #[test]
    fn test_multiple_transitions() {
        let mut s = stream(&[0, 1, 2, 3, 4, 5]);
        apply_timeline(&[point(8, 1, 1), point(8, 3, 0), point(8, 5, 4)], &mut s);

        let codes: Vec<i64> = s.rows.iter().map(|r| r.protocol).collect();
        assert_eq!(codes, vec![0, 1, 1, 0, 0, 4]);
    }

    #[test]
    fn test_change_points_between_rows_collapse() {
        // Both transitions fall inside one sampling gap; the later one is in
        // effect at the next tick
        let mut s = MeasurementStream::new(vec!["VO2".to_string()]);
        for &m in &[0u32, 10] {
            s.rows.push(MeasurementRecord {
                timestamp: at(8, m),
                values: vec![0.3],
                protocol: 0,
                relative_minutes: 0.0,
            });
        }
        apply_timeline(&[point(8, 2, 1), point(8, 5, 2)], &mut s);

        assert_eq!(s.rows[0].protocol, 0);
        assert_eq!(s.rows[1].protocol, 2);
    }

    #[test]
    fn test_build_timeline_is_sorted_and_deduplicated() {
        use crate::types::ProtocolFact;
        let mut facts = FactTable::new();
        for (m, code) in [(30, 1), (10, 2), (30, 0)] {
            facts.insert(ProtocolFact {
                participant: Participant::One,
                at: at(8, m),
                code,
            });
        }
        let timeline = build_timeline(&facts, Participant::One);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0], point(8, 10, 2));
        assert_eq!(timeline[1], point(8, 30, 0));
    }
}
