//! Drift correction
//!
//! A detected clock offset is applied once, before any merge: to every
//! collected protocol fact and to every timestamp of both measurement
//! streams. The merge assumes both series share one clock.

use crate::types::{DriftOffset, FactTable, MeasurementStream};

/// Apply a detected drift offset to the facts and to whole streams
///
/// An absent or zero offset leaves everything untouched.
pub fn apply_drift(
    offset: Option<DriftOffset>,
    facts: &mut FactTable,
    streams: &mut [&mut MeasurementStream],
) {
    let Some(offset) = offset else {
        return;
    };
    if offset.is_zero() {
        return;
    }
    log::info!("applying clock drift correction of {}", offset);
    facts.shift(offset);
    for stream in streams.iter_mut() {
        stream.shift_timestamps(offset.0);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MeasurementRecord, Participant, ProtocolFact};
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 11, 13)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn one_row_stream(h: u32, m: u32) -> MeasurementStream {
        let mut stream = MeasurementStream::new(vec!["VO2".to_string()]);
        stream.rows.push(MeasurementRecord {
            timestamp: at(h, m),
            values: vec![0.3],
            protocol: 0,
            relative_minutes: 0.0,
        });
        stream
    }

    #[test]
    fn test_offset_shifts_facts_and_both_streams() {
        let mut facts = FactTable::new();
        facts.insert(ProtocolFact {
            participant: Participant::One,
            at: at(8, 0),
            code: 1,
        });
        let mut room1 = one_row_stream(8, 0);
        let mut room2 = one_row_stream(9, 0);

        apply_drift(
            Some(DriftOffset(Duration::minutes(2))),
            &mut facts,
            &mut [&mut room1, &mut room2],
        );

        assert_eq!(facts.change_points(Participant::One)[0].at, at(8, 2));
        assert_eq!(room1.rows[0].timestamp, at(8, 2));
        assert_eq!(room2.rows[0].timestamp, at(9, 2));
    }

    #[test]
    fn test_absent_offset_is_noop() {
        let mut facts = FactTable::new();
        let mut room1 = one_row_stream(8, 0);
        apply_drift(None, &mut facts, &mut [&mut room1]);
        assert_eq!(room1.rows[0].timestamp, at(8, 0));
    }

    #[test]
    fn test_zero_offset_is_noop() {
        let mut facts = FactTable::new();
        let mut room1 = one_row_stream(8, 0);
        apply_drift(Some(DriftOffset::zero()), &mut facts, &mut [&mut room1]);
        assert_eq!(room1.rows[0].timestamp, at(8, 0));
    }
}
