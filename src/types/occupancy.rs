//! Chamber occupancy windows

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::Participant;

/// Detected entry/exit times of one participant
///
/// Each field commits at most once; an absent field means no qualifying note
/// was found and the caller falls back to the stream's own bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OccupancyWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl OccupancyWindow {
    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Occupancy windows for both chambers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChamberOccupancy {
    windows: [OccupancyWindow; 2],
}

impl ChamberOccupancy {
    pub fn get(&self, participant: Participant) -> OccupancyWindow {
        self.windows[participant.index()]
    }

    pub fn get_mut(&mut self, participant: Participant) -> &mut OccupancyWindow {
        &mut self.windows[participant.index()]
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_windows_are_empty() {
        let occupancy = ChamberOccupancy::default();
        assert!(occupancy.get(Participant::One).is_empty());
        assert!(occupancy.get(Participant::Two).is_empty());
    }

    #[test]
    fn test_windows_are_per_participant() {
        let mut occupancy = ChamberOccupancy::default();
        occupancy.get_mut(Participant::One).start = NaiveDate::from_ymd_opt(2023, 11, 13)
            .unwrap()
            .and_hms_opt(9, 0, 0);

        assert!(occupancy.get(Participant::One).start.is_some());
        assert!(!occupancy.get(Participant::One).is_complete());
        assert!(occupancy.get(Participant::Two).is_empty());
    }
}
