//! Operator and roster models.
//!
//! An operator is a staffed resource active during one contiguous slot
//! interval of a day. Operators are grouped into care units; a day's roster
//! maps care unit name → operator name → [`Operator`], mirroring the
//! `days` section of the instance document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Operators of one care unit on one day, keyed by operator name.
pub type CareUnitRoster = BTreeMap<String, Operator>;

/// Roster of one day: care unit name → operators.
pub type DayRoster = BTreeMap<String, CareUnitRoster>;

/// A staffed resource active during `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// First active time slot (non-negative).
    pub start: i64,
    /// Number of active slots. Positive in any valid instance.
    pub duration: i64,
}

impl Operator {
    /// Creates a new operator shift.
    pub fn new(start: i64, duration: i64) -> Self {
        Self { start, duration }
    }

    /// First slot after the active interval.
    #[inline]
    pub fn end(&self) -> i64 {
        self.start + self.duration
    }

    /// Whether `[time, time + duration)` lies fully inside the active interval.
    pub fn covers(&self, time: i64, duration: i64) -> bool {
        time >= self.start && time + duration <= self.end()
    }
}

/// Total operator capacity of a care unit roster (sum of shift durations).
pub fn total_capacity(roster: &CareUnitRoster) -> i64 {
    roster.values().map(|o| o.duration).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_end() {
        let op = Operator::new(2, 6);
        assert_eq!(op.end(), 8);
    }

    #[test]
    fn test_operator_covers() {
        let op = Operator::new(2, 6); // active [2, 8)
        assert!(op.covers(2, 6));
        assert!(op.covers(4, 4));
        assert!(!op.covers(1, 3)); // starts too early
        assert!(!op.covers(6, 3)); // ends too late
    }

    #[test]
    fn test_total_capacity() {
        let mut roster = CareUnitRoster::new();
        roster.insert("op00".into(), Operator::new(0, 8));
        roster.insert("op01".into(), Operator::new(4, 4));
        assert_eq!(total_capacity(&roster), 12);
    }

    #[test]
    fn test_empty_roster_capacity() {
        assert_eq!(total_capacity(&CareUnitRoster::new()), 0);
    }
}
