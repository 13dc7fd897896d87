//! Big-M bound derivation.
//!
//! All big-M constants in the formulations derive from one quantity: the
//! latest reachable end time of a care unit's roster, plus one because slot
//! value 0 is reserved to mean "not scheduled" in the offset time encoding.
//! Centralizing the derivation keeps every constraint family on the same
//! bound and makes tightening a one-line change.

use crate::models::CareUnitRoster;

/// `1 + max(start + duration)` over the roster's operators.
///
/// Offset time variables range over `[0, max_reachable_time]`; the value
/// doubles as the big-M constant deactivating an inequality when its
/// controlling binary is 0. An empty roster yields 1 (only the reserved
/// "not scheduled" value is reachable).
pub fn max_reachable_time(roster: &CareUnitRoster) -> i64 {
    roster.values().map(|o| o.end()).max().unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Operator;

    #[test]
    fn test_latest_end_plus_one() {
        let mut roster = CareUnitRoster::new();
        roster.insert("op00".into(), Operator::new(0, 8));
        roster.insert("op01".into(), Operator::new(6, 6)); // ends at 12
        assert_eq!(max_reachable_time(&roster), 13);
    }

    #[test]
    fn test_empty_roster() {
        assert_eq!(max_reachable_time(&CareUnitRoster::new()), 1);
    }
}
