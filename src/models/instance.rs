//! Problem instance model.
//!
//! An [`Instance`] is the immutable input of every solve: the service
//! catalogue, the per-day operator rosters, the patients with their
//! protocols, and optional interdiction rules. The serde layout matches the
//! instance document: `services` and `patients` keyed by name, `days` keyed
//! by day index (JSON object keys round-trip through strings).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{DayRoster, Interdiction, Patient, Service};

/// A scheduling problem instance over a multi-day horizon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Instance {
    /// Service catalogue, keyed by service name.
    pub services: BTreeMap<String, Service>,
    /// Operator rosters, keyed by day index.
    pub days: BTreeMap<i64, DayRoster>,
    /// Patients with their protocols, keyed by patient name.
    pub patients: BTreeMap<String, Patient>,
    /// Optional forbidden co-occurrence rules. Parsed and carried; no
    /// builder encodes them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interdictions: Vec<Interdiction>,
}

impl Instance {
    /// Creates an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last day of the horizon (largest declared day index).
    ///
    /// `None` when the instance declares no days.
    pub fn horizon_max(&self) -> Option<i64> {
        self.days.keys().next_back().copied()
    }

    /// First day of the horizon (smallest declared day index).
    pub fn horizon_min(&self) -> Option<i64> {
        self.days.keys().next().copied()
    }

    /// Roster of one day, if that day is declared.
    pub fn roster(&self, day: i64) -> Option<&DayRoster> {
        self.days.get(&day)
    }

    /// Names of every care unit staffed on at least one day.
    pub fn care_unit_names(&self) -> BTreeSet<&str> {
        self.days
            .values()
            .flat_map(|day| day.keys().map(String::as_str))
            .collect()
    }

    /// Parses an instance document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes this instance as a pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
