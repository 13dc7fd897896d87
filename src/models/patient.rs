//! Patient and protocol models.
//!
//! A patient carries one or more protocols. A protocol is a recurring-care
//! prescription: an initial day shift applied to all of its entries, plus a
//! list of [`ProtocolService`]s, each generating `times` periodic request
//! occurrences around a target day.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A patient with recurring-care protocols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Scheduling weight (higher = more important). `None` = uniform weight 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Protocols keyed by name.
    pub protocols: BTreeMap<String, Protocol>,
}

/// A recurring-care prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    /// Day shift applied to every entry of this protocol.
    pub initial_shift: i64,
    /// Prescribed services with their recurrence parameters.
    pub protocol_services: Vec<ProtocolService>,
}

/// One recurring service prescription inside a protocol.
///
/// Occurrence `k` (for `k` in `[0, times)`) targets day
/// `start + initial_shift + k * frequency` and may be satisfied anywhere in
/// `[target - tolerance, target + tolerance]`. A frequency below
/// `2 * tolerance + 1` makes consecutive windows of the same request overlap;
/// that is legal input and handled downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolService {
    /// Name of the prescribed service.
    pub service: String,
    /// Target day of the first occurrence, relative to the protocol shift.
    pub start: i64,
    /// Admissible deviation, in days, around each target day.
    pub tolerance: i64,
    /// Days between consecutive occurrence targets.
    pub frequency: i64,
    /// Number of occurrences.
    pub times: i64,
}

impl Patient {
    /// Creates a patient with no protocols and uniform priority.
    pub fn new() -> Self {
        Self {
            priority: None,
            protocols: BTreeMap::new(),
        }
    }

    /// Sets the scheduling priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Adds a protocol.
    pub fn with_protocol(mut self, name: impl Into<String>, protocol: Protocol) -> Self {
        self.protocols.insert(name.into(), protocol);
        self
    }

    /// Effective scheduling weight (uniform 1 when unset).
    #[inline]
    pub fn effective_priority(&self) -> i64 {
        self.priority.unwrap_or(1)
    }
}

impl Default for Patient {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol {
    /// Creates a protocol with the given initial shift.
    pub fn new(initial_shift: i64) -> Self {
        Self {
            initial_shift,
            protocol_services: Vec::new(),
        }
    }

    /// Adds a protocol service entry.
    pub fn with_service(mut self, entry: ProtocolService) -> Self {
        self.protocol_services.push(entry);
        self
    }
}

impl ProtocolService {
    /// Creates a new protocol service entry.
    pub fn new(
        service: impl Into<String>,
        start: i64,
        tolerance: i64,
        frequency: i64,
        times: i64,
    ) -> Self {
        Self {
            service: service.into(),
            start,
            tolerance,
            frequency,
            times,
        }
    }
}

/// A forbidden co-occurrence rule.
///
/// After the cause service is performed, the effect services must not be
/// scheduled inside the given day window. Interdictions are carried through
/// parsing and generation; no builder currently encodes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interdiction {
    /// Service triggering the interdiction.
    pub cause: String,
    /// Services forbidden inside the window.
    pub effect: Vec<String>,
    /// Forbidden day window relative to the cause.
    pub window: InterdictionWindow,
}

/// Day window of an [`Interdiction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterdictionWindow {
    /// Offset, in days, from the cause occurrence.
    pub start: i64,
    /// Window length in days.
    pub duration: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_builder() {
        let patient = Patient::new().with_priority(3).with_protocol(
            "prot00",
            Protocol::new(1).with_service(ProtocolService::new("srv00", 0, 1, 7, 4)),
        );

        assert_eq!(patient.effective_priority(), 3);
        assert_eq!(patient.protocols.len(), 1);
        assert_eq!(
            patient.protocols["prot00"].protocol_services[0].frequency,
            7
        );
    }

    #[test]
    fn test_default_priority_is_uniform() {
        assert_eq!(Patient::new().effective_priority(), 1);
    }

    #[test]
    fn test_interdiction_roundtrip() {
        let json = r#"{
            "cause": "srv00",
            "effect": ["srv01", "srv02"],
            "window": { "start": 1, "duration": 3 }
        }"#;
        let i: Interdiction = serde_json::from_str(json).unwrap();
        assert_eq!(i.cause, "srv00");
        assert_eq!(i.effect.len(), 2);
        assert_eq!(i.window.duration, 3);
    }
}
