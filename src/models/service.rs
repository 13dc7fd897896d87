//! Service catalogue model.
//!
//! A service is a single kind of care activity (e.g. a wound dressing or a
//! physiotherapy session) offered by exactly one care unit. Durations are
//! expressed in whole time slots; the consumer defines the slot length.

use serde::{Deserialize, Serialize};

/// A care service offered by one care unit.
///
/// Services are stored keyed by name in [`Instance::services`](super::Instance),
/// mirroring the instance document layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Name of the care unit whose operators perform this service.
    pub care_unit: String,
    /// Processing time in time slots. Positive in any valid instance.
    pub duration: i64,
}

impl Service {
    /// Creates a new service.
    pub fn new(care_unit: impl Into<String>, duration: i64) -> Self {
        Self {
            care_unit: care_unit.into(),
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_roundtrip() {
        let s = Service::new("cu00", 4);
        let json = serde_json::to_string(&s).unwrap();
        let back: Service = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
