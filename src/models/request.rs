//! Derived request models.
//!
//! A [`RequestWindow`] is one concrete, horizon-clamped occurrence of a
//! protocol entry: the inclusive day range in which that occurrence may be
//! satisfied. A [`ServiceRequest`] is the day-less (patient, service) pair
//! used by the per-day subproblem and by rejected-request accounting.

use serde::{Deserialize, Serialize};

/// Admissible day range of one request occurrence (inclusive bounds).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestWindow {
    /// Requesting patient name.
    pub patient: String,
    /// Requested service name.
    pub service: String,
    /// First admissible day.
    pub start_day: i64,
    /// Last admissible day.
    pub end_day: i64,
}

impl RequestWindow {
    /// Creates a new request window.
    pub fn new(
        patient: impl Into<String>,
        service: impl Into<String>,
        start_day: i64,
        end_day: i64,
    ) -> Self {
        Self {
            patient: patient.into(),
            service: service.into(),
            start_day,
            end_day,
        }
    }

    /// Whether the given day falls inside this window.
    #[inline]
    pub fn contains_day(&self, day: i64) -> bool {
        day >= self.start_day && day <= self.end_day
    }

    /// Whether two windows' day ranges intersect.
    pub fn intersects(&self, other: &Self) -> bool {
        self.start_day <= other.end_day && other.start_day <= self.end_day
    }
}

/// A (patient, service) request pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Requesting patient name.
    pub patient: String,
    /// Requested service name.
    pub service: String,
}

impl ServiceRequest {
    /// Creates a new request pair.
    pub fn new(patient: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            patient: patient.into(),
            service: service.into(),
        }
    }
}
