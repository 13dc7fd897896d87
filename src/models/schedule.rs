//! Schedule result models.
//!
//! A [`ScheduleResult`] is the outcome of one solve: per-day scheduled
//! entries, the rejected request list, and an [`SolverInfo`] block with
//! method, timings, solver status and bounds. The serialized layout matches
//! the result document consumed by external reporting tools.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::ServiceRequest;

/// One scheduled service: who, what, where, and at which slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduledService {
    /// Patient receiving the service.
    pub patient: String,
    /// Service performed.
    pub service: String,
    /// Care unit providing the operator.
    pub care_unit: String,
    /// Operator performing the service.
    pub operator: String,
    /// Start slot; the service occupies `[time, time + duration)`.
    pub time: i64,
}

/// A request that no accepted assignment satisfies.
///
/// Window-based builders report the specific unsatisfied window; the
/// decomposed pipeline rejects at (patient, service) granularity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RejectedRequest {
    /// Requesting patient name.
    pub patient: String,
    /// Requested service name.
    pub service: String,
    /// Unsatisfied window `[start_day, end_day]`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<(i64, i64)>,
}

impl RejectedRequest {
    /// Rejects a (patient, service) pair without window detail.
    pub fn pair(patient: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            patient: patient.into(),
            service: service.into(),
            window: None,
        }
    }

    /// Rejects one specific window of a request.
    pub fn window(
        patient: impl Into<String>,
        service: impl Into<String>,
        start_day: i64,
        end_day: i64,
    ) -> Self {
        Self {
            patient: patient.into(),
            service: service.into(),
            window: Some((start_day, end_day)),
        }
    }
}

/// Solve metadata reported alongside every schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverInfo {
    /// Solving method name (e.g. `milp_decomposed`, `milp_monolithic`).
    pub method: String,
    /// Wall-clock seconds spent building models.
    pub model_creation_secs: f64,
    /// Wall-clock seconds spent in the solver.
    pub model_solving_secs: f64,
    /// Terminal solver status.
    pub status: String,
    /// Best proven lower bound on the objective.
    pub lower_bound: f64,
    /// Best proven upper bound on the objective.
    pub upper_bound: f64,
    /// Relative optimality gap (0 when proven optimal).
    pub gap: f64,
    /// Objective value of the reported assignment.
    pub objective_value: f64,
}

/// A complete solve outcome: scheduled entries per day, rejected requests,
/// and solver metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Accepted assignments, keyed by day.
    pub scheduled: BTreeMap<i64, Vec<ScheduledService>>,
    /// Requests no accepted assignment satisfies.
    pub rejected: Vec<RejectedRequest>,
    /// Method, timings, status and bounds of the solve.
    pub info: SolverInfo,
}

impl ScheduleResult {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment on the given day.
    pub fn add_scheduled(&mut self, day: i64, entry: ScheduledService) {
        self.scheduled.entry(day).or_default().push(entry);
    }

    /// All (patient, service) pairs present in some day's assignments.
    pub fn scheduled_pairs(&self) -> BTreeSet<ServiceRequest> {
        self.scheduled
            .values()
            .flatten()
            .map(|s| ServiceRequest::new(&s.patient, &s.service))
            .collect()
    }

    /// Total number of accepted assignments.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.values().map(Vec::len).sum()
    }

    /// Sorts day entries and the rejected list into the canonical document
    /// order (deterministic output for diffing and golden tests).
    pub fn normalize(&mut self) {
        for entries in self.scheduled.values_mut() {
            entries.sort();
        }
        self.rejected.sort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> ScheduleResult {
        let mut result = ScheduleResult::new();
        result.add_scheduled(
            2,
            ScheduledService {
                patient: "pat01".into(),
                service: "srv00".into(),
                care_unit: "cu00".into(),
                operator: "op00".into(),
                time: 4,
            },
        );
        result.add_scheduled(
            2,
            ScheduledService {
                patient: "pat00".into(),
                service: "srv01".into(),
                care_unit: "cu00".into(),
                operator: "op01".into(),
                time: 0,
            },
        );
        result.rejected.push(RejectedRequest::pair("pat02", "srv00"));
        result
    }

    #[test]
    fn test_scheduled_pairs() {
        let result = sample_result();
        let pairs = result.scheduled_pairs();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&ServiceRequest::new("pat00", "srv01")));
    }

    #[test]
    fn test_normalize_orders_entries() {
        let mut result = sample_result();
        result.normalize();
        assert_eq!(result.scheduled[&2][0].patient, "pat00");
        assert_eq!(result.scheduled[&2][1].patient, "pat01");
    }

    #[test]
    fn test_rejected_window_serialization() {
        let r = RejectedRequest::window("pat00", "srv00", 3, 5);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("[3,5]"));

        let bare = RejectedRequest::pair("pat00", "srv00");
        let json = serde_json::to_string(&bare).unwrap();
        assert!(!json.contains("window"));
    }

    #[test]
    fn test_result_document_roundtrip() {
        let mut result = sample_result();
        result.info.method = "milp_decomposed".into();
        let json = serde_json::to_string(&result).unwrap();
        let back: ScheduleResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scheduled_count(), 2);
        assert_eq!(back.info.method, "milp_decomposed");
    }
}
