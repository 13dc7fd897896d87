//! Request window expansion.
//!
//! Turns each patient's protocols into concrete [`RequestWindow`]s over the
//! horizon `[0, horizon_max]`. For occurrence `k` of a protocol entry the
//! target day is `start + initial_shift + k * frequency`; the admissible
//! window is `[target - tolerance, target + tolerance]`, clamped to the
//! horizon and discarded when fully outside it.
//!
//! Expansion is pure and makes no assumptions the caller has validated the
//! protocol parameters: a frequency below `2 * tolerance + 1` produces
//! overlapping windows for the same request, which downstream builders
//! handle explicitly.

use std::collections::BTreeSet;

use crate::models::{Instance, Patient, RequestWindow, ServiceRequest};

/// Clamps the inclusive interval `[start, end]` into `[lo, hi]`.
///
/// Returns `None` when the interval lies fully outside the bounds.
pub fn clamp_window(start: i64, end: i64, lo: i64, hi: i64) -> Option<(i64, i64)> {
    if start > hi || end < lo {
        return None;
    }
    Some((start.max(lo), end.min(hi)))
}

/// Expands one patient's protocols into deduplicated request windows.
pub fn expand_patient_windows(
    patient_name: &str,
    patient: &Patient,
    horizon_max: i64,
) -> Vec<RequestWindow> {
    let mut windows = BTreeSet::new();

    for protocol in patient.protocols.values() {
        for entry in &protocol.protocol_services {
            for occurrence in 0..entry.times {
                let center = entry.start + protocol.initial_shift + occurrence * entry.frequency;
                if let Some((start_day, end_day)) = clamp_window(
                    center - entry.tolerance,
                    center + entry.tolerance,
                    0,
                    horizon_max,
                ) {
                    windows.insert(RequestWindow::new(
                        patient_name,
                        &entry.service,
                        start_day,
                        end_day,
                    ));
                }
            }
        }
    }

    windows.into_iter().collect()
}

/// Expands every patient of the instance into a sorted, deduplicated window
/// list.
///
/// Returns an empty list when the instance declares no days.
pub fn expand_windows(instance: &Instance) -> Vec<RequestWindow> {
    let Some(horizon_max) = instance.horizon_max() else {
        return Vec::new();
    };

    let mut windows = Vec::new();
    for (patient_name, patient) in &instance.patients {
        windows.extend(expand_patient_windows(patient_name, patient, horizon_max));
    }
    windows
}

/// Every (patient, service) pair named by any protocol occurrence, *before*
/// horizon clamping.
///
/// This is the reference set for rejected-request accounting: a request whose
/// every window falls outside the horizon still counts as requested (and is
/// therefore reported rejected).
pub fn requested_pairs(instance: &Instance) -> BTreeSet<ServiceRequest> {
    let mut pairs = BTreeSet::new();
    for (patient_name, patient) in &instance.patients {
        for protocol in patient.protocols.values() {
            for entry in &protocol.protocol_services {
                pairs.insert(ServiceRequest::new(patient_name, &entry.service));
            }
        }
    }
    pairs
}
