//! Instance and result validation.
//!
//! Checks an instance, and optionally a schedule produced for it, against
//! every structural and temporal constraint. Pure, read-only, fail-fast:
//! the first violation found is returned with a distinct numeric code and a
//! message naming the offending entity. Check order avoids cascading false
//! positives:
//!
//! 1. Structural shape (positive durations, valid names, protocol bounds
//!    against the horizon)
//! 2. Referential integrity (every name a schedule mentions exists)
//! 3. Overlaps (shared patient or operator with intersecting intervals)
//! 4. Operator ranges (each service inside its operator's shift)
//! 5. Window existence (each scheduled day inside a recomputed window)
//!
//! Used both as a regression oracle over builder output and as a standalone
//! auditor for external instance/result documents.

use std::fmt;

use crate::models::{Instance, ScheduleResult};
use crate::windows::expand_patient_windows;

/// A validation failure: numeric code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Distinct numeric code identifying the check that failed.
    pub code: u32,
    /// Message naming the offending entity.
    pub message: String,
}

impl ValidationError {
    fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Shorthand for a failed check.
fn fail(code: u32, message: impl Into<String>) -> Result<(), ValidationError> {
    Err(ValidationError::new(code, message))
}

/// Validates the structural shape of an instance.
pub fn validate_instance(instance: &Instance) -> Result<(), ValidationError> {
    validate_days(instance)?;
    validate_services(instance)?;
    validate_patients(instance)?;
    Ok(())
}

/// Validates an instance together with a schedule produced for it.
pub fn validate_result(
    instance: &Instance,
    result: &ScheduleResult,
) -> Result<(), ValidationError> {
    validate_instance(instance)?;
    validate_references(instance, result)?;
    validate_overlaps(instance, result)?;
    validate_operator_ranges(instance, result)?;
    validate_window_existence(instance, result)?;
    Ok(())
}

/// Runs the applicable checks and reports the original `(code, message)`
/// tuple shape: `(0, "all ok")` on success.
pub fn check(instance: &Instance, result: Option<&ScheduleResult>) -> (u32, String) {
    let outcome = match result {
        None => validate_instance(instance),
        Some(result) => validate_result(instance, result),
    };
    match outcome {
        Ok(()) => (0, "all ok".into()),
        Err(e) => (e.code, e.message),
    }
}

fn validate_days(instance: &Instance) -> Result<(), ValidationError> {
    if instance.days.is_empty() {
        return fail(1, "instance declares no days");
    }
    for (&day, roster) in &instance.days {
        if day < 0 {
            return fail(2, format!("day index {day} is negative"));
        }
        for (care_unit_name, care_unit) in roster {
            if care_unit_name.is_empty() {
                return fail(3, format!("day {day} has a care unit with an empty name"));
            }
            for (operator_name, operator) in care_unit {
                if operator_name.is_empty() {
                    return fail(
                        4,
                        format!("care unit \"{care_unit_name}\" of day {day} has an operator with an empty name"),
                    );
                }
                if operator.start < 0 {
                    return fail(
                        5,
                        format!(
                            "operator \"{operator_name}\" of care unit \"{care_unit_name}\" on day {day} has negative start {}",
                            operator.start
                        ),
                    );
                }
                if operator.duration <= 0 {
                    return fail(
                        6,
                        format!(
                            "operator \"{operator_name}\" of care unit \"{care_unit_name}\" on day {day} has non-positive duration {}",
                            operator.duration
                        ),
                    );
                }
            }
        }
    }
    Ok(())
}

fn validate_services(instance: &Instance) -> Result<(), ValidationError> {
    let care_unit_names = instance.care_unit_names();
    for (service_name, service) in &instance.services {
        if service_name.is_empty() {
            return fail(7, "a service has an empty name");
        }
        if service.care_unit.is_empty() {
            return fail(
                8,
                format!("service \"{service_name}\" has an empty care unit name"),
            );
        }
        if !care_unit_names.contains(service.care_unit.as_str()) {
            return fail(
                9,
                format!(
                    "care unit \"{}\" of service \"{service_name}\" is not staffed on any day",
                    service.care_unit
                ),
            );
        }
        if service.duration <= 0 {
            return fail(
                10,
                format!(
                    "service \"{service_name}\" has non-positive duration {}",
                    service.duration
                ),
            );
        }
    }
    Ok(())
}

fn validate_patients(instance: &Instance) -> Result<(), ValidationError> {
    // Days are validated first, so the horizon exists here.
    let min_day = instance.horizon_min().unwrap_or(0);
    let max_day = instance.horizon_max().unwrap_or(0);

    for (patient_name, patient) in &instance.patients {
        if patient_name.is_empty() {
            return fail(11, "a patient has an empty name");
        }
        if let Some(priority) = patient.priority {
            if priority <= 0 {
                return fail(
                    12,
                    format!("patient \"{patient_name}\" has non-positive priority {priority}"),
                );
            }
        }
        for (protocol_name, protocol) in &patient.protocols {
            for entry in &protocol.protocol_services {
                if !instance.services.contains_key(&entry.service) {
                    return fail(
                        13,
                        format!(
                            "protocol \"{protocol_name}\" of patient \"{patient_name}\" references unknown service \"{}\"",
                            entry.service
                        ),
                    );
                }
                if entry.tolerance < 0 {
                    return fail(
                        14,
                        format!(
                            "service \"{}\" in protocol \"{protocol_name}\" of patient \"{patient_name}\" has negative tolerance {}",
                            entry.service, entry.tolerance
                        ),
                    );
                }
                if entry.frequency <= 0 {
                    return fail(
                        15,
                        format!(
                            "service \"{}\" in protocol \"{protocol_name}\" of patient \"{patient_name}\" has non-positive frequency {}",
                            entry.service, entry.frequency
                        ),
                    );
                }
                if entry.times <= 0 {
                    return fail(
                        16,
                        format!(
                            "service \"{}\" in protocol \"{protocol_name}\" of patient \"{patient_name}\" has non-positive times {}",
                            entry.service, entry.times
                        ),
                    );
                }
                if entry.start + protocol.initial_shift + entry.tolerance < min_day {
                    return fail(
                        17,
                        format!(
                            "service \"{}\" in protocol \"{protocol_name}\" of patient \"{patient_name}\" starts before the horizon",
                            entry.service
                        ),
                    );
                }
                let last_target =
                    entry.start + protocol.initial_shift + (entry.times - 1) * entry.frequency;
                if last_target - entry.tolerance > max_day {
                    return fail(
                        18,
                        format!(
                            "service \"{}\" in protocol \"{protocol_name}\" of patient \"{patient_name}\" ends after the horizon",
                            entry.service
                        ),
                    );
                }
            }
        }
    }
    Ok(())
}

fn validate_references(
    instance: &Instance,
    result: &ScheduleResult,
) -> Result<(), ValidationError> {
    for (&day, entries) in &result.scheduled {
        let Some(roster) = instance.roster(day) else {
            return fail(20, format!("scheduled day {day} does not exist"));
        };
        for entry in entries {
            if !instance.patients.contains_key(&entry.patient) {
                return fail(
                    24,
                    format!("scheduled patient \"{}\" does not exist", entry.patient),
                );
            }
            if !instance.services.contains_key(&entry.service) {
                return fail(
                    23,
                    format!(
                        "service \"{}\" scheduled for patient \"{}\" does not exist",
                        entry.service, entry.patient
                    ),
                );
            }
            let Some(care_unit) = roster.get(&entry.care_unit) else {
                return fail(
                    21,
                    format!(
                        "care unit \"{}\" scheduled on day {day} for patient \"{}\" does not exist",
                        entry.care_unit, entry.patient
                    ),
                );
            };
            if !care_unit.contains_key(&entry.operator) {
                return fail(
                    22,
                    format!(
                        "operator \"{}\" of care unit \"{}\" scheduled on day {day} for patient \"{}\" does not exist",
                        entry.operator, entry.care_unit, entry.patient
                    ),
                );
            }
        }
    }
    Ok(())
}

fn validate_overlaps(instance: &Instance, result: &ScheduleResult) -> Result<(), ValidationError> {
    for (&day, entries) in &result.scheduled {
        for (index, entry) in entries.iter().enumerate() {
            for other in &entries[index + 1..] {
                let same_patient = entry.patient == other.patient;
                let same_operator =
                    entry.care_unit == other.care_unit && entry.operator == other.operator;
                if !same_patient && !same_operator {
                    continue;
                }

                let end = entry.time + instance.services[&entry.service].duration;
                let other_end = other.time + instance.services[&other.service].duration;
                if entry.time < other_end && other.time < end {
                    return fail(
                        25,
                        format!(
                            "schedules ({}, {}, day {day}, {}, {}) and ({}, {}, day {day}, {}, {}) overlap",
                            entry.service,
                            entry.patient,
                            entry.care_unit,
                            entry.operator,
                            other.service,
                            other.patient,
                            other.care_unit,
                            other.operator
                        ),
                    );
                }
            }
        }
    }
    Ok(())
}

fn validate_operator_ranges(
    instance: &Instance,
    result: &ScheduleResult,
) -> Result<(), ValidationError> {
    for (&day, entries) in &result.scheduled {
        for entry in entries {
            let duration = instance.services[&entry.service].duration;
            // References were validated already.
            let Some(operator) = instance
                .roster(day)
                .and_then(|r| r.get(&entry.care_unit))
                .and_then(|cu| cu.get(&entry.operator))
            else {
                continue;
            };
            if !operator.covers(entry.time, duration) {
                return fail(
                    26,
                    format!(
                        "service \"{}\" of patient \"{}\" on day {day} runs outside operator \"{}\" range",
                        entry.service, entry.patient, entry.operator
                    ),
                );
            }
        }
    }
    Ok(())
}

fn validate_window_existence(
    instance: &Instance,
    result: &ScheduleResult,
) -> Result<(), ValidationError> {
    let max_day = instance.horizon_max().unwrap_or(0);
    for (&day, entries) in &result.scheduled {
        for entry in entries {
            let Some(patient) = instance.patients.get(&entry.patient) else {
                continue;
            };
            // Recompute the windows from the protocols; never trust a
            // precomputed list.
            let inside = expand_patient_windows(&entry.patient, patient, max_day)
                .iter()
                .any(|w| w.service == entry.service && w.contains_day(day));
            if !inside {
                return fail(
                    27,
                    format!(
                        "service \"{}\" of patient \"{}\" scheduled on day {day} is outside every request window",
                        entry.service, entry.patient
                    ),
                );
            }
        }
    }
    Ok(())
}
