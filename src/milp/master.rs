//! Master problem: day assignment.
//!
//! The master formulation chooses, for each request window, at most one day
//! inside it, ignoring operator-level detail. One binary variable exists per
//! candidate (patient, service, day) triple; a day is a candidate when it
//! lies inside some window of the pair and the service's care unit is
//! staffed that day. Aggregate capacity per (day, care unit) bounds the total
//! chosen duration by the roster's total operator time.
//!
//! The decoded result is the per-day request list handed to the
//! [`subproblem`](super::subproblem) stage; windows in which no variable
//! fires are rejected at this stage and never retried.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::models::{total_capacity, Instance, RequestWindow, ServiceRequest};

use super::model::{CmpOp, LinExpr, Model, Sense, VarId};

/// Builds the day-assignment master model from an instance and its expanded
/// request windows.
#[derive(Debug, Clone, Copy)]
pub struct MasterProblemBuilder<'a> {
    instance: &'a Instance,
}

/// An assembled master model plus the index data needed to decode solutions.
#[derive(Debug, Clone)]
pub struct MasterProblem {
    /// The assembled model.
    pub model: Model,
    candidates: Vec<(ServiceRequest, i64)>,
    vars: Vec<VarId>,
}

impl<'a> MasterProblemBuilder<'a> {
    /// Creates a builder over the given instance.
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Candidate (patient, service, day) triples: every staffed day inside
    /// some window of the pair, deduplicated.
    ///
    /// Days missing from the roster, or where the service's care unit has no
    /// operators, yield no candidate (the request is unsatisfiable there).
    pub fn candidate_triples(
        &self,
        windows: &[RequestWindow],
    ) -> BTreeSet<(ServiceRequest, i64)> {
        let mut triples = BTreeSet::new();
        for window in windows {
            let Some(service) = self.instance.services.get(&window.service) else {
                continue;
            };
            for day in window.start_day..=window.end_day {
                let staffed = self
                    .instance
                    .roster(day)
                    .and_then(|roster| roster.get(&service.care_unit))
                    .is_some_and(|cu| !cu.is_empty());
                if staffed {
                    triples.insert((
                        ServiceRequest::new(&window.patient, &window.service),
                        day,
                    ));
                }
            }
        }
        triples
    }

    /// Assembles the master model.
    pub fn build(&self, windows: &[RequestWindow]) -> MasterProblem {
        let mut model = Model::new("master");

        let triples = self.candidate_triples(windows);
        let mut vars = Vec::with_capacity(triples.len());
        let mut var_of: BTreeMap<&(ServiceRequest, i64), VarId> = BTreeMap::new();
        for triple in &triples {
            let (pair, day) = triple;
            let var = model.add_binary(format!("x[{},{},{}]", pair.patient, pair.service, day));
            vars.push(var);
            var_of.insert(triple, var);
        }

        // At most one day per window. A single-day window is trivially ≤ 1,
        // so only multi-day windows emit a constraint.
        let unique_windows: BTreeSet<&RequestWindow> = windows.iter().collect();
        for window in &unique_windows {
            if window.start_day == window.end_day {
                continue;
            }
            let mut expr = LinExpr::new();
            for day in window.start_day..=window.end_day {
                let key = (
                    ServiceRequest::new(&window.patient, &window.service),
                    day,
                );
                if let Some(&var) = var_of.get(&key) {
                    expr.add(var, 1);
                }
            }
            if !expr.terms.is_empty() {
                model.add_constraint(
                    format!(
                        "one_day_per_window[{},{},{}..{}]",
                        window.patient, window.service, window.start_day, window.end_day
                    ),
                    expr,
                    CmpOp::Le,
                    1,
                );
            }
        }

        // Aggregate capacity per (day, care unit) touched by a candidate.
        let mut capacity_terms: BTreeMap<(i64, &str), LinExpr> = BTreeMap::new();
        for (triple, &var) in &var_of {
            let (pair, day) = triple;
            let service = &self.instance.services[&pair.service];
            capacity_terms
                .entry((*day, service.care_unit.as_str()))
                .or_default()
                .add(var, service.duration);
        }
        for ((day, care_unit), expr) in capacity_terms {
            // Candidate triples only reference staffed care units.
            let Some(roster) = self.instance.roster(day).and_then(|r| r.get(care_unit)) else {
                continue;
            };
            model.add_constraint(
                format!("capacity[{day},{care_unit}]"),
                expr,
                CmpOp::Le,
                total_capacity(roster),
            );
        }

        // Maximize total satisfied duration, weighted by patient priority.
        let mut objective = LinExpr::new();
        for (triple, &var) in &var_of {
            let (pair, _) = triple;
            let duration = self.instance.services[&pair.service].duration;
            let priority = self.instance.patients[&pair.patient].effective_priority();
            objective.add(var, duration * priority);
        }
        model.set_objective(Sense::Maximize, objective);

        debug!(
            candidates = vars.len(),
            constraints = model.constraint_count(),
            "master model assembled"
        );

        MasterProblem {
            model,
            candidates: triples.into_iter().collect(),
            vars,
        }
    }
}

impl MasterProblem {
    /// Decodes a solver assignment into per-day request lists.
    pub fn decode(&self, values: &[f64]) -> BTreeMap<i64, Vec<ServiceRequest>> {
        let mut by_day: BTreeMap<i64, Vec<ServiceRequest>> = BTreeMap::new();
        for ((pair, day), var) in self.candidates.iter().zip(&self.vars) {
            if values[var.index()] >= 0.5 {
                by_day.entry(*day).or_default().push(pair.clone());
            }
        }
        by_day
    }

    /// Number of candidate variables.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayRoster, Operator, Patient, Protocol, ProtocolService, Service};
    use crate::windows::expand_windows;

    fn staffed_day(care_unit: &str, operators: &[(&str, i64, i64)]) -> DayRoster {
        let mut roster = DayRoster::new();
        let cu = roster.entry(care_unit.into()).or_default();
        for (name, start, duration) in operators {
            cu.insert((*name).into(), Operator::new(*start, *duration));
        }
        roster
    }

    fn sample_instance() -> Instance {
        let mut instance = Instance::new();
        instance.services.insert("srv00".into(), Service::new("cu00", 2));
        instance.services.insert("srv01".into(), Service::new("cu00", 3));
        for day in 0..4 {
            instance
                .days
                .insert(day, staffed_day("cu00", &[("op00", 0, 6)]));
        }
        instance.patients.insert(
            "pat00".into(),
            Patient::new().with_priority(2).with_protocol(
                "prot00",
                Protocol::new(0).with_service(ProtocolService::new("srv00", 1, 1, 7, 1)),
            ),
        );
        instance.patients.insert(
            "pat01".into(),
            Patient::new().with_protocol(
                "prot00",
                Protocol::new(0).with_service(ProtocolService::new("srv01", 2, 0, 7, 1)),
            ),
        );
        instance
    }

    #[test]
    fn test_candidate_triples_cover_window_days() {
        let instance = sample_instance();
        let windows = expand_windows(&instance);
        let builder = MasterProblemBuilder::new(&instance);
        let triples = builder.candidate_triples(&windows);

        // pat00/srv00 window [0, 2] → 3 candidates; pat01/srv01 day 2 → 1.
        assert_eq!(triples.len(), 4);
        assert!(triples.contains(&(ServiceRequest::new("pat00", "srv00"), 0)));
        assert!(triples.contains(&(ServiceRequest::new("pat01", "srv01"), 2)));
    }

    #[test]
    fn test_unstaffed_days_yield_no_candidates() {
        let mut instance = sample_instance();
        // Day 1 loses its roster entirely.
        instance.days.remove(&1);
        let windows = expand_windows(&instance);
        let builder = MasterProblemBuilder::new(&instance);
        let triples = builder.candidate_triples(&windows);

        assert!(!triples.contains(&(ServiceRequest::new("pat00", "srv00"), 1)));
        assert!(triples.contains(&(ServiceRequest::new("pat00", "srv00"), 0)));
    }

    #[test]
    fn test_window_constraint_only_for_multi_day_windows() {
        let instance = sample_instance();
        let windows = expand_windows(&instance);
        let master = MasterProblemBuilder::new(&instance).build(&windows);

        let window_constraints: Vec<_> = master
            .model
            .constraints()
            .iter()
            .filter(|c| c.label.starts_with("one_day_per_window"))
            .collect();
        // Only pat00/srv00 has a window wider than one day.
        assert_eq!(window_constraints.len(), 1);
        assert_eq!(window_constraints[0].expr.terms.len(), 3);
    }

    #[test]
    fn test_capacity_constraint_bounds_daily_duration() {
        let instance = sample_instance();
        let windows = expand_windows(&instance);
        let master = MasterProblemBuilder::new(&instance).build(&windows);

        let capacity: Vec<_> = master
            .model
            .constraints()
            .iter()
            .filter(|c| c.label.starts_with("capacity"))
            .collect();
        // Days 0, 1, 2 carry candidates (day 3 is outside every window).
        assert_eq!(capacity.len(), 3);
        for c in &capacity {
            assert_eq!(c.rhs, 6); // one operator of duration 6
        }
    }

    #[test]
    fn test_objective_weights_duration_by_priority() {
        let instance = sample_instance();
        let windows = expand_windows(&instance);
        let master = MasterProblemBuilder::new(&instance).build(&windows);

        let coeffs: BTreeSet<i64> = master
            .model
            .objective()
            .terms
            .iter()
            .map(|(_, c)| *c)
            .collect();
        // pat00 (priority 2) × duration 2 = 4; pat01 (priority 1) × 3 = 3.
        assert!(coeffs.contains(&4));
        assert!(coeffs.contains(&3));
    }

    #[test]
    fn test_decode_groups_by_day() {
        let instance = sample_instance();
        let windows = expand_windows(&instance);
        let master = MasterProblemBuilder::new(&instance).build(&windows);

        // Fire pat00/srv00 on day 2 and pat01/srv01 on day 2.
        let mut values = vec![0.0; master.model.var_count()];
        for ((pair, day), var) in master.candidates.iter().zip(&master.vars) {
            if *day == 2 && (pair.patient == "pat00" || pair.patient == "pat01") {
                values[var.index()] = 1.0;
            }
        }
        let by_day = master.decode(&values);
        assert_eq!(by_day.len(), 1);
        assert_eq!(by_day[&2].len(), 2);
        assert!(master.model.first_violation(&values).is_none());
    }
}
