//! Subproblem: per-day operator assignment.
//!
//! Given one day's roster and the request pairs the master assigned to that
//! day, the subproblem decides which requests are performed, at which slot,
//! and by which operator. Time variables use an offset encoding: value 0 is
//! reserved for "not scheduled", so a service starting at slot `s` stores
//! `s + 1`; decoding subtracts the offset.
//!
//! A request with no operator of its care unit long enough to host the
//! service gets no variables at all: it is structurally unsatisfiable on
//! this day and reported as such.
//!
//! # Formulation
//!
//! - `x[p,s]` (binary): request performed.
//! - `t[p,s]` (integer, `[0, maxReachable]`): offset start slot.
//! - `chi[p,s,o,c]` (binary): operator `o` of care unit `c` performs it.
//! - Linking forces `t > 0` exactly when `x = 1` and `Σ chi = x`.
//! - Big-M inequalities keep the service inside the chosen operator's shift
//!   and order any two services sharing a patient or an operator.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::models::{DayRoster, ScheduledService, Service, ServiceRequest};

use super::bounds::max_reachable_time;
use super::model::{CmpOp, LinExpr, Model, Sense, VarId};
use super::pairs::canonical_pairs;

/// One (request, operator) assignment candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChiCandidate {
    /// Position of the request in the satisfiable-request list.
    pub request: usize,
    /// Care unit name.
    pub care_unit: String,
    /// Operator name.
    pub operator: String,
}

/// Builds the per-day operator-assignment model.
#[derive(Debug, Clone, Copy)]
pub struct SubproblemBuilder<'a> {
    services: &'a BTreeMap<String, Service>,
    roster: &'a DayRoster,
}

/// An assembled day model plus the index data needed to decode solutions.
#[derive(Debug, Clone)]
pub struct Subproblem {
    /// The assembled model.
    pub model: Model,
    satisfiable: Vec<ServiceRequest>,
    unsatisfiable: Vec<ServiceRequest>,
    x: Vec<VarId>,
    t: Vec<VarId>,
    chi_index: Vec<ChiCandidate>,
    chi: Vec<VarId>,
}

impl<'a> SubproblemBuilder<'a> {
    /// Creates a builder over one day's catalogue and roster.
    pub fn new(services: &'a BTreeMap<String, Service>, roster: &'a DayRoster) -> Self {
        Self { services, roster }
    }

    /// Splits the requests into satisfiable ones with their operator
    /// candidates, and structurally unsatisfiable ones.
    ///
    /// An operator is a candidate when its shift is at least as long as the
    /// service; unknown services and unstaffed care units yield no
    /// candidates.
    pub fn operator_candidates(
        &self,
        requests: &[ServiceRequest],
    ) -> (Vec<(ServiceRequest, Vec<ChiCandidate>)>, Vec<ServiceRequest>) {
        let unique: BTreeSet<&ServiceRequest> = requests.iter().collect();

        let mut satisfiable = Vec::new();
        let mut unsatisfiable = Vec::new();
        for request in unique {
            let candidates = self
                .services
                .get(&request.service)
                .map(|service| {
                    self.roster
                        .get(&service.care_unit)
                        .into_iter()
                        .flat_map(|cu| cu.iter())
                        .filter(|(_, op)| op.duration >= service.duration)
                        .map(|(name, _)| ChiCandidate {
                            request: satisfiable.len(),
                            care_unit: service.care_unit.clone(),
                            operator: name.clone(),
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            if candidates.is_empty() {
                unsatisfiable.push(request.clone());
            } else {
                satisfiable.push((request.clone(), candidates));
            }
        }
        (satisfiable, unsatisfiable)
    }

    /// Assembles the day model.
    pub fn build(&self, requests: &[ServiceRequest]) -> Subproblem {
        let mut model = Model::new("subproblem");

        let (with_candidates, unsatisfiable) = self.operator_candidates(requests);

        // Latest reachable end time per care unit; doubles as big-M.
        let max_times: BTreeMap<&str, i64> = self
            .roster
            .iter()
            .map(|(name, cu)| (name.as_str(), max_reachable_time(cu)))
            .collect();

        let mut satisfiable = Vec::with_capacity(with_candidates.len());
        let mut x = Vec::with_capacity(with_candidates.len());
        let mut t = Vec::with_capacity(with_candidates.len());
        let mut chi_index = Vec::new();
        let mut chi = Vec::new();

        for (request, candidates) in &with_candidates {
            let care_unit = &self.services[&request.service].care_unit;
            let max_time = max_times[care_unit.as_str()];

            let x_var = model.add_binary(format!("x[{},{}]", request.patient, request.service));
            let t_var = model.add_integer(
                format!("t[{},{}]", request.patient, request.service),
                0,
                max_time,
            );
            x.push(x_var);
            t.push(t_var);
            satisfiable.push(request.clone());

            for candidate in candidates {
                let var = model.add_binary(format!(
                    "chi[{},{},{},{}]",
                    request.patient, request.service, candidate.operator, candidate.care_unit
                ));
                chi_index.push(candidate.clone());
                chi.push(var);
            }
        }

        self.emit_linking(&mut model, &satisfiable, &x, &t, &chi_index, &chi, &max_times);
        self.emit_operator_windows(&mut model, &satisfiable, &t, &chi_index, &chi, &max_times);
        self.emit_patient_disjunctions(&mut model, &satisfiable, &x, &t, &max_times);
        self.emit_operator_disjunctions(&mut model, &satisfiable, &t, &chi_index, &chi, &max_times);

        // Maximize the total duration of performed services.
        let mut objective = LinExpr::new();
        for (request, &x_var) in satisfiable.iter().zip(&x) {
            objective.add(x_var, self.services[&request.service].duration);
        }
        model.set_objective(Sense::Maximize, objective);

        debug!(
            requests = satisfiable.len(),
            unsatisfiable = unsatisfiable.len(),
            vars = model.var_count(),
            constraints = model.constraint_count(),
            "subproblem model assembled"
        );

        Subproblem {
            model,
            satisfiable,
            unsatisfiable,
            x,
            t,
            chi_index,
            chi,
        }
    }

    /// `t`/`x` linking and the `Σ chi = x` channeling constraint.
    fn emit_linking(
        &self,
        model: &mut Model,
        satisfiable: &[ServiceRequest],
        x: &[VarId],
        t: &[VarId],
        chi_index: &[ChiCandidate],
        chi: &[VarId],
        max_times: &BTreeMap<&str, i64>,
    ) {
        for (i, request) in satisfiable.iter().enumerate() {
            let care_unit = &self.services[&request.service].care_unit;
            let max_time = max_times[care_unit.as_str()];

            // x = 0 forces t = 0.
            model.add_constraint(
                format!("t_le_x_max[{},{}]", request.patient, request.service),
                LinExpr::term(t[i], 1).plus(x[i], -max_time),
                CmpOp::Le,
                0,
            );
            // x = 1 forces t > 0.
            model.add_constraint(
                format!("t_ge_x[{},{}]", request.patient, request.service),
                LinExpr::term(t[i], 1).plus(x[i], -1),
                CmpOp::Ge,
                0,
            );

            // Exactly one operator when performed, none otherwise.
            let mut sum = LinExpr::new();
            for (candidate, &chi_var) in chi_index.iter().zip(chi) {
                if candidate.request == i {
                    sum.add(chi_var, 1);
                }
            }
            sum.add(x[i], -1);
            model.add_constraint(
                format!("x_links_chi[{},{}]", request.patient, request.service),
                sum,
                CmpOp::Eq,
                0,
            );
        }
    }

    /// The chosen operator's shift must contain the service interval.
    fn emit_operator_windows(
        &self,
        model: &mut Model,
        satisfiable: &[ServiceRequest],
        t: &[VarId],
        chi_index: &[ChiCandidate],
        chi: &[VarId],
        max_times: &BTreeMap<&str, i64>,
    ) {
        for (candidate, &chi_var) in chi_index.iter().zip(chi) {
            let request = &satisfiable[candidate.request];
            let duration = self.services[&request.service].duration;
            let operator = &self.roster[&candidate.care_unit][&candidate.operator];
            let max_time = max_times[candidate.care_unit.as_str()];
            // Offset encoding: shift start slot s is stored as s + 1.
            let shift_start = operator.start + 1;
            let shift_end = shift_start + operator.duration;
            let t_var = t[candidate.request];

            model.add_constraint(
                format!(
                    "respect_start[{},{},{}]",
                    request.patient, request.service, candidate.operator
                ),
                LinExpr::term(chi_var, shift_start).plus(t_var, -1),
                CmpOp::Le,
                0,
            );
            // t + duration ≤ shift_end + (1 − chi) · M
            model.add_constraint(
                format!(
                    "respect_end[{},{},{}]",
                    request.patient, request.service, candidate.operator
                ),
                LinExpr::term(t_var, 1).plus(chi_var, max_time),
                CmpOp::Le,
                shift_end + max_time - duration,
            );
        }
    }

    /// Two services of the same patient must not overlap in time.
    fn emit_patient_disjunctions(
        &self,
        model: &mut Model,
        satisfiable: &[ServiceRequest],
        x: &[VarId],
        t: &[VarId],
        max_times: &BTreeMap<&str, i64>,
    ) {
        for (i, j) in canonical_pairs(satisfiable.len()) {
            if satisfiable[i].patient != satisfiable[j].patient {
                continue;
            }
            let (first, second) = (&satisfiable[i], &satisfiable[j]);
            let dur_i = self.services[&first.service].duration;
            let dur_j = self.services[&second.service].duration;
            let max_i = max_times[self.services[&first.service].care_unit.as_str()];
            let max_j = max_times[self.services[&second.service].care_unit.as_str()];

            let aux = model.add_binary(format!(
                "aux1[{},{},{}]",
                first.patient, first.service, second.service
            ));
            let tag = format!("{},{},{}", first.patient, first.service, second.service);

            // aux = 1 ⇒ first precedes second; aux = 0 ⇒ second precedes
            // first (when both are performed).
            model.add_constraint(
                format!("patient_order_fwd[{tag}]"),
                LinExpr::term(t[i], 1)
                    .plus(x[i], dur_i)
                    .plus(aux, max_i)
                    .plus(t[j], -1),
                CmpOp::Le,
                max_i,
            );
            model.add_constraint(
                format!("patient_order_bwd[{tag}]"),
                LinExpr::term(t[j], 1)
                    .plus(x[j], dur_j)
                    .plus(aux, -max_j)
                    .plus(t[i], -1),
                CmpOp::Le,
                0,
            );
            // Keep aux benign when either service is not performed.
            model.add_constraint(
                format!("patient_order_gate1[{tag}]"),
                LinExpr::term(aux, 1).plus(x[j], -1),
                CmpOp::Le,
                0,
            );
            model.add_constraint(
                format!("patient_order_gate2[{tag}]"),
                LinExpr::term(x[j], 1).plus(x[i], -1).plus(aux, -1),
                CmpOp::Le,
                0,
            );
        }
    }

    /// Two services performed by the same operator must not overlap in time.
    ///
    /// Needs a pair of auxiliaries per candidate pair: the shared resource is
    /// only identified once both chi variables are fixed, so both orderings
    /// stay available until then.
    fn emit_operator_disjunctions(
        &self,
        model: &mut Model,
        satisfiable: &[ServiceRequest],
        t: &[VarId],
        chi_index: &[ChiCandidate],
        chi: &[VarId],
        max_times: &BTreeMap<&str, i64>,
    ) {
        for (a, b) in canonical_pairs(chi_index.len()) {
            let (ca, cb) = (&chi_index[a], &chi_index[b]);
            if ca.care_unit != cb.care_unit || ca.operator != cb.operator {
                continue;
            }
            let (ra, rb) = (&satisfiable[ca.request], &satisfiable[cb.request]);
            let dur_a = self.services[&ra.service].duration;
            let dur_b = self.services[&rb.service].duration;
            let max_time = max_times[ca.care_unit.as_str()];

            let tag = format!(
                "{},{},{},{},{},{}",
                ra.patient, ra.service, rb.patient, rb.service, ca.operator, ca.care_unit
            );
            let aux_fwd = model.add_binary(format!("aux2[{tag},0]"));
            let aux_bwd = model.add_binary(format!("aux2[{tag},1]"));

            model.add_constraint(
                format!("operator_order_fwd[{tag}]"),
                LinExpr::term(t[ca.request], 1)
                    .plus(chi[a], dur_a)
                    .plus(aux_fwd, max_time)
                    .plus(t[cb.request], -1),
                CmpOp::Le,
                max_time,
            );
            model.add_constraint(
                format!("operator_order_bwd[{tag}]"),
                LinExpr::term(t[cb.request], 1)
                    .plus(chi[b], dur_b)
                    .plus(aux_bwd, max_time)
                    .plus(t[ca.request], -1),
                CmpOp::Le,
                max_time,
            );
            // Exactly one ordering fires iff both candidates are chosen.
            model.add_constraint(
                format!("operator_order_gate1[{tag}]"),
                LinExpr::term(chi[a], 1)
                    .plus(chi[b], 1)
                    .plus(aux_fwd, -1)
                    .plus(aux_bwd, -1),
                CmpOp::Le,
                1,
            );
            model.add_constraint(
                format!("operator_order_gate2[{tag}]"),
                LinExpr::term(aux_fwd, 1).plus(aux_bwd, 1).plus(chi[a], -1),
                CmpOp::Le,
                0,
            );
            model.add_constraint(
                format!("operator_order_gate3[{tag}]"),
                LinExpr::term(aux_fwd, 1).plus(aux_bwd, 1).plus(chi[b], -1),
                CmpOp::Le,
                0,
            );
        }
    }
}

impl Subproblem {
    /// Requests that received no variables (no capable operator today).
    pub fn unsatisfiable(&self) -> &[ServiceRequest] {
        &self.unsatisfiable
    }

    /// Requests that received variables.
    pub fn satisfiable(&self) -> &[ServiceRequest] {
        &self.satisfiable
    }

    /// Decodes a solver assignment into scheduled entries.
    ///
    /// One entry per chi variable set to 1; times drop the +1 offset.
    pub fn decode(&self, values: &[f64]) -> Vec<ScheduledService> {
        let mut scheduled = Vec::new();
        for (candidate, &chi_var) in self.chi_index.iter().zip(&self.chi) {
            if values[chi_var.index()] >= 0.5 {
                let request = &self.satisfiable[candidate.request];
                let time = values[self.t[candidate.request].index()].round() as i64 - 1;
                scheduled.push(ScheduledService {
                    patient: request.patient.clone(),
                    service: request.service.clone(),
                    care_unit: candidate.care_unit.clone(),
                    operator: candidate.operator.clone(),
                    time,
                });
            }
        }
        scheduled.sort();
        scheduled
    }

    /// Requests not performed under the given assignment: the structurally
    /// unsatisfiable ones plus every `x = 0` request.
    pub fn rejected(&self, values: &[f64]) -> Vec<ServiceRequest> {
        let mut rejected = self.unsatisfiable.clone();
        for (request, &x_var) in self.satisfiable.iter().zip(&self.x) {
            if values[x_var.index()] < 0.5 {
                rejected.push(request.clone());
            }
        }
        rejected.sort();
        rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Operator;
    use crate::solver::{GoodLpSolver, Solver, SolverConfig};

    fn sample_services() -> BTreeMap<String, Service> {
        let mut services = BTreeMap::new();
        services.insert("srv00".into(), Service::new("cu00", 2));
        services.insert("srv01".into(), Service::new("cu00", 3));
        services.insert("srv02".into(), Service::new("cu01", 2));
        services
    }

    fn sample_roster() -> DayRoster {
        let mut roster = DayRoster::new();
        let cu0 = roster.entry("cu00".into()).or_default();
        cu0.insert("op00".into(), Operator::new(0, 6));
        cu0.insert("op01".into(), Operator::new(2, 4));
        roster.entry("cu01".into()).or_default();
        roster
    }

    fn requests(pairs: &[(&str, &str)]) -> Vec<ServiceRequest> {
        pairs
            .iter()
            .map(|(p, s)| ServiceRequest::new(*p, *s))
            .collect()
    }

    #[test]
    fn test_short_operators_are_not_candidates() {
        let services = sample_services();
        let roster = sample_roster();
        let builder = SubproblemBuilder::new(&services, &roster);

        let (satisfiable, _) =
            builder.operator_candidates(&requests(&[("pat00", "srv01")]));
        // srv01 lasts 3 slots; op01 (duration 4) and op00 (6) both qualify.
        assert_eq!(satisfiable[0].1.len(), 2);

        let mut roster2 = sample_roster();
        roster2.get_mut("cu00").unwrap().get_mut("op01").unwrap().duration = 2;
        let builder2 = SubproblemBuilder::new(&services, &roster2);
        let (satisfiable2, _) =
            builder2.operator_candidates(&requests(&[("pat00", "srv01")]));
        assert_eq!(satisfiable2[0].1.len(), 1);
    }

    #[test]
    fn test_empty_care_unit_makes_request_unsatisfiable() {
        let services = sample_services();
        let roster = sample_roster();
        let builder = SubproblemBuilder::new(&services, &roster);

        let subproblem = builder.build(&requests(&[("pat00", "srv02")]));
        assert_eq!(subproblem.unsatisfiable().len(), 1);
        assert_eq!(subproblem.model.var_count(), 0);
        assert_eq!(subproblem.rejected(&[]).len(), 1);
    }

    #[test]
    fn test_linking_constraints_reject_inconsistent_assignments() {
        let services = sample_services();
        let roster = sample_roster();
        let builder = SubproblemBuilder::new(&services, &roster);
        let subproblem = builder.build(&requests(&[("pat00", "srv00")]));

        // Vars: x, t, chi[op00], chi[op01].
        // Performed at slot 0 (offset 1) by op00: consistent.
        assert!(subproblem
            .model
            .first_violation(&[1.0, 1.0, 1.0, 0.0])
            .is_none());
        // x = 1 with t = 0 violates t ≥ x.
        assert_eq!(
            subproblem.model.first_violation(&[1.0, 0.0, 1.0, 0.0]),
            Some("t_ge_x[pat00,srv00]")
        );
        // x = 1 with no operator violates the channeling equality.
        assert_eq!(
            subproblem.model.first_violation(&[1.0, 1.0, 0.0, 0.0]),
            Some("x_links_chi[pat00,srv00]")
        );
    }

    #[test]
    fn test_operator_shift_is_respected() {
        let services = sample_services();
        let roster = sample_roster();
        let builder = SubproblemBuilder::new(&services, &roster);
        let subproblem = builder.build(&requests(&[("pat00", "srv00")]));

        // op01 starts at slot 2 (offset 3): performing srv00 at slot 0
        // (offset 1) through op01 must violate respect_start.
        assert_eq!(
            subproblem.model.first_violation(&[1.0, 1.0, 0.0, 1.0]),
            Some("respect_start[pat00,srv00,op01]")
        );
        // Slot 2 (offset 3) through op01 is fine: [2, 4) ⊆ [2, 6).
        assert!(subproblem
            .model
            .first_violation(&[1.0, 3.0, 0.0, 1.0])
            .is_none());
    }

    #[test]
    fn test_solve_places_both_services_of_one_patient() {
        let services = sample_services();
        let roster = sample_roster();
        let builder = SubproblemBuilder::new(&services, &roster);
        let subproblem =
            builder.build(&requests(&[("pat00", "srv00"), ("pat00", "srv01")]));

        let outcome = GoodLpSolver::new()
            .solve(&subproblem.model, &SolverConfig::default())
            .unwrap();
        let scheduled = subproblem.decode(&outcome.values);

        // Both fit sequentially (2 + 3 ≤ 6 slots), on any operators.
        assert_eq!(scheduled.len(), 2);
        assert!(subproblem.rejected(&outcome.values).is_empty());
        let (a, b) = (&scheduled[0], &scheduled[1]);
        let dur_a = services[&a.service].duration;
        let dur_b = services[&b.service].duration;
        assert!(a.time + dur_a <= b.time || b.time + dur_b <= a.time);
    }

    #[test]
    fn test_solve_capacity_conflict_rejects_one_request() {
        // Single short operator: two 2-slot services cannot both fit a
        // 3-slot shift.
        let mut services = BTreeMap::new();
        services.insert("srv00".into(), Service::new("cu00", 2));
        let mut roster = DayRoster::new();
        roster
            .entry("cu00".into())
            .or_default()
            .insert("op00".into(), Operator::new(0, 3));

        let builder = SubproblemBuilder::new(&services, &roster);
        let subproblem =
            builder.build(&requests(&[("pat00", "srv00"), ("pat01", "srv00")]));

        let outcome = GoodLpSolver::new()
            .solve(&subproblem.model, &SolverConfig::default())
            .unwrap();
        let scheduled = subproblem.decode(&outcome.values);
        let rejected = subproblem.rejected(&outcome.values);

        assert_eq!(scheduled.len(), 1);
        assert_eq!(rejected.len(), 1);
    }
}
