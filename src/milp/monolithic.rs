//! Monolithic model: window, day and operator choice in one solve.
//!
//! The monolithic formulation spans the whole horizon without the
//! master/subproblem split. Each request window gets a satisfaction binary
//! and an offset time variable; each (patient, service, day, care unit,
//! operator) tuple reachable from a window gets an assignment binary, and
//! `Σ do = window` channels the two layers.
//!
//! Unlike the decomposed master, window exclusivity across *overlapping*
//! windows of the same request is soft: firing days of both windows of an
//! overlapping pair costs a large constant in the objective instead of being
//! forbidden outright, so the solver groups overlapping occurrences rather
//! than losing feasibility.

use std::collections::BTreeSet;

use tracing::debug;

use crate::models::{Instance, RejectedRequest, RequestWindow, ScheduleResult, ScheduledService};
use crate::windows::{expand_windows, requested_pairs};

use super::bounds::max_reachable_time;
use super::model::{CmpOp, LinExpr, Model, Sense, VarId};
use super::pairs::canonical_pairs;

/// Objective penalty charged when the firing days of an overlapping window
/// pair are both used.
const WINDOW_OVERLAP_PENALTY: i64 = 1000;

/// One (patient, service, day, care unit, operator) assignment candidate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DoCandidate {
    /// Requesting patient name.
    pub patient: String,
    /// Requested service name.
    pub service: String,
    /// Day of the assignment.
    pub day: i64,
    /// Care unit providing the operator.
    pub care_unit: String,
    /// Operator name.
    pub operator: String,
}

impl DoCandidate {
    /// Whether this candidate belongs to the window's request and falls on
    /// one of its days.
    fn covered_by(&self, window: &RequestWindow) -> bool {
        self.patient == window.patient
            && self.service == window.service
            && window.contains_day(self.day)
    }
}

/// Builds the whole-horizon model.
#[derive(Debug, Clone, Copy)]
pub struct MonolithicBuilder<'a> {
    instance: &'a Instance,
    redundant_cuts: bool,
    uniform_operator_bounds: bool,
}

/// An assembled monolithic model plus the index data needed to decode
/// solutions.
#[derive(Debug, Clone)]
pub struct MonolithicProblem {
    /// The assembled model.
    pub model: Model,
    windows: Vec<RequestWindow>,
    window_vars: Vec<VarId>,
    time_vars: Vec<VarId>,
    do_index: Vec<DoCandidate>,
    do_vars: Vec<VarId>,
    pair_rejections: Vec<RejectedRequest>,
}

impl<'a> MonolithicBuilder<'a> {
    /// Creates a builder over the given instance.
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            redundant_cuts: true,
            uniform_operator_bounds: false,
        }
    }

    /// Enables or disables the redundant tightening cuts (default on).
    ///
    /// The cuts bound per-patient-per-day and per-operator aggregate
    /// durations; they never change feasibility or the optimum.
    pub fn with_redundant_cuts(mut self, enabled: bool) -> Self {
        self.redundant_cuts = enabled;
        self
    }

    /// Replaces the per-operator time linking with the cheaper care-unit-wide
    /// bound (default off).
    ///
    /// Only sound when every operator of a care unit shares the same start
    /// and duration on every day; with heterogeneous rosters it can place
    /// services outside the chosen operator's shift.
    pub fn with_uniform_operator_bounds(mut self, enabled: bool) -> Self {
        self.uniform_operator_bounds = enabled;
        self
    }

    /// Latest reachable end time of a care unit on a day (1 when unstaffed).
    fn max_time(&self, day: i64, care_unit: &str) -> i64 {
        self.instance
            .roster(day)
            .and_then(|roster| roster.get(care_unit))
            .map(max_reachable_time)
            .unwrap_or(1)
    }

    /// Assignment candidates: for every window, every staffed day in its
    /// range × every operator of the service's care unit that day.
    pub fn do_candidates(&self, windows: &[RequestWindow]) -> BTreeSet<DoCandidate> {
        let mut candidates = BTreeSet::new();
        for window in windows {
            let Some(service) = self.instance.services.get(&window.service) else {
                continue;
            };
            for day in window.start_day..=window.end_day {
                let Some(cu) = self
                    .instance
                    .roster(day)
                    .and_then(|roster| roster.get(&service.care_unit))
                else {
                    continue;
                };
                for operator in cu.keys() {
                    candidates.insert(DoCandidate {
                        patient: window.patient.clone(),
                        service: window.service.clone(),
                        day,
                        care_unit: service.care_unit.clone(),
                        operator: operator.clone(),
                    });
                }
            }
        }
        candidates
    }

    /// Potentially-conflicting candidate pairs: same day, not the same
    /// request, sharing the patient or the (care unit, operator).
    ///
    /// Canonical enumeration keeps one ordering per unordered pair.
    pub fn overlap_pairs(&self, do_index: &[DoCandidate]) -> Vec<(usize, usize)> {
        canonical_pairs(do_index.len())
            .filter(|&(a, b)| {
                let (ca, cb) = (&do_index[a], &do_index[b]);
                if ca.day != cb.day {
                    return false;
                }
                if ca.patient == cb.patient && ca.service == cb.service {
                    return false;
                }
                ca.patient == cb.patient
                    || (ca.care_unit == cb.care_unit && ca.operator == cb.operator)
            })
            .collect()
    }

    /// Pairs of distinct windows of the same request whose day ranges
    /// intersect.
    pub fn window_overlap_pairs(&self, windows: &[RequestWindow]) -> Vec<(usize, usize)> {
        canonical_pairs(windows.len())
            .filter(|&(a, b)| {
                let (wa, wb) = (&windows[a], &windows[b]);
                wa.patient == wb.patient && wa.service == wb.service && wa.intersects(wb)
            })
            .collect()
    }

    /// Assembles the monolithic model.
    pub fn build(&self) -> MonolithicProblem {
        let mut model = Model::new("monolithic");

        let windows = expand_windows(self.instance);
        let do_index: Vec<DoCandidate> = self.do_candidates(&windows).into_iter().collect();

        // Cross-indexes between windows and candidates of the same request.
        let window_dos: Vec<Vec<usize>> = windows
            .iter()
            .map(|window| {
                do_index
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.covered_by(window))
                    .map(|(p, _)| p)
                    .collect()
            })
            .collect();
        let do_windows: Vec<Vec<usize>> = do_index
            .iter()
            .map(|candidate| {
                windows
                    .iter()
                    .enumerate()
                    .filter(|(_, w)| candidate.covered_by(w))
                    .map(|(w, _)| w)
                    .collect()
            })
            .collect();

        // Window satisfaction and offset time variables. The time upper
        // bound is the latest reachable end over the window's days minus the
        // service duration; the lower bound stays 0 so an unsatisfied window
        // never pins its (unused) time variable to an impossible value.
        let mut window_vars = Vec::with_capacity(windows.len());
        let mut time_vars = Vec::with_capacity(windows.len());
        for window in &windows {
            let tag = format!(
                "{},{},{},{}",
                window.patient, window.service, window.start_day, window.end_day
            );
            let service = &self.instance.services[&window.service];
            let reachable = (window.start_day..=window.end_day)
                .map(|day| self.max_time(day, &service.care_unit))
                .max()
                .unwrap_or(1);
            window_vars.push(model.add_binary(format!("window[{tag}]")));
            time_vars.push(model.add_integer(
                format!("time[{tag}]"),
                0,
                (reachable - service.duration).max(0),
            ));
        }

        let do_vars: Vec<VarId> = do_index
            .iter()
            .map(|c| {
                model.add_binary(format!(
                    "do[{},{},{},{},{}]",
                    c.patient, c.service, c.day, c.care_unit, c.operator
                ))
            })
            .collect();

        self.emit_window_links(&mut model, &windows, &window_vars, &do_vars, &window_dos);
        if self.uniform_operator_bounds {
            self.emit_uniform_time_links(&mut model, &windows, &window_vars, &time_vars);
        } else {
            self.emit_operator_time_links(
                &mut model,
                &windows,
                &time_vars,
                &do_index,
                &do_vars,
                &do_windows,
            );
        }
        self.emit_overlap_disjunctions(
            &mut model,
            &time_vars,
            &do_index,
            &do_vars,
            &do_windows,
        );
        if self.redundant_cuts {
            self.emit_redundant_cuts(&mut model, &do_index, &do_vars);
        }
        let window_overlap_vars =
            self.emit_window_overlaps(&mut model, &windows, &do_index, &do_vars);

        // Maximize satisfied durations weighted by priority, minus the
        // overlapping-window penalty.
        let mut objective = LinExpr::new();
        for (window, &window_var) in windows.iter().zip(&window_vars) {
            let duration = self.instance.services[&window.service].duration;
            let priority = self.instance.patients[&window.patient].effective_priority();
            objective.add(window_var, duration * priority);
        }
        for &wo_var in &window_overlap_vars {
            objective.add(wo_var, -WINDOW_OVERLAP_PENALTY);
        }
        model.set_objective(Sense::Maximize, objective);

        // Requests whose every window fell outside the horizon never enter
        // the model; they are rejected up front.
        let window_pairs: BTreeSet<(&str, &str)> = windows
            .iter()
            .map(|w| (w.patient.as_str(), w.service.as_str()))
            .collect();
        let pair_rejections = requested_pairs(self.instance)
            .into_iter()
            .filter(|pair| !window_pairs.contains(&(pair.patient.as_str(), pair.service.as_str())))
            .map(|pair| RejectedRequest::pair(pair.patient, pair.service))
            .collect();

        debug!(
            windows = windows.len(),
            do_candidates = do_index.len(),
            vars = model.var_count(),
            constraints = model.constraint_count(),
            "monolithic model assembled"
        );

        MonolithicProblem {
            model,
            windows,
            window_vars,
            time_vars,
            do_index,
            do_vars,
            pair_rejections,
        }
    }

    /// `Σ do over the window's days = window` channeling.
    fn emit_window_links(
        &self,
        model: &mut Model,
        windows: &[RequestWindow],
        window_vars: &[VarId],
        do_vars: &[VarId],
        window_dos: &[Vec<usize>],
    ) {
        for (w, window) in windows.iter().enumerate() {
            let mut expr = LinExpr::new();
            for &p in &window_dos[w] {
                expr.add(do_vars[p], 1);
            }
            expr.add(window_vars[w], -1);
            model.add_constraint(
                format!(
                    "window_links_do[{},{},{}..{}]",
                    window.patient, window.service, window.start_day, window.end_day
                ),
                expr,
                CmpOp::Eq,
                0,
            );
        }
    }

    /// Care-unit-wide time linking (uniform rosters only): `time` is positive
    /// exactly when the window fires, bounded by the care unit's max time.
    fn emit_uniform_time_links(
        &self,
        model: &mut Model,
        windows: &[RequestWindow],
        window_vars: &[VarId],
        time_vars: &[VarId],
    ) {
        for (w, window) in windows.iter().enumerate() {
            let service = &self.instance.services[&window.service];
            let max_time = self.max_time(window.start_day, &service.care_unit);
            let tag = format!(
                "{},{},{}..{}",
                window.patient, window.service, window.start_day, window.end_day
            );
            model.add_constraint(
                format!("time_le_window[{tag}]"),
                LinExpr::term(time_vars[w], 1)
                    .plus(window_vars[w], -(max_time - service.duration)),
                CmpOp::Le,
                0,
            );
            model.add_constraint(
                format!("window_le_time[{tag}]"),
                LinExpr::term(window_vars[w], 1).plus(time_vars[w], -1),
                CmpOp::Le,
                0,
            );
        }
    }

    /// Per-operator time linking: the service interval must fit the chosen
    /// operator's shift, via big-M on each (candidate, covering window) pair.
    fn emit_operator_time_links(
        &self,
        model: &mut Model,
        windows: &[RequestWindow],
        time_vars: &[VarId],
        do_index: &[DoCandidate],
        do_vars: &[VarId],
        do_windows: &[Vec<usize>],
    ) {
        for (p, candidate) in do_index.iter().enumerate() {
            let duration = self.instance.services[&candidate.service].duration;
            let Some(operator) = self
                .instance
                .roster(candidate.day)
                .and_then(|r| r.get(&candidate.care_unit))
                .and_then(|cu| cu.get(&candidate.operator))
            else {
                continue;
            };
            let max_time = self.max_time(candidate.day, &candidate.care_unit);
            let shift_start = operator.start + 1;
            let shift_end = shift_start + operator.duration;

            for &w in &do_windows[p] {
                let tag = format!(
                    "{},{},{},{},{}..{}",
                    candidate.patient,
                    candidate.service,
                    candidate.day,
                    candidate.operator,
                    windows[w].start_day,
                    windows[w].end_day
                );
                model.add_constraint(
                    format!("operator_start[{tag}]"),
                    LinExpr::term(do_vars[p], shift_start).plus(time_vars[w], -1),
                    CmpOp::Le,
                    0,
                );
                // time + duration ≤ shift_end + (1 − do) · M
                model.add_constraint(
                    format!("operator_end[{tag}]"),
                    LinExpr::term(time_vars[w], 1).plus(do_vars[p], max_time),
                    CmpOp::Le,
                    shift_end + max_time - duration,
                );
            }
        }
    }

    /// Ordering disjunctions for candidate pairs sharing a patient or an
    /// operator on the same day, joined with every covering window pair.
    fn emit_overlap_disjunctions(
        &self,
        model: &mut Model,
        time_vars: &[VarId],
        do_index: &[DoCandidate],
        do_vars: &[VarId],
        do_windows: &[Vec<usize>],
    ) {
        for (a, b) in self.overlap_pairs(do_index) {
            let (ca, cb) = (&do_index[a], &do_index[b]);
            let dur_a = self.instance.services[&ca.service].duration;
            let dur_b = self.instance.services[&cb.service].duration;
            let max_a = self.max_time(ca.day, &ca.care_unit);
            let max_b = self.max_time(cb.day, &cb.care_unit);

            let tag = format!(
                "{},{},{},{},{},{},{}",
                ca.patient, ca.service, cb.patient, cb.service, ca.day, ca.operator, cb.operator
            );
            let aux_fwd = model.add_binary(format!("overlap_aux1[{tag}]"));
            let aux_bwd = model.add_binary(format!("overlap_aux2[{tag}]"));

            for &wa in &do_windows[a] {
                for &wb in &do_windows[b] {
                    model.add_constraint(
                        format!("no_overlap_fwd[{tag},{wa},{wb}]"),
                        LinExpr::term(time_vars[wa], 1)
                            .plus(do_vars[a], dur_a)
                            .plus(aux_fwd, max_a)
                            .plus(time_vars[wb], -1),
                        CmpOp::Le,
                        max_a,
                    );
                    model.add_constraint(
                        format!("no_overlap_bwd[{tag},{wa},{wb}]"),
                        LinExpr::term(time_vars[wb], 1)
                            .plus(do_vars[b], dur_b)
                            .plus(aux_bwd, max_b)
                            .plus(time_vars[wa], -1),
                        CmpOp::Le,
                        max_b,
                    );
                }
            }

            // The auxiliaries sum to one exactly when both candidates fire.
            model.add_constraint(
                format!("overlap_gate1[{tag}]"),
                LinExpr::term(do_vars[a], 1)
                    .plus(do_vars[b], 1)
                    .plus(aux_fwd, -1)
                    .plus(aux_bwd, -1),
                CmpOp::Le,
                1,
            );
            model.add_constraint(
                format!("overlap_gate2[{tag}]"),
                LinExpr::term(aux_fwd, 1).plus(aux_bwd, 1).plus(do_vars[a], -1),
                CmpOp::Le,
                0,
            );
            model.add_constraint(
                format!("overlap_gate3[{tag}]"),
                LinExpr::term(aux_fwd, 1).plus(aux_bwd, 1).plus(do_vars[b], -1),
                CmpOp::Le,
                0,
            );
        }
    }

    /// Optional aggregate cuts. Feasibility- and optimum-preserving; they
    /// only tighten the linear relaxation.
    fn emit_redundant_cuts(&self, model: &mut Model, do_index: &[DoCandidate], do_vars: &[VarId]) {
        // Per patient and day: total assigned duration within the busiest
        // involved care unit's reachable time.
        let patient_days: BTreeSet<(&str, i64)> = do_index
            .iter()
            .map(|c| (c.patient.as_str(), c.day))
            .collect();
        for (patient, day) in patient_days {
            let mut expr = LinExpr::new();
            let mut bound = 0;
            for (p, candidate) in do_index.iter().enumerate() {
                if candidate.patient != patient || candidate.day != day {
                    continue;
                }
                expr.add(do_vars[p], self.instance.services[&candidate.service].duration);
                bound = bound.max(self.max_time(day, &candidate.care_unit));
            }
            model.add_constraint(
                format!("patient_day_cut[{patient},{day}]"),
                expr,
                CmpOp::Le,
                bound,
            );
        }

        // Per operator: total assigned duration within the shift duration.
        let operators: BTreeSet<(i64, &str, &str)> = do_index
            .iter()
            .map(|c| (c.day, c.care_unit.as_str(), c.operator.as_str()))
            .collect();
        for (day, care_unit, operator) in operators {
            let Some(op) = self
                .instance
                .roster(day)
                .and_then(|r| r.get(care_unit))
                .and_then(|cu| cu.get(operator))
            else {
                continue;
            };
            let mut expr = LinExpr::new();
            for (p, candidate) in do_index.iter().enumerate() {
                if candidate.day == day
                    && candidate.care_unit == care_unit
                    && candidate.operator == operator
                {
                    expr.add(do_vars[p], self.instance.services[&candidate.service].duration);
                }
            }
            model.add_constraint(
                format!("operator_cut[{day},{care_unit},{operator}]"),
                expr,
                CmpOp::Le,
                op.duration,
            );
        }
    }

    /// Soft exclusivity over overlapping windows of the same request: using
    /// more than one firing day across the pair's combined span sets the
    /// penalized indicator.
    fn emit_window_overlaps(
        &self,
        model: &mut Model,
        windows: &[RequestWindow],
        do_index: &[DoCandidate],
        do_vars: &[VarId],
    ) -> Vec<VarId> {
        let mut wo_vars = Vec::new();
        for (a, b) in self.window_overlap_pairs(windows) {
            let (wa, wb) = (&windows[a], &windows[b]);
            let span_start = wa.start_day.min(wb.start_day);
            let span_end = wa.end_day.max(wb.end_day);
            let tag = format!(
                "{},{},{}..{},{}..{}",
                wa.patient, wa.service, wa.start_day, wa.end_day, wb.start_day, wb.end_day
            );

            let wo = model.add_binary(format!("window_overlap[{tag}]"));
            wo_vars.push(wo);

            let mut expr = LinExpr::new();
            for (p, candidate) in do_index.iter().enumerate() {
                if candidate.patient == wa.patient
                    && candidate.service == wa.service
                    && candidate.day >= span_start
                    && candidate.day <= span_end
                {
                    expr.add(do_vars[p], 1);
                }
            }
            expr.add(wo, -1);
            model.add_constraint(format!("window_overlap_soft[{tag}]"), expr, CmpOp::Le, 1);
        }
        wo_vars
    }
}

impl MonolithicProblem {
    /// Expanded request windows indexing the model.
    pub fn windows(&self) -> &[RequestWindow] {
        &self.windows
    }

    /// Assignment candidates indexing the `do` variables.
    pub fn do_index(&self) -> &[DoCandidate] {
        &self.do_index
    }

    /// Decodes a solver assignment into a schedule result.
    ///
    /// Each fired candidate emits exactly one entry; its time comes from the
    /// first satisfied window covering the candidate's day. Unsatisfied
    /// windows are reported with their bounds; requests that never entered
    /// the model are reported pair-level.
    pub fn decode(&self, values: &[f64]) -> ScheduleResult {
        let mut result = ScheduleResult::new();

        for (p, candidate) in self.do_index.iter().enumerate() {
            if values[self.do_vars[p].index()] < 0.5 {
                continue;
            }
            let time = self
                .windows
                .iter()
                .enumerate()
                .find(|(w, window)| {
                    candidate.covered_by(window)
                        && values[self.window_vars[*w].index()] >= 0.5
                })
                .map(|(w, _)| values[self.time_vars[w].index()].round() as i64 - 1);
            let Some(time) = time else {
                continue;
            };
            result.add_scheduled(
                candidate.day,
                ScheduledService {
                    patient: candidate.patient.clone(),
                    service: candidate.service.clone(),
                    care_unit: candidate.care_unit.clone(),
                    operator: candidate.operator.clone(),
                    time,
                },
            );
        }

        for (w, window) in self.windows.iter().enumerate() {
            if values[self.window_vars[w].index()] < 0.5 {
                result.rejected.push(RejectedRequest::window(
                    &window.patient,
                    &window.service,
                    window.start_day,
                    window.end_day,
                ));
            }
        }
        result.rejected.extend(self.pair_rejections.iter().cloned());
        result.normalize();
        result
    }
}
