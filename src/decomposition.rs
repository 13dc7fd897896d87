//! Solve orchestration.
//!
//! [`DecomposedScheduler`] drives the two-stage pipeline: build and solve
//! the master day-assignment model, then one independent subproblem per day
//! with at least one assigned request, then aggregate. Day subproblems share
//! no operators, so they are dispatched to a worker pool and joined before
//! aggregation; an infeasible day only rejects that day's requests.
//!
//! The pipeline is single-pass by design: a request the master placed on a
//! day its subproblem cannot serve is rejected, never retried on another
//! day. The final rejected list is computed *after* all subproblems resolve,
//! as requested pairs minus scheduled pairs.
//!
//! [`MonolithicScheduler`] is the single-shot alternative: one whole-horizon
//! model, no decomposition.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::milp::{MasterProblemBuilder, MonolithicBuilder, SubproblemBuilder};
use crate::models::{Instance, RejectedRequest, ScheduleResult, ScheduledService};
use crate::solver::{SolveError, SolveStatus, Solver, SolverConfig, SolverOutcome};
use crate::windows::{expand_windows, requested_pairs};

/// Two-stage master/subproblem scheduler.
#[derive(Debug, Clone, Copy)]
pub struct DecomposedScheduler<'a> {
    instance: &'a Instance,
}

impl<'a> DecomposedScheduler<'a> {
    /// Creates a scheduler over the given instance.
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Runs master → per-day subproblems → aggregation.
    ///
    /// The reported objective value is the aggregate of the day subproblem
    /// objectives (total duration actually placed); status, bounds and gap
    /// come from the master solve.
    pub fn solve<S: Solver + Sync>(
        &self,
        solver: &S,
        config: &SolverConfig,
    ) -> Result<ScheduleResult, SolveError> {
        let build_start = Instant::now();
        let windows = expand_windows(self.instance);
        let master = MasterProblemBuilder::new(self.instance).build(&windows);
        let mut creation_secs = build_start.elapsed().as_secs_f64();

        info!(
            windows = windows.len(),
            candidates = master.candidate_count(),
            "master stage"
        );
        if master.model.var_count() == 0 {
            // No candidate (patient, service, day) at all: nothing to solve,
            // everything requested is rejected.
            let mut result = ScheduleResult::new();
            result.info.method = "milp_decomposed".into();
            result.info.status = SolveStatus::Optimal.as_str().into();
            self.finish(&mut result, creation_secs, 0.0, 0.0);
            return Ok(result);
        }
        let master_outcome = solver.solve(&master.model, config)?;
        let mut solving_secs = master_outcome.solve_time.as_secs_f64();

        let mut result = ScheduleResult::new();
        result.info.method = "milp_decomposed".into();
        result.info.status = master_outcome.status.as_str().into();
        result.info.lower_bound = master_outcome.lower_bound;
        result.info.upper_bound = master_outcome.upper_bound;
        result.info.gap = master_outcome.gap;

        if !master_outcome.is_solution_found() {
            // No day assignment exists: everything requested is rejected.
            warn!("master model infeasible; rejecting all requests");
            self.finish(&mut result, creation_secs, solving_secs, 0.0);
            return Ok(result);
        }

        let day_requests = master.decode(&master_outcome.values);
        debug!(days = day_requests.len(), "master assigned days");

        // Day subproblems are independent (disjoint rosters): solve them on
        // the worker pool and join before aggregating.
        let day_outcomes: Vec<DaySolve> = day_requests
            .par_iter()
            .map(|(&day, requests)| self.solve_day(day, requests, solver, config))
            .collect::<Result<_, _>>()?;

        let mut objective = 0.0;
        for outcome in day_outcomes {
            creation_secs += outcome.creation_secs;
            solving_secs += outcome.solving_secs;
            objective += outcome.objective;
            for entry in outcome.scheduled {
                result.add_scheduled(outcome.day, entry);
            }
        }

        self.finish(&mut result, creation_secs, solving_secs, objective);
        Ok(result)
    }

    /// Builds and solves one day's subproblem.
    fn solve_day<S: Solver>(
        &self,
        day: i64,
        requests: &[crate::models::ServiceRequest],
        solver: &S,
        config: &SolverConfig,
    ) -> Result<DaySolve, SolveError> {
        let empty = crate::models::DayRoster::new();
        let roster = self.instance.roster(day).unwrap_or(&empty);

        let build_start = Instant::now();
        let subproblem = SubproblemBuilder::new(&self.instance.services, roster).build(requests);
        let creation_secs = build_start.elapsed().as_secs_f64();

        if subproblem.model.var_count() == 0 {
            // Nothing satisfiable today (e.g. every operator shorter than
            // the requested services); no model to solve.
            return Ok(DaySolve {
                day,
                scheduled: Vec::new(),
                creation_secs,
                solving_secs: 0.0,
                objective: 0.0,
            });
        }

        let outcome = solver.solve(&subproblem.model, config)?;
        if !outcome.is_solution_found() {
            // Only this day's requests are lost; the other days aggregate
            // normally.
            warn!(day, "day subproblem infeasible; rejecting its requests");
            return Ok(DaySolve {
                day,
                scheduled: Vec::new(),
                creation_secs,
                solving_secs: outcome.solve_time.as_secs_f64(),
                objective: 0.0,
            });
        }

        let scheduled = subproblem.decode(&outcome.values);
        debug!(day, scheduled = scheduled.len(), "day solved");
        Ok(DaySolve {
            day,
            scheduled,
            creation_secs,
            solving_secs: outcome.solve_time.as_secs_f64(),
            objective: outcome.objective,
        })
    }

    /// Fills the rejected list and info block, and normalizes ordering.
    fn finish(
        &self,
        result: &mut ScheduleResult,
        creation_secs: f64,
        solving_secs: f64,
        objective: f64,
    ) {
        let scheduled = result.scheduled_pairs();
        for pair in requested_pairs(self.instance) {
            if !scheduled.contains(&pair) {
                result
                    .rejected
                    .push(RejectedRequest::pair(pair.patient, pair.service));
            }
        }
        result.info.model_creation_secs = creation_secs;
        result.info.model_solving_secs = solving_secs;
        result.info.objective_value = objective;
        result.normalize();
    }
}

/// One day's solved subproblem, ready for aggregation.
struct DaySolve {
    day: i64,
    scheduled: Vec<ScheduledService>,
    creation_secs: f64,
    solving_secs: f64,
    objective: f64,
}

/// Single-shot whole-horizon scheduler.
#[derive(Debug, Clone, Copy)]
pub struct MonolithicScheduler<'a> {
    instance: &'a Instance,
    redundant_cuts: bool,
}

impl<'a> MonolithicScheduler<'a> {
    /// Creates a scheduler over the given instance.
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            redundant_cuts: true,
        }
    }

    /// Enables or disables the redundant tightening cuts (default on).
    pub fn with_redundant_cuts(mut self, enabled: bool) -> Self {
        self.redundant_cuts = enabled;
        self
    }

    /// Builds and solves the monolithic model.
    pub fn solve<S: Solver>(
        &self,
        solver: &S,
        config: &SolverConfig,
    ) -> Result<ScheduleResult, SolveError> {
        let build_start = Instant::now();
        let problem = MonolithicBuilder::new(self.instance)
            .with_redundant_cuts(self.redundant_cuts)
            .build();
        let creation_secs = build_start.elapsed().as_secs_f64();

        info!(
            windows = problem.windows().len(),
            candidates = problem.do_index().len(),
            "monolithic stage"
        );
        let outcome = if problem.model.var_count() == 0 {
            SolverOutcome {
                status: SolveStatus::Optimal,
                values: Vec::new(),
                objective: 0.0,
                lower_bound: 0.0,
                upper_bound: 0.0,
                gap: 0.0,
                solve_time: std::time::Duration::ZERO,
            }
        } else {
            solver.solve(&problem.model, config)?
        };

        let mut result = if outcome.is_solution_found() {
            problem.decode(&outcome.values)
        } else {
            // All-zero is always feasible for this model, so infeasibility
            // only arrives from bounded external backends; reject everything.
            let mut empty = ScheduleResult::new();
            for pair in requested_pairs(self.instance) {
                empty
                    .rejected
                    .push(RejectedRequest::pair(pair.patient, pair.service));
            }
            empty.normalize();
            empty
        };

        result.info.method = "milp_monolithic".into();
        result.info.model_creation_secs = creation_secs;
        result.info.model_solving_secs = outcome.solve_time.as_secs_f64();
        result.info.status = outcome.status.as_str().into();
        result.info.lower_bound = outcome.lower_bound;
        result.info.upper_bound = outcome.upper_bound;
        result.info.gap = outcome.gap;
        result.info.objective_value = outcome.objective;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DayRoster, Operator, Patient, Protocol, ProtocolService, Service, ServiceRequest,
    };
    use crate::solver::{GoodLpSolver, SolverOutcome};
    use crate::validation::validate_result;
    use std::time::Duration;

    fn full_day_roster(care_unit: &str, operators: usize, slots: i64) -> DayRoster {
        let mut roster = DayRoster::new();
        let cu = roster.entry(care_unit.into()).or_default();
        for i in 0..operators {
            cu.insert(format!("op{i:02}"), Operator::new(0, slots));
        }
        roster
    }

    fn one_shot_patient(service: &str, start: i64, tolerance: i64) -> Patient {
        Patient::new().with_protocol(
            "prot00",
            Protocol::new(0).with_service(ProtocolService::new(service, start, tolerance, 7, 1)),
        )
    }

    /// Scenario: one patient, one service, tolerance 0, frequency 10,
    /// times 2, horizon 0..20, one full-day operator.
    fn periodic_instance() -> Instance {
        let mut instance = Instance::new();
        instance.services.insert("srv00".into(), Service::new("cu00", 2));
        for day in 0..=20 {
            instance.days.insert(day, full_day_roster("cu00", 1, 8));
        }
        instance.patients.insert(
            "pat00".into(),
            Patient::new().with_protocol(
                "prot00",
                Protocol::new(0).with_service(ProtocolService::new("srv00", 0, 0, 10, 2)),
            ),
        );
        instance
    }

    #[test]
    fn test_decomposed_schedules_both_periodic_occurrences() {
        let instance = periodic_instance();
        let result = DecomposedScheduler::new(&instance)
            .solve(&GoodLpSolver::new(), &SolverConfig::default())
            .unwrap();

        assert_eq!(result.scheduled_count(), 2);
        assert!(result.rejected.is_empty());
        assert_eq!(result.info.method, "milp_decomposed");
        assert_eq!(result.info.status, "optimal");
        assert!(validate_result(&instance, &result).is_ok());
    }

    #[test]
    fn test_capacity_conflict_rejects_exactly_one() {
        // Two patients requesting the same single-operator care unit on the
        // same day; combined duration exceeds the shift.
        let mut instance = Instance::new();
        instance.services.insert("srv00".into(), Service::new("cu00", 2));
        instance.days.insert(0, full_day_roster("cu00", 1, 3));
        instance
            .patients
            .insert("pat00".into(), one_shot_patient("srv00", 0, 0));
        instance
            .patients
            .insert("pat01".into(), one_shot_patient("srv00", 0, 0));

        let result = DecomposedScheduler::new(&instance)
            .solve(&GoodLpSolver::new(), &SolverConfig::default())
            .unwrap();

        assert_eq!(result.scheduled_count(), 1);
        assert_eq!(result.rejected.len(), 1);
        assert!(validate_result(&instance, &result).is_ok());
    }

    #[test]
    fn test_unstaffed_care_unit_rejects_request() {
        // The requested care unit has no operators on the only window day.
        let mut instance = Instance::new();
        instance.services.insert("srv00".into(), Service::new("cu00", 2));
        let mut roster = DayRoster::new();
        roster.entry("cu00".into()).or_default();
        instance.days.insert(0, roster);
        instance
            .patients
            .insert("pat00".into(), one_shot_patient("srv00", 0, 0));

        let result = DecomposedScheduler::new(&instance)
            .solve(&GoodLpSolver::new(), &SolverConfig::default())
            .unwrap();

        assert_eq!(result.scheduled_count(), 0);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].patient, "pat00");
    }

    #[test]
    fn test_every_request_is_scheduled_or_rejected_exactly_once() {
        let mut instance = periodic_instance();
        instance.services.insert("srv01".into(), Service::new("cu00", 5));
        instance
            .patients
            .insert("pat01".into(), one_shot_patient("srv01", 3, 1));
        instance
            .patients
            .insert("pat02".into(), one_shot_patient("srv01", 50, 0)); // outside horizon

        let result = DecomposedScheduler::new(&instance)
            .solve(&GoodLpSolver::new(), &SolverConfig::default())
            .unwrap();

        let scheduled = result.scheduled_pairs();
        let rejected: std::collections::BTreeSet<ServiceRequest> = result
            .rejected
            .iter()
            .map(|r| ServiceRequest::new(&r.patient, &r.service))
            .collect();
        for pair in requested_pairs(&instance) {
            assert_ne!(
                scheduled.contains(&pair),
                rejected.contains(&pair),
                "{pair:?} must be scheduled or rejected, never both or neither"
            );
        }
    }

    /// Always reports infeasibility.
    struct InfeasibleSolver;

    impl Solver for InfeasibleSolver {
        fn solve(
            &self,
            _model: &crate::milp::Model,
            _config: &SolverConfig,
        ) -> Result<SolverOutcome, SolveError> {
            Ok(SolverOutcome::infeasible(Duration::from_millis(1)))
        }
    }

    /// Solves the master for real, then reports every day infeasible.
    struct InfeasibleDays {
        inner: GoodLpSolver,
    }

    impl Solver for InfeasibleDays {
        fn solve(
            &self,
            model: &crate::milp::Model,
            config: &SolverConfig,
        ) -> Result<SolverOutcome, SolveError> {
            if model.name() == "master" {
                self.inner.solve(model, config)
            } else {
                Ok(SolverOutcome::infeasible(Duration::from_millis(1)))
            }
        }
    }

    #[test]
    fn test_infeasible_master_rejects_everything() {
        let instance = periodic_instance();
        let result = DecomposedScheduler::new(&instance)
            .solve(&InfeasibleSolver, &SolverConfig::default())
            .unwrap();

        assert_eq!(result.scheduled_count(), 0);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.info.status, "infeasible");
    }

    #[test]
    fn test_infeasible_day_rejects_only_that_days_requests() {
        let instance = periodic_instance();
        let solver = InfeasibleDays {
            inner: GoodLpSolver::new(),
        };
        let result = DecomposedScheduler::new(&instance)
            .solve(&solver, &SolverConfig::default())
            .unwrap();

        // Both occurrences live on master-assigned days whose subproblems
        // all fail, so the single (patient, service) pair ends up rejected;
        // aggregation itself must not error out.
        assert_eq!(result.scheduled_count(), 0);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.info.status, "optimal");
    }

    #[test]
    fn test_monolithic_scheduler_reports_info_block() {
        let instance = periodic_instance();
        let result = MonolithicScheduler::new(&instance)
            .solve(&GoodLpSolver::new(), &SolverConfig::default())
            .unwrap();

        assert_eq!(result.scheduled_count(), 2);
        assert_eq!(result.info.method, "milp_monolithic");
        assert_eq!(result.info.status, "optimal");
        assert!(result.info.objective_value > 0.0);
        assert!(validate_result(&instance, &result).is_ok());
    }
}
