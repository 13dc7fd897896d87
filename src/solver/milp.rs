//! `good_lp` solver adapter.
//!
//! Translates an arena [`Model`] into a `good_lp` problem and solves it with
//! the pure-Rust `microlp` backend. The backend is exact: it either proves
//! optimality or infeasibility, so outcomes report `lower = upper =
//! objective` with a zero gap. A configured time limit is accepted for
//! interface compatibility; `microlp` has no in-solve bound, which is logged
//! once per call.

use std::time::Instant;

use good_lp::{variable, variables, Expression, ResolutionError, Solution, SolverModel};
use tracing::debug;

use crate::milp::{CmpOp, Model, Sense, VarDomain};

use super::{SolveError, SolveStatus, Solver, SolverConfig, SolverOutcome};

/// MILP solver backed by `good_lp`'s `microlp` implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    /// Creates a new solver.
    pub fn new() -> Self {
        Self
    }
}

impl Solver for GoodLpSolver {
    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<SolverOutcome, SolveError> {
        if let Some(limit) = config.time_limit {
            debug!(
                model = model.name(),
                limit_secs = limit.as_secs_f64(),
                "microlp runs to completion; the configured time limit is recorded only"
            );
        }

        let start = Instant::now();

        let mut vars = variables!();
        let handles: Vec<_> = model
            .vars()
            .iter()
            .map(|def| match def.domain {
                VarDomain::Binary => vars.add(variable().binary().name(&def.name)),
                VarDomain::Integer { lb, ub } => vars.add(
                    variable()
                        .integer()
                        .min(lb as f64)
                        .max(ub as f64)
                        .name(&def.name),
                ),
            })
            .collect();

        let objective = model
            .objective()
            .terms
            .iter()
            .fold(
                Expression::from(model.objective().constant as f64),
                |acc, (var, coeff)| acc + *coeff as f64 * handles[var.index()],
            );

        let mut problem = match model.sense() {
            Sense::Maximize => vars.maximise(objective),
            Sense::Minimize => vars.minimise(objective),
        }
        .using(good_lp::microlp);

        for constraint in model.constraints() {
            let lhs = constraint.expr.terms.iter().fold(
                Expression::from(constraint.expr.constant as f64),
                |acc, (var, coeff)| acc + *coeff as f64 * handles[var.index()],
            );
            let rhs = constraint.rhs as f64;
            problem.add_constraint(match constraint.op {
                CmpOp::Le => lhs.leq(rhs),
                CmpOp::Ge => lhs.geq(rhs),
                CmpOp::Eq => lhs.eq(rhs),
            });
        }

        match problem.solve() {
            Ok(solution) => {
                let values: Vec<f64> = handles.iter().map(|h| solution.value(*h)).collect();
                let objective = model.objective().evaluate(&values);
                let solve_time = start.elapsed();
                debug!(
                    model = model.name(),
                    objective,
                    elapsed_secs = solve_time.as_secs_f64(),
                    "solve finished"
                );
                Ok(SolverOutcome {
                    status: SolveStatus::Optimal,
                    values,
                    objective,
                    lower_bound: objective,
                    upper_bound: objective,
                    gap: 0.0,
                    solve_time,
                })
            }
            Err(ResolutionError::Infeasible) => {
                debug!(model = model.name(), "model is infeasible");
                Ok(SolverOutcome::infeasible(start.elapsed()))
            }
            Err(ResolutionError::Unbounded) => Err(SolveError::Unbounded(model.name().to_string())),
            Err(err) => Err(SolveError::Backend {
                model: model.name().to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::{CmpOp, LinExpr, Model, Sense};

    #[test]
    fn test_solve_small_binary_model() {
        // max x0 + 2·x1  s.t.  x0 + x1 ≤ 1
        let mut model = Model::new("tiny");
        let x0 = model.add_binary("x0");
        let x1 = model.add_binary("x1");
        model.add_constraint(
            "choose_one",
            LinExpr::term(x0, 1).plus(x1, 1),
            CmpOp::Le,
            1,
        );
        model.set_objective(Sense::Maximize, LinExpr::term(x0, 1).plus(x1, 2));

        let outcome = GoodLpSolver::new()
            .solve(&model, &SolverConfig::default())
            .unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!(outcome.is_set(x1));
        assert!(!outcome.is_set(x0));
        assert_eq!(outcome.objective, 2.0);
        assert_eq!(outcome.lower_bound, outcome.upper_bound);
    }

    #[test]
    fn test_integer_bounds_are_respected() {
        // max t  s.t.  t ≤ 7 via domain
        let mut model = Model::new("bounded");
        let t = model.add_integer("t", 2, 7);
        model.set_objective(Sense::Maximize, LinExpr::term(t, 1));

        let outcome = GoodLpSolver::new()
            .solve(&model, &SolverConfig::default())
            .unwrap();
        assert_eq!(outcome.value(t).round() as i64, 7);
    }

    #[test]
    fn test_infeasible_is_a_status_not_an_error() {
        // x ≥ 1 and x ≤ 0 cannot both hold.
        let mut model = Model::new("contradiction");
        let x = model.add_binary("x");
        model.add_constraint("up", LinExpr::term(x, 1), CmpOp::Ge, 1);
        model.add_constraint("down", LinExpr::term(x, 1), CmpOp::Le, 0);
        model.set_objective(Sense::Maximize, LinExpr::term(x, 1));

        let outcome = GoodLpSolver::new()
            .solve(&model, &SolverConfig::default())
            .unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(!outcome.is_solution_found());
    }

    #[test]
    fn test_equality_constraint() {
        let mut model = Model::new("eq");
        let t = model.add_integer("t", 0, 10);
        model.add_constraint("pin", LinExpr::term(t, 1), CmpOp::Eq, 4);
        model.set_objective(Sense::Maximize, LinExpr::term(t, 1));

        let outcome = GoodLpSolver::new()
            .solve(&model, &SolverConfig::default())
            .unwrap();
        assert_eq!(outcome.value(t).round() as i64, 4);
    }
}
