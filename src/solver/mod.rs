//! External solver interface.
//!
//! The formulation builders assemble solver-agnostic [`Model`]s; actually
//! solving one is delegated to a [`Solver`] implementation behind a single
//! `solve(model, config)` call. The only solver option the core passes is a
//! time limit; everything else stays backend-specific and out of reach of
//! constraint-generation code.
//!
//! Infeasibility is a *status*, not an error: a terminal
//! [`SolveStatus::Infeasible`] outcome carries no assignment and is
//! translated by the callers into rejected requests. Errors are reserved for
//! backend failures (unbounded models, solver faults).

mod milp;

pub use milp::GoodLpSolver;

use std::time::Duration;

use thiserror::Error;

use crate::milp::{Model, VarId};

/// Options passed to a solver. Only the time limit is part of the core
/// contract.
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Wall-clock bound for one solve call. `None` = run to completion.
    pub time_limit: Option<Duration>,
}

impl SolverConfig {
    /// Creates a config with no time limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// Terminal status of one solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Proven optimal assignment.
    Optimal,
    /// Feasible assignment with a nonzero optimality gap.
    Feasible,
    /// No assignment satisfies the constraints.
    Infeasible,
    /// The time limit expired; the best assignment found so far is reported.
    TimeLimitReached,
}

impl SolveStatus {
    /// Status name used in result documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::TimeLimitReached => "time_limit_reached",
        }
    }
}

/// Result of one solve call: status, assignment, bounds, timing.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    /// Terminal status.
    pub status: SolveStatus,
    /// Value per variable, indexed by [`VarId::index`]. Empty when
    /// infeasible.
    pub values: Vec<f64>,
    /// Objective value of the reported assignment.
    pub objective: f64,
    /// Best proven lower bound.
    pub lower_bound: f64,
    /// Best proven upper bound.
    pub upper_bound: f64,
    /// Relative optimality gap (0 when proven optimal).
    pub gap: f64,
    /// Wall-clock time spent solving.
    pub solve_time: Duration,
}

impl SolverOutcome {
    /// An infeasible outcome with no assignment.
    pub fn infeasible(solve_time: Duration) -> Self {
        Self {
            status: SolveStatus::Infeasible,
            values: Vec::new(),
            objective: 0.0,
            lower_bound: 0.0,
            upper_bound: 0.0,
            gap: 0.0,
            solve_time,
        }
    }

    /// Whether an assignment is available.
    pub fn is_solution_found(&self) -> bool {
        self.status != SolveStatus::Infeasible
    }

    /// Value of one variable.
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    /// Whether a binary variable is set in the assignment.
    pub fn is_set(&self, var: VarId) -> bool {
        self.values[var.index()] >= 0.5
    }
}

/// Backend failure during a solve call.
///
/// Infeasibility is deliberately absent: it is a [`SolveStatus`].
#[derive(Debug, Error)]
pub enum SolveError {
    /// The objective is unbounded (a modelling bug, not an instance state).
    #[error("model '{0}' is unbounded")]
    Unbounded(String),
    /// The backend reported an internal failure.
    #[error("solver backend failed on model '{model}': {reason}")]
    Backend {
        /// Model name.
        model: String,
        /// Backend diagnostic.
        reason: String,
    },
}

/// A combinatorial solver capable of handling the crate's models.
pub trait Solver {
    /// Solves the model within the configured limits.
    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<SolverOutcome, SolveError>;
}
