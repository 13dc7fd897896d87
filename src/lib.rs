//! Recurring healthcare-service scheduling.
//!
//! Schedules recurring care requests (e.g. home-care visits) for a patient
//! population against rosters of time-bounded operators grouped into care
//! units, over a multi-day horizon. Each request must fall inside a
//! tolerance window around a periodic target day.
//!
//! The crate covers constraint-model construction and decomposition: it
//! expands protocols into admissible request windows, formulates a
//! day-assignment master problem with per-day operator-assignment
//! subproblems (plus a single-shot monolithic alternative), and validates
//! produced schedules against every structural and temporal constraint.
//! Numerically solving the assembled models is delegated to a
//! [`solver::Solver`] implementation.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Instance`, `Service`, `Operator`,
//!   `Patient`, `Protocol`, `RequestWindow`, `ScheduleResult`
//! - **`windows`**: Protocol → request-window expansion
//! - **`milp`**: Arena model plus the master, subproblem and monolithic
//!   formulation builders
//! - **`solver`**: External-solver interface and the `good_lp` adapter
//! - **`decomposition`**: Master → per-day subproblems → aggregation, and
//!   the monolithic driver
//! - **`validation`**: Fail-fast instance/result checker with numeric codes
//! - **`generator`**: Seeded random instances for tests and benchmarks
//!
//! # Pipeline
//!
//! ```text
//! Instance → windows → master ─→ day subproblems ─→ aggregate → ScheduleResult
//!                         └──────── monolithic ─────────┘          (validated)
//! ```
//!
//! The decomposition is a single-pass heuristic: a day subproblem that
//! cannot place a request rejects it without retrying other days, so global
//! optimality is not guaranteed.
//!
//! # References
//!
//! - Cappanera & Scutellà (2015), "Joint Assignment, Scheduling, and Routing
//!   Models to Home Care Optimization"
//! - Wolsey (2020), "Integer Programming", Ch. 1.3 (big-M formulations)
//! - Benders (1962), "Partitioning procedures for solving mixed-variables
//!   programming problems"

pub mod decomposition;
pub mod generator;
pub mod milp;
pub mod models;
pub mod solver;
pub mod validation;
pub mod windows;

pub use decomposition::{DecomposedScheduler, MonolithicScheduler};
pub use models::{Instance, ScheduleResult};
pub use solver::{GoodLpSolver, Solver, SolverConfig};
