//! MILP formulation builders.
//!
//! Three formulations share one arena [`Model`](model::Model):
//!
//! - **`master`**: day assignment per request window, aggregate capacity
//!   per (day, care unit) — the first stage of the decomposition.
//! - **`subproblem`**: operator and slot assignment for one day's fixed
//!   request set — the second stage.
//! - **`monolithic`**: window, day and operator choice folded into a single
//!   whole-horizon model.
//!
//! Index generation and constraint emission are separate steps everywhere,
//! so index sets are testable without assembling a model. Pairwise
//! symmetry reduction lives in [`pairs`]; big-M derivation in [`bounds`].

pub mod bounds;
pub mod master;
pub mod model;
pub mod monolithic;
pub mod pairs;
pub mod subproblem;

pub use master::{MasterProblem, MasterProblemBuilder};
pub use model::{CmpOp, LinConstraint, LinExpr, Model, Sense, VarDef, VarDomain, VarId};
pub use monolithic::{DoCandidate, MonolithicBuilder, MonolithicProblem};
pub use subproblem::{ChiCandidate, Subproblem, SubproblemBuilder};
