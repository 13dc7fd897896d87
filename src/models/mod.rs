//! Scheduling domain models.
//!
//! Core data types for recurring healthcare-service scheduling: the service
//! catalogue, per-day operator rosters grouped into care units, patients with
//! recurring protocols, the derived request windows, and the schedule result
//! documents.
//!
//! Instance data is immutable input; request windows are derived once per
//! solve; schedule results are produced by the solvers and only read
//! afterwards.

mod instance;
mod operator;
mod patient;
mod request;
mod schedule;
mod service;

pub use instance::Instance;
pub use operator::{total_capacity, CareUnitRoster, DayRoster, Operator};
pub use patient::{Interdiction, InterdictionWindow, Patient, Protocol, ProtocolService};
pub use request::{RequestWindow, ServiceRequest};
pub use schedule::{RejectedRequest, ScheduleResult, ScheduledService, SolverInfo};
pub use service::Service;
