//! Core occurrence resolution pipeline and runtime state computation for a
//! calendar-driven industrial scheduler: recurrence parsing, the layered
//! Resolver merge, the Runtime State Evaluator, and the Scheduler Loop that
//! drives a [`scheduler::ValueSink`]. The GUI, persistence durability beyond
//! the `Repository` contract, profile import/export and theming are external
//! collaborators.

pub mod category;
pub mod db;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod repository;
pub mod resolver;
pub mod runtime_state;
pub mod scheduler;
