//! Steady-state flowsheet solver boundary for flowsheet-rl
//!
//! This crate owns everything at the edge of the external process
//! simulator: hierarchical entity addressing into its data tree, the
//! [`FlowsheetSolver`] trait the decision-process core is written
//! against, the solver error taxonomy, and an in-memory mock session
//! for tests and demos.
//!
//! The real engine is an opaque collaborator reached through a
//! synchronous, blocking, non-reentrant session: exactly one call in
//! flight at a time, one owner per session.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod mock;
pub mod path;
pub mod solver;

pub use error::SolverError;
pub use mock::MockFlowsheet;
pub use path::{EntityPath, Port};
pub use solver::FlowsheetSolver;
