//! Error taxonomy for the solver boundary

use thiserror::Error;

use crate::path::EntityPath;

/// Failures surfaced by a [`crate::FlowsheetSolver`] session.
///
/// None of these are retried by the decision-process core: addressing
/// errors indicate a defect, non-convergence is a legitimate outcome the
/// caller must decide about, and a failed archive reload leaves the
/// session unusable.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The solve pass did not converge.
    #[error("solve did not converge: {0}")]
    Solve(String),

    /// No value exists at the addressed path.
    #[error("path not found: {0}")]
    PathNotFound(EntityPath),

    /// An entity with this name already exists in the container.
    #[error("duplicate entity name: {0}")]
    DuplicateName(String),

    /// No entity with this name exists in the container.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// The engine rejected a written value. The mutator pre-clamps every
    /// setpoint write, so seeing this means a mutator defect.
    #[error("value {value} rejected for {path}")]
    RangeRejected {
        /// Path the write addressed.
        path: EntityPath,
        /// The rejected value.
        value: f64,
    },

    /// The session could not be reloaded from its archive.
    #[error("failed to reload solver archive: {0}")]
    Load(String),
}
