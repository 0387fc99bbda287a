//! Error types for the decision-process core

use thiserror::Error;

use flowsheet_rl_solver::SolverError;

/// Core error type for environment operations
#[derive(Error, Debug)]
pub enum EnvError {
    /// Action outside the declared catalog; rejected before any solver
    /// interaction, no state mutated.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Environment-level failure not attributable to the solver.
    #[error("environment error: {0}")]
    Environment(String),

    /// Failure surfaced by the external solver session. The session may
    /// be left inconsistent; a `reset()` or hard restart may be required
    /// to recover.
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),

    /// Dimension mismatch in a space or observation
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Actual dimensionality.
        actual: usize,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for environment operations
pub type Result<T> = std::result::Result<T, EnvError>;
