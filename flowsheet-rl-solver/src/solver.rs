//! The flowsheet solver session trait

use crate::error::SolverError;
use crate::path::EntityPath;

/// One exclusive session with a steady-state flowsheet engine.
///
/// Every call blocks until the engine answers; the session is
/// non-reentrant and owned by exactly one environment. Implementations
/// wrap a real engine process or, for tests, [`crate::MockFlowsheet`].
pub trait FlowsheetSolver: Send {
    /// Re-solve the flowsheet in its current configuration.
    ///
    /// The engine only guarantees a clean result after a second pass
    /// following a topology change, so callers may invoke this twice
    /// per applied action.
    fn solve(&mut self) -> Result<(), SolverError>;

    /// Read a scalar from the data tree.
    fn read_value(&self, path: &EntityPath) -> Result<f64, SolverError>;

    /// Write a scalar into the data tree.
    fn write_value(&mut self, path: &EntityPath, value: f64) -> Result<(), SolverError>;

    /// Write a text spec into the data tree (e.g. a phase label).
    fn write_text(&mut self, path: &EntityPath, value: &str) -> Result<(), SolverError>;

    /// Create a named entity inside a container node.
    ///
    /// Adding a stream name under a block port connects that stream.
    fn add_entity(&mut self, container: &EntityPath, name: &str) -> Result<(), SolverError>;

    /// Remove a named entity from a container node, dropping its subtree.
    fn remove_entity(&mut self, container: &EntityPath, name: &str) -> Result<(), SolverError>;

    /// Tear the session down and reload it from its archive.
    ///
    /// Bounds long-run resource drift in the engine; the caller re-solves
    /// once afterwards before taking any reading.
    fn restart(&mut self) -> Result<(), SolverError>;
}
