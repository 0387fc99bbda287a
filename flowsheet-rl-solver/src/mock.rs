//! In-memory mock flowsheet session

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::SolverError;
use crate::path::EntityPath;
use crate::solver::FlowsheetSolver;

/// One snapshot of the session's data tree.
#[derive(Debug, Clone, Default)]
struct SessionImage {
    /// Entity names per container, keyed by the container's display path.
    entities: BTreeMap<String, BTreeSet<String>>,
    /// Scalar values keyed by display path.
    reals: BTreeMap<String, f64>,
    /// Text values keyed by display path.
    texts: BTreeMap<String, String>,
}

/// In-memory stand-in for a real solver session.
///
/// The seeded state doubles as the archive: [`FlowsheetSolver::restart`]
/// restores the session to the image captured by the `seed_*` calls,
/// the way a real session reloads its backup file. Reads are strict,
/// writes upsert, and per-path bounds can be seeded to exercise the
/// engine-side `RangeRejected` path.
#[derive(Debug, Default)]
pub struct MockFlowsheet {
    baseline: SessionImage,
    session: SessionImage,
    /// Engine-computed results, consulted when the session holds no
    /// written value at a path. These model `Output` nodes the engine
    /// fills in after a solve pass, so they survive entity teardown.
    computed: BTreeMap<String, f64>,
    bounds: BTreeMap<String, (f64, f64)>,
    fail_solves: VecDeque<String>,
    fail_restarts: VecDeque<String>,
    solves: u64,
    restarts: u64,
}

impl MockFlowsheet {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entity into both the archive and the live session.
    pub fn seed_entity(&mut self, container: &EntityPath, name: &str) {
        for image in [&mut self.baseline, &mut self.session] {
            image
                .entities
                .entry(container.to_string())
                .or_default()
                .insert(name.to_string());
        }
    }

    /// Seed a scalar into both the archive and the live session.
    pub fn seed_value(&mut self, path: &EntityPath, value: f64) {
        for image in [&mut self.baseline, &mut self.session] {
            image.reals.insert(path.to_string(), value);
        }
    }

    /// Seed an engine-computed result (an `Output` node value).
    pub fn seed_computed(&mut self, path: &EntityPath, value: f64) {
        self.computed.insert(path.to_string(), value);
    }

    /// Register engine-side bounds for a path; writes outside them are
    /// rejected with [`SolverError::RangeRejected`].
    pub fn seed_bounds(&mut self, path: &EntityPath, low: f64, high: f64) {
        self.bounds.insert(path.to_string(), (low, high));
    }

    /// Script the next solve call to fail with non-convergence.
    pub fn fail_next_solve(&mut self, message: impl Into<String>) {
        self.fail_solves.push_back(message.into());
    }

    /// Script the next restart call to fail loading the archive.
    pub fn fail_next_restart(&mut self, message: impl Into<String>) {
        self.fail_restarts.push_back(message.into());
    }

    /// Number of successful solve passes so far.
    #[must_use]
    pub fn solve_count(&self) -> u64 {
        self.solves
    }

    /// Number of successful restarts so far.
    #[must_use]
    pub fn restart_count(&self) -> u64 {
        self.restarts
    }

    /// Names currently present in a container, for wiring assertions.
    #[must_use]
    pub fn entity_names(&self, container: &EntityPath) -> Vec<String> {
        self.session
            .entities
            .get(&container.to_string())
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether a named entity exists in a container.
    #[must_use]
    pub fn has_entity(&self, container: &EntityPath, name: &str) -> bool {
        self.session
            .entities
            .get(&container.to_string())
            .is_some_and(|names| names.contains(name))
    }
}

impl FlowsheetSolver for MockFlowsheet {
    fn solve(&mut self) -> Result<(), SolverError> {
        if let Some(message) = self.fail_solves.pop_front() {
            return Err(SolverError::Solve(message));
        }
        self.solves += 1;
        Ok(())
    }

    fn read_value(&self, path: &EntityPath) -> Result<f64, SolverError> {
        let key = path.to_string();
        self.session
            .reals
            .get(&key)
            .or_else(|| self.computed.get(&key))
            .copied()
            .ok_or_else(|| SolverError::PathNotFound(path.clone()))
    }

    fn write_value(&mut self, path: &EntityPath, value: f64) -> Result<(), SolverError> {
        let key = path.to_string();
        if let Some(&(low, high)) = self.bounds.get(&key) {
            if value < low || value > high {
                return Err(SolverError::RangeRejected {
                    path: path.clone(),
                    value,
                });
            }
        }
        self.session.reals.insert(key, value);
        Ok(())
    }

    fn write_text(&mut self, path: &EntityPath, value: &str) -> Result<(), SolverError> {
        self.session.texts.insert(path.to_string(), value.to_string());
        Ok(())
    }

    fn add_entity(&mut self, container: &EntityPath, name: &str) -> Result<(), SolverError> {
        let names = self
            .session
            .entities
            .entry(container.to_string())
            .or_default();
        if !names.insert(name.to_string()) {
            return Err(SolverError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn remove_entity(&mut self, container: &EntityPath, name: &str) -> Result<(), SolverError> {
        let removed = self
            .session
            .entities
            .get_mut(&container.to_string())
            .is_some_and(|names| names.remove(name));
        if !removed {
            return Err(SolverError::NotFound(name.to_string()));
        }
        // Drop the removed entity's subtree of values as well.
        let prefix = format!("{container}/{name}/");
        self.session.reals.retain(|key, _| !key.starts_with(&prefix));
        self.session.texts.retain(|key, _| !key.starts_with(&prefix));
        // Deleting a stream detaches it from every block port, as the
        // engine does.
        if *container == crate::path::streams() {
            for (key, names) in &mut self.session.entities {
                if key.starts_with("Data/Blocks/") && key.contains("/Ports/") {
                    names.remove(name);
                }
            }
        }
        Ok(())
    }

    fn restart(&mut self) -> Result<(), SolverError> {
        if let Some(message) = self.fail_restarts.pop_front() {
            return Err(SolverError::Load(message));
        }
        self.session = self.baseline.clone();
        self.restarts += 1;
        Ok(())
    }
}
