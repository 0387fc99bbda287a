//! Conversion measurement through the solver boundary

use flowsheet_rl_solver::{path, FlowsheetSolver, SolverError};

/// Fraction of the tracked reactant consumed between the feed and a
/// given stream.
///
/// Nominally in `[0, 1]` but deliberately unclamped: negative values and
/// values above 1 are legitimate observations of infeasible solver
/// states, not errors.
#[must_use]
pub fn conversion(reference_in: f64, output: f64) -> f64 {
    (reference_in - output) / reference_in
}

/// Reads the tracked reactant's mole flow at a stream and turns it into
/// a conversion against the feed reference flow.
#[derive(Debug, Clone)]
pub struct ConversionProbe {
    chemical: String,
    reference_in: f64,
}

impl ConversionProbe {
    /// Probe for `chemical`, measured against `reference_in` kmol/s fed.
    pub fn new(chemical: impl Into<String>, reference_in: f64) -> Self {
        Self {
            chemical: chemical.into(),
            reference_in,
        }
    }

    /// Conversion at the named stream.
    pub fn read<S: FlowsheetSolver>(&self, solver: &S, stream: &str) -> Result<f64, SolverError> {
        let output = solver.read_value(&path::stream_moleflow(stream, &self.chemical))?;
        Ok(conversion(self.reference_in, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use flowsheet_rl_solver::MockFlowsheet;

    #[test]
    fn conversion_is_consumed_fraction() {
        assert_relative_eq!(conversion(0.0099, 0.0099), 0.0);
        assert_relative_eq!(conversion(0.0099, 0.0), 1.0);
        assert_relative_eq!(conversion(10.0, 2.5), 0.75);
    }

    #[test]
    fn conversion_is_not_clamped() {
        // Infeasible states can report more reactant out than in.
        assert!(conversion(10.0, 12.0) < 0.0);
        assert!(conversion(10.0, -1.0) > 1.0);
    }

    #[test]
    fn probe_reads_through_the_solver() {
        let mut mock = MockFlowsheet::new();
        mock.seed_computed(&path::stream_moleflow("S1AOUT", "N-BUT-01"), 0.00495);

        let probe = ConversionProbe::new("N-BUT-01", 0.0099);
        assert_relative_eq!(probe.read(&mock, "S1AOUT").unwrap(), 0.5);
        assert!(probe.read(&mock, "S2AOUT").is_err());
    }
}
