//! Reactor-train synthesis environment (discrete topology selection)
//!
//! Each episode builds a train of four reactors. Per step the agent
//! picks a reactor type; the chosen block is spliced into the flowsheet
//! by rewiring streams, the solver is re-run, and the reward is the
//! conversion gained by the new block. Topology mutation is destructive,
//! so `reset()` rebuilds the whole stream set from its configured specs.

use serde::{Deserialize, Serialize};

use flowsheet_rl_core::{
    ActionSpace, BoxObservationSpace, DiscreteAction, DiscreteSpace, EnvError, Environment,
    EnvironmentConfig, ObservationSpace, Reward, Step, StepInfo, VectorObservation,
};
use flowsheet_rl_solver::{path, FlowsheetSolver, MockFlowsheet, Port, SolverError};

use crate::conversion::ConversionProbe;
use crate::episode::{BestCaseRecord, CycleCounter, EpisodeState, EpisodeSummary};

/// Reactor type chosen at each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Continuous stirred-tank reactor; route letter `A`.
    Cstr,
    /// Plug-flow reactor; route letter `B`.
    Pfr,
}

impl Route {
    /// Both routes, in action-index order.
    pub const ALL: [Self; 2] = [Self::Cstr, Self::Pfr];

    fn from_action(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Cstr),
            1 => Some(Self::Pfr),
            _ => None,
        }
    }

    fn letter(self) -> char {
        match self {
            Self::Cstr => 'A',
            Self::Pfr => 'B',
        }
    }
}

/// Block name for a step/route slot, e.g. `B1A`.
fn block_name(step: usize, route: Route) -> String {
    format!("B{}{}", step, route.letter())
}

/// Preset inlet placeholder for a slot, e.g. `S1AIN`.
fn inlet_name(step: usize, route: Route) -> String {
    format!("S{}{}IN", step, route.letter())
}

/// Preset outlet for a slot, e.g. `S1AOUT`.
fn outlet_name(step: usize, route: Route) -> String {
    format!("S{}{}OUT", step, route.letter())
}

/// Every (step, route) slot of the fixed block catalog.
fn slots(episode_len: usize) -> impl Iterator<Item = (usize, Route)> {
    (1..=episode_len).flat_map(|step| Route::ALL.into_iter().map(move |route| (step, route)))
}

/// Fixed spec applied to every created feed/inlet stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSpec {
    /// Stream temperature, K.
    pub temperature: f64,
    /// Stream pressure, N/m².
    pub pressure: f64,
    /// Total mole flow, kmol/s.
    pub total_flow: f64,
    /// Number of phases.
    pub n_phase: u32,
    /// Phase label, e.g. `"L"`.
    pub phase: String,
}

impl Default for StreamSpec {
    fn default() -> Self {
        Self {
            temperature: 298.0,
            pressure: 5.0e6,
            total_flow: 0.0869,
            n_phase: 1,
            phase: "L".to_string(),
        }
    }
}

/// Configuration of the synthesis process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Number of reactors per episode.
    pub episode_len: usize,
    /// Completed episodes between hard solver restarts; 0 disables.
    pub reset_period: u64,
    /// Solve passes run per applied action.
    pub solves_per_step: u32,
    /// Chemical names; the first is the tracked reactant.
    pub chemicals: Vec<String>,
    /// Feed mole flow per chemical, kmol/s.
    pub component_flows: Vec<f64>,
    /// Name of the initial feed stream.
    pub feed_stream: String,
    /// Spec applied to created streams.
    pub stream_spec: StreamSpec,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            episode_len: 4,
            reset_period: 100,
            // The engine only settles on a clean answer after a second
            // pass following a topology change.
            solves_per_step: 2,
            chemicals: vec![
                "N-BUT-01".to_string(),
                "ISO-B-01".to_string(),
                "2-MET-01".to_string(),
            ],
            component_flows: vec![0.0099, 0.0001, 0.0769],
            feed_stream: "S1".to_string(),
            stream_spec: StreamSpec::default(),
        }
    }
}

impl SynthesisConfig {
    /// Build from a generic environment config; unknown params are
    /// ignored, missing ones fall back to defaults.
    pub fn from_environment(config: &EnvironmentConfig) -> flowsheet_rl_core::Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            config.params.clone(),
        ))?)
    }
}

/// The discrete topology-selection environment.
pub struct ReactorSynthesisEnv<S> {
    solver: S,
    config: SynthesisConfig,
    probe: ConversionProbe,
    episode: EpisodeState,
    cycles: CycleCounter,
    best: BestCaseRecord,
    summaries: Vec<EpisodeSummary>,
}

impl<S: FlowsheetSolver> ReactorSynthesisEnv<S> {
    /// Environment over `solver` with the nominal configuration.
    pub fn new(solver: S) -> flowsheet_rl_core::Result<Self> {
        Self::with_config(solver, SynthesisConfig::default())
    }

    /// Environment over `solver` with an explicit configuration.
    pub fn with_config(solver: S, config: SynthesisConfig) -> flowsheet_rl_core::Result<Self> {
        let (tracked, reference_in) = config
            .chemicals
            .first()
            .zip(config.component_flows.first())
            .ok_or_else(|| {
                EnvError::Environment("config needs at least one chemical and feed flow".into())
            })?;
        let probe = ConversionProbe::new(tracked, *reference_in);
        let episode = EpisodeState::new(&config.feed_stream);
        let cycles = CycleCounter::new(config.reset_period);
        Ok(Self {
            solver,
            config,
            probe,
            episode,
            cycles,
            best: BestCaseRecord::new(),
            summaries: Vec::new(),
        })
    }

    /// The running best-case record.
    #[must_use]
    pub fn best_cases(&self) -> &BestCaseRecord {
        &self.best
    }

    /// Summaries of every completed episode.
    #[must_use]
    pub fn episode_summaries(&self) -> &[EpisodeSummary] {
        &self.summaries
    }

    /// The current episode state.
    #[must_use]
    pub fn episode(&self) -> &EpisodeState {
        &self.episode
    }

    /// Direct access to the solver session.
    #[must_use]
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Every stream name the environment may create or destroy.
    fn stream_catalog(&self) -> Vec<String> {
        let mut names: Vec<String> = slots(self.config.episode_len)
            .flat_map(|(step, route)| [inlet_name(step, route), outlet_name(step, route)])
            .collect();
        names.push(self.config.feed_stream.clone());
        names
    }

    /// Create a stream and apply the configured composition/T/P/phase spec.
    fn create_spec_stream(&mut self, name: &str) -> Result<(), SolverError> {
        self.solver.add_entity(&path::streams(), name)?;
        let spec = &self.config.stream_spec;
        self.solver
            .write_value(&path::stream_input(name, "TEMP"), spec.temperature)?;
        self.solver
            .write_value(&path::stream_input(name, "PRES"), spec.pressure)?;
        self.solver
            .write_value(&path::stream_input(name, "TOTFLOW"), spec.total_flow)?;
        for (chemical, flow) in self.config.chemicals.iter().zip(&self.config.component_flows) {
            self.solver
                .write_value(&path::stream_component_flow(name, chemical), *flow)?;
        }
        self.solver
            .write_value(&path::stream_input(name, "NPHASE"), f64::from(spec.n_phase))?;
        self.solver
            .write_text(&path::stream_input(name, "PHASE"), &spec.phase)?;
        Ok(())
    }

    /// Tear every catalogued stream down and rebuild the preset wiring.
    ///
    /// Destructive episodes legitimately leave inlet placeholders
    /// missing, so absence is tolerated during teardown only.
    fn rebuild_streams(&mut self) -> Result<(), SolverError> {
        let streams = path::streams();
        for name in self.stream_catalog() {
            match self.solver.remove_entity(&streams, &name) {
                Ok(()) | Err(SolverError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }

        for (step, route) in slots(self.config.episode_len) {
            let inlet = inlet_name(step, route);
            self.create_spec_stream(&inlet)?;
            self.solver.add_entity(&streams, &outlet_name(step, route))?;
        }
        let feed = self.config.feed_stream.clone();
        self.create_spec_stream(&feed)?;

        for (step, route) in slots(self.config.episode_len) {
            let block = block_name(step, route);
            self.solver
                .add_entity(&path::block_port(&block, Port::FeedIn), &inlet_name(step, route))?;
            self.solver.add_entity(
                &path::block_port(&block, Port::ProductOut),
                &outlet_name(step, route),
            )?;
        }
        Ok(())
    }

    fn run_solves(&mut self) -> Result<(), SolverError> {
        for _ in 0..self.config.solves_per_step {
            self.solver.solve()?;
        }
        Ok(())
    }

    /// Best-case bookkeeping, episode count, and the periodic hard reset.
    fn finish_episode(&mut self) -> flowsheet_rl_core::Result<()> {
        self.episode.mark_done();
        let final_conversion = self.episode.last_conversion();
        let episode_no = self.cycles.completed();
        self.summaries.push(EpisodeSummary {
            choices: self.episode.choices().to_vec(),
            conversion: final_conversion,
            episode: episode_no,
        });
        if self
            .best
            .observe(self.episode.choices().to_vec(), final_conversion, episode_no)
        {
            tracing::debug!(
                episode = episode_no,
                conversion = final_conversion,
                "new best reactor train"
            );
        }
        if self.cycles.complete_one() {
            self.hard_reset()?;
        }
        Ok(())
    }

    /// Reload the solver session from its archive and re-solve once.
    /// Failures are fatal; nothing is retried.
    fn hard_reset(&mut self) -> flowsheet_rl_core::Result<()> {
        tracing::info!(
            episodes = self.cycles.completed(),
            "restarting solver session"
        );
        self.solver.restart()?;
        self.solver.solve()?;
        Ok(())
    }
}

impl<S: FlowsheetSolver> Environment for ReactorSynthesisEnv<S> {
    type Observation = VectorObservation;
    type Action = DiscreteAction;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        Box::new(BoxObservationSpace::uniform(0.0, 1.0, 1).unwrap())
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        Box::new(DiscreteSpace::new(Route::ALL.len()))
    }

    fn reset(&mut self) -> flowsheet_rl_core::Result<(Self::Observation, StepInfo)> {
        self.episode = EpisodeState::new(&self.config.feed_stream);
        self.rebuild_streams()?;
        Ok((VectorObservation::new(vec![0.0]), StepInfo::default()))
    }

    fn step(&mut self, action: Self::Action) -> flowsheet_rl_core::Result<Step<Self::Observation>> {
        let route = Route::from_action(action.0).ok_or_else(|| {
            EnvError::InvalidAction(format!("no reactor route for action {}", action.0))
        })?;
        if self.episode.is_done() {
            return Err(EnvError::InvalidAction(
                "episode is finished; call reset()".to_string(),
            ));
        }

        let feed = self.episode.current_feed().to_string();
        let step_no = self.episode.advance();
        let block = block_name(step_no, route);
        let inlet = inlet_name(step_no, route);
        let outlet = outlet_name(step_no, route);

        // Splice the chosen block in: drop its preset inlet placeholder
        // and route the previous step's product into its feed port.
        self.solver.remove_entity(&path::streams(), &inlet)?;
        self.solver
            .add_entity(&path::block_port(&block, Port::FeedIn), &feed)?;
        self.episode.record_choice(block);
        self.episode.push_feed(outlet.clone());

        self.run_solves()?;

        let conversion = self.probe.read(&self.solver, &outlet)?;
        let previous = self.episode.last_conversion();
        let reward = conversion - previous;
        let observation = VectorObservation::new(vec![previous]);
        self.episode.push_conversion(conversion);
        debug_assert_eq!(self.episode.trajectory().len(), self.episode.step_index() + 1);

        let done = self.episode.step_index() == self.config.episode_len;
        if done {
            self.finish_episode()?;
        }

        Ok(Step {
            observation,
            reward: Reward(reward),
            done,
            info: StepInfo::default(),
        })
    }
}

/// In-memory session mirroring the reference archive: the block catalog
/// exists, the preset streams are wired, and each outlet reports a
/// plausible solved conversion ladder. Used by the registry defaults,
/// the examples, and the tests.
#[must_use]
pub fn demo_flowsheet() -> MockFlowsheet {
    let config = SynthesisConfig::default();
    let mut mock = MockFlowsheet::new();
    let streams = path::streams();
    let blocks = path::blocks();

    // Cumulative conversion after each train position, per route.
    let ladder = [0.25, 0.45, 0.60, 0.70];
    let route_bonus = 0.05;

    mock.seed_entity(&streams, &config.feed_stream);
    for (step, route) in slots(config.episode_len) {
        let block = block_name(step, route);
        mock.seed_entity(&blocks, &block);
        mock.seed_entity(&streams, &inlet_name(step, route));
        mock.seed_entity(&streams, &outlet_name(step, route));
        mock.seed_entity(&path::block_port(&block, Port::FeedIn), &inlet_name(step, route));
        mock.seed_entity(
            &path::block_port(&block, Port::ProductOut),
            &outlet_name(step, route),
        );

        let conversion = ladder[step - 1]
            + match route {
                Route::Cstr => 0.0,
                Route::Pfr => route_bonus,
            };
        let output = config.component_flows[0] * (1.0 - conversion);
        mock.seed_computed(
            &path::stream_moleflow(&outlet_name(step, route), &config.chemicals[0]),
            output,
        );
    }
    mock
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn env() -> ReactorSynthesisEnv<MockFlowsheet> {
        ReactorSynthesisEnv::new(demo_flowsheet()).unwrap()
    }

    #[test]
    fn reset_observation_is_zero() {
        let mut env = env();
        let (obs, _) = env.reset().unwrap();
        assert_eq!(obs.data, vec![0.0]);
        assert_eq!(env.episode().trajectory(), &[0.0]);
    }

    #[test]
    fn first_step_chooses_b1a() {
        let mut env = env();
        env.reset().unwrap();

        let step = env.step(DiscreteAction(0)).unwrap();
        assert_eq!(env.episode().choices(), &["B1A".to_string()]);
        assert!(!step.done);
        // Observation reports the conversion from before this step.
        assert_eq!(step.observation.data, vec![0.0]);
        assert_relative_eq!(step.reward.0, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn step_rewires_the_chosen_block() {
        let mut env = env();
        env.reset().unwrap();
        env.step(DiscreteAction(0)).unwrap();

        let solver = env.solver();
        assert!(!solver.has_entity(&path::streams(), "S1AIN"));
        assert!(solver.has_entity(&path::block_port("B1A", Port::FeedIn), "S1"));

        env.step(DiscreteAction(1)).unwrap();
        // The second block is fed by the first block's product.
        assert!(env
            .solver()
            .has_entity(&path::block_port("B2B", Port::FeedIn), "S1AOUT"));
    }

    #[test]
    fn each_action_solves_twice() {
        let mut env = env();
        env.reset().unwrap();
        assert_eq!(env.solver().solve_count(), 0);
        env.step(DiscreteAction(0)).unwrap();
        assert_eq!(env.solver().solve_count(), 2);
    }

    #[test]
    fn reward_is_conversion_delta() {
        let mut env = env();
        env.reset().unwrap();
        let first = env.step(DiscreteAction(1)).unwrap();
        let second = env.step(DiscreteAction(0)).unwrap();

        // Route B converts 0.30 at step 1; route A reaches 0.45 at step 2.
        assert_relative_eq!(first.reward.0, 0.30, epsilon = 1e-12);
        assert_relative_eq!(second.reward.0, 0.45 - 0.30, epsilon = 1e-12);
        assert_relative_eq!(second.observation.data[0], 0.30, epsilon = 1e-12);
    }

    #[test]
    fn episode_terminates_on_the_fourth_step() {
        let mut env = env();
        env.reset().unwrap();
        for expected_done in [false, false, false, true] {
            let step = env.step(DiscreteAction(0)).unwrap();
            assert_eq!(step.done, expected_done);
        }
        assert_eq!(env.episode().choices().len(), 4);
        assert_eq!(env.episode().trajectory().len(), 5);
    }

    #[test]
    fn out_of_catalog_action_leaves_state_untouched() {
        let mut env = env();
        env.reset().unwrap();
        let err = env.step(DiscreteAction(2)).unwrap_err();
        assert!(matches!(err, EnvError::InvalidAction(_)));
        assert_eq!(env.episode().step_index(), 0);
        assert_eq!(env.solver().solve_count(), 0);
    }

    #[test]
    fn stepping_a_finished_episode_is_rejected() {
        let mut env = env();
        env.reset().unwrap();
        for _ in 0..4 {
            env.step(DiscreteAction(0)).unwrap();
        }
        assert!(matches!(
            env.step(DiscreteAction(0)),
            Err(EnvError::InvalidAction(_))
        ));
    }

    #[test]
    fn reset_supports_repeated_episodes() {
        let mut env = env();
        for _ in 0..3 {
            let (obs, _) = env.reset().unwrap();
            assert_eq!(obs.data, vec![0.0]);
            for _ in 0..4 {
                env.step(DiscreteAction(1)).unwrap();
            }
        }
        assert_eq!(env.episode_summaries().len(), 3);
    }

    #[test]
    fn best_case_tracks_strict_improvement() {
        let mut env = env();

        // All-CSTR train first: final conversion 0.70.
        env.reset().unwrap();
        for _ in 0..4 {
            env.step(DiscreteAction(0)).unwrap();
        }
        assert_eq!(env.best_cases().entries().len(), 1);
        assert_relative_eq!(env.best_cases().running_max(), 0.70, epsilon = 1e-12);

        // Same train again: no improvement, no new entry.
        env.reset().unwrap();
        for _ in 0..4 {
            env.step(DiscreteAction(0)).unwrap();
        }
        assert_eq!(env.best_cases().entries().len(), 1);

        // PFR finish beats it: 0.75.
        env.reset().unwrap();
        for action in [0, 0, 0, 1] {
            env.step(DiscreteAction(action)).unwrap();
        }
        let best = env.best_cases().entries().last().unwrap();
        assert_relative_eq!(best.conversion, 0.75, epsilon = 1e-12);
        assert_eq!(best.episode, 2);
        assert_eq!(best.descriptor.last().unwrap(), "B4B");
    }

    #[test]
    fn hard_reset_follows_the_configured_period() {
        let config = SynthesisConfig {
            reset_period: 2,
            ..SynthesisConfig::default()
        };
        let mut env = ReactorSynthesisEnv::with_config(demo_flowsheet(), config).unwrap();

        env.reset().unwrap();
        for _ in 0..4 {
            env.step(DiscreteAction(0)).unwrap();
        }
        // First episode completes without a restart.
        assert_eq!(env.solver().restart_count(), 0);

        env.reset().unwrap();
        let solves_before = env.solver().solve_count();
        for _ in 0..4 {
            env.step(DiscreteAction(0)).unwrap();
        }
        // Second episode triggers the restart plus one settling solve.
        assert_eq!(env.solver().restart_count(), 1);
        assert_eq!(env.solver().solve_count(), solves_before + 8 + 1);
    }

    #[test]
    fn failed_hard_reset_is_fatal() {
        let config = SynthesisConfig {
            reset_period: 1,
            ..SynthesisConfig::default()
        };
        let mut solver = demo_flowsheet();
        solver.fail_next_restart("archive unreadable");
        let mut env = ReactorSynthesisEnv::with_config(solver, config).unwrap();

        env.reset().unwrap();
        for _ in 0..3 {
            env.step(DiscreteAction(0)).unwrap();
        }
        let err = env.step(DiscreteAction(0)).unwrap_err();
        assert!(matches!(
            err,
            EnvError::Solver(SolverError::Load(_))
        ));
    }

    #[test]
    fn solve_failure_propagates() {
        let mut solver = demo_flowsheet();
        solver.fail_next_solve("mass balance diverged");
        let mut env = ReactorSynthesisEnv::new(solver).unwrap();
        env.reset().unwrap();
        assert!(matches!(
            env.step(DiscreteAction(0)),
            Err(EnvError::Solver(SolverError::Solve(_)))
        ));
    }

    #[test]
    fn spaces_match_the_declared_contract() {
        let env = env();
        assert_eq!(env.action_space().dim(), Some(1));
        assert_eq!(env.observation_space().shape(), vec![1]);
        assert!(env.action_space().contains(&DiscreteAction(1)));
        assert!(!env.action_space().contains(&DiscreteAction(2)));
    }
}
