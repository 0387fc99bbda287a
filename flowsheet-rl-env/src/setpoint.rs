//! Setpoint-tuning environment (discrete temperature adjustment)
//!
//! The agent walks a fixed train of four reactor stages. At each stage
//! it may nudge the stage's temperature controller by a signed delta,
//! any number of times, before advancing to the next stage. Setpoints
//! live inside a bounded envelope: a nudge that would leave it is
//! clamped to the boundary and pays a fixed penalty. Only advancing
//! re-measures conversion; the flowsheet itself is never torn down, so
//! `reset()` just restores the nominal setpoints.

use serde::{Deserialize, Serialize};

use flowsheet_rl_core::{
    ActionSpace, BoxObservationSpace, DiscreteAction, DiscreteSpace, EnvError, Environment,
    EnvironmentConfig, ObservationSpace, Reward, Step, StepInfo, VectorObservation,
};
use flowsheet_rl_solver::{path, FlowsheetSolver, MockFlowsheet, Port, SolverError};

use crate::conversion::ConversionProbe;
use crate::episode::{BestCaseRecord, CycleCounter, EpisodeState, EpisodeSummary};

/// Signed setpoint deltas for actions 1..=4, in kelvin.
const TEMP_MOVES: [f64; 4] = [5.0, -5.0, 10.0, -10.0];

/// Decoded member of the five-action catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TuningAction {
    /// Move on to the next reactor stage.
    Advance,
    /// Nudge the active stage's setpoint by a delta.
    Adjust(f64),
}

impl TuningAction {
    fn from_action(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Advance),
            i => TEMP_MOVES.get(i - 1).map(|&delta| Self::Adjust(delta)),
        }
    }
}

/// Reactor block for a stage, e.g. `R1`.
fn reactor_name(stage: usize) -> String {
    format!("R{stage}")
}

/// Preset inlet placeholder for a stage, e.g. `S1IN`.
fn stage_inlet(stage: usize) -> String {
    format!("S{stage}IN")
}

/// Preset outlet for a stage, e.g. `S1OUT`.
fn stage_outlet(stage: usize) -> String {
    format!("S{stage}OUT")
}

/// Configuration of the setpoint-tuning process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetpointConfig {
    /// Number of reactor stages per episode.
    pub stages: usize,
    /// Completed episodes between hard solver restarts; 0 disables.
    pub reset_period: u64,
    /// Solve passes run per applied action.
    pub solves_per_step: u32,
    /// Setpoint every controller is restored to on reset, K.
    pub nominal_temp: f64,
    /// Lower edge of the setpoint envelope, K.
    pub temp_min: f64,
    /// Upper edge of the setpoint envelope; also the observation
    /// normalization ceiling, K.
    pub temp_max: f64,
    /// Reward signalled when a nudge is clamped at the envelope.
    pub penalty: f64,
    /// Temperature controller block per stage.
    pub temp_changers: Vec<String>,
    /// Chemical names; the first is the tracked reactant.
    pub chemicals: Vec<String>,
    /// Feed mole flow per chemical, kmol/s.
    pub component_flows: Vec<f64>,
    /// Name of the feed stream.
    pub feed_stream: String,
}

impl Default for SetpointConfig {
    fn default() -> Self {
        Self {
            stages: 4,
            reset_period: 100,
            solves_per_step: 1,
            nominal_temp: 350.0,
            temp_min: 300.0,
            temp_max: 600.0,
            penalty: -1.0,
            temp_changers: vec![
                "TC1".to_string(),
                "TC2".to_string(),
                "TC3".to_string(),
                "TC4".to_string(),
            ],
            chemicals: vec![
                "SO2".to_string(),
                "SO3".to_string(),
                "O2".to_string(),
                "N2".to_string(),
            ],
            component_flows: vec![16.7878, 0.0, 23.0833, 169.977],
            feed_stream: "FEED".to_string(),
        }
    }
}

impl SetpointConfig {
    /// Build from a generic environment config; unknown params are
    /// ignored, missing ones fall back to defaults.
    pub fn from_environment(config: &EnvironmentConfig) -> flowsheet_rl_core::Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            config.params.clone(),
        ))?)
    }
}

/// The discrete setpoint-tuning environment.
pub struct SetpointTuningEnv<S> {
    solver: S,
    config: SetpointConfig,
    probe: ConversionProbe,
    episode: EpisodeState,
    cycles: CycleCounter,
    best: BestCaseRecord,
    summaries: Vec<EpisodeSummary>,
}

impl<S: FlowsheetSolver> SetpointTuningEnv<S> {
    /// Environment over `solver` with the nominal configuration.
    pub fn new(solver: S) -> flowsheet_rl_core::Result<Self> {
        Self::with_config(solver, SetpointConfig::default())
    }

    /// Environment over `solver` with an explicit configuration.
    pub fn with_config(solver: S, config: SetpointConfig) -> flowsheet_rl_core::Result<Self> {
        let (tracked, reference_in) = config
            .chemicals
            .first()
            .zip(config.component_flows.first())
            .ok_or_else(|| {
                EnvError::Environment("config needs at least one chemical and feed flow".into())
            })?;
        if config.temp_changers.len() < config.stages {
            return Err(EnvError::Environment(format!(
                "{} stages need {} temperature controllers, got {}",
                config.stages,
                config.stages,
                config.temp_changers.len()
            )));
        }
        if !(config.temp_min <= config.nominal_temp && config.nominal_temp <= config.temp_max) {
            return Err(EnvError::Environment(
                "nominal setpoint lies outside the envelope".into(),
            ));
        }
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

    /// The controllers the agent can touch, one per stage.
    fn controllers(&self) -> &[String] {
        &self.config.temp_changers[..self.config.stages]
    }

    /// `[conversion] ++ [setpoint_i / temp_max]`, built before any
    /// trajectory append of the current step.
    fn build_observation(&self) -> Result<VectorObservation, SolverError> {
        let mut data = vec![self.episode.last_conversion()];
        for controller in self.controllers() {
            let temp = self.solver.read_value(&path::block_temp(controller))?;
            data.push(temp / self.config.temp_max);
        }
        Ok(VectorObservation::new(data))
    }

    /// The stage's current setpoints, formatted for the best-case record.
    fn final_temperatures(&self) -> Result<Vec<String>, SolverError> {
        self.controllers()
            .iter()
            .map(|controller| {
                let temp = self.solver.read_value(&path::block_temp(controller))?;
                Ok(format!("{controller}={temp}"))
            })
            .collect()
    }

    /// Splice the stage's reactor onto the running feed chain.
    ///
    /// The flowsheet persists across episodes, so this rewiring is
    /// idempotent: the placeholder may already be gone and the feed may
    /// already be connected from an earlier episode.
    fn connect_feed(&mut self, block: &str, inlet: &str, feed: &str) -> Result<(), SolverError> {
        match self.solver.remove_entity(&path::streams(), inlet) {
            Ok(()) | Err(SolverError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        match self
            .solver
            .add_entity(&path::block_port(block, Port::FeedIn), feed)
        {
            Ok(()) | Err(SolverError::DuplicateName(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn run_solves(&mut self) -> Result<(), SolverError> {
        for _ in 0..self.config.solves_per_step {
            self.solver.solve()?;
        }
        Ok(())
    }

    fn step_advance(&mut self) -> flowsheet_rl_core::Result<Step<VectorObservation>> {
        let feed = self.episode.current_feed().to_string();
        let stage = self.episode.advance();
        let block = reactor_name(stage);
        let outlet = stage_outlet(stage);

        self.connect_feed(&block, &stage_inlet(stage), &feed)?;
        self.episode.record_choice(block);
        self.episode.push_feed(outlet.clone());

        self.run_solves()?;

        let conversion = self.probe.read(&self.solver, &outlet)?;
        let previous = self.episode.last_conversion();
        let reward = conversion - previous;
        let observation = self.build_observation()?;
        self.episode.push_conversion(conversion);

        let done = self.episode.step_index() == self.config.stages;
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

    fn step_adjust(&mut self, delta: f64) -> flowsheet_rl_core::Result<Step<VectorObservation>> {
        let stage = self.episode.step_index();
        let controller = self
            .config
            .temp_changers
            .get(stage)
            .ok_or_else(|| {
                EnvError::Environment(format!("no temperature controller for stage {stage}"))
            })?
            .clone();

        // Pre-clamp so the engine never sees an out-of-range write; the
        // designed boundary policy signals a penalty instead of failing.
        let temp_path = path::block_temp(&controller);
        let current = self.solver.read_value(&temp_path)?;
        let target = current + delta;
        let clamped = target.clamp(self.config.temp_min, self.config.temp_max);
        self.solver.write_value(&temp_path, clamped)?;
        let reward = if (target - clamped).abs() > f64::EPSILON {
            self.config.penalty
        } else {
            0.0
        };
        self.episode.record_choice(format!("{controller}{delta:+}"));

        self.run_solves()?;

        Ok(Step {
            observation: self.build_observation()?,
            reward: Reward(reward),
            done: false,
            info: StepInfo::default(),
        })
    }

    /// Best-case bookkeeping, episode count, and the periodic hard reset.
    fn finish_episode(&mut self) -> flowsheet_rl_core::Result<()> {
        self.episode.mark_done();
        let final_conversion = self.episode.last_conversion();
        let episode_no = self.cycles.completed();
        let operating_point = self.final_temperatures()?;
        tracing::debug!(
            episode = episode_no,
            conversion = final_conversion,
            setpoints = ?operating_point,
            "episode complete"
        );
        self.summaries.push(EpisodeSummary {
            choices: self.episode.choices().to_vec(),
            conversion: final_conversion,
            episode: episode_no,
        });
        if self.best.observe(operating_point, final_conversion, episode_no) {
            tracing::debug!(episode = episode_no, "new best operating point");
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

impl<S: FlowsheetSolver> Environment for SetpointTuningEnv<S> {
    type Observation = VectorObservation;
    type Action = DiscreteAction;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        Box::new(BoxObservationSpace::uniform(0.0, 1.0, 1 + self.config.stages).unwrap())
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        Box::new(DiscreteSpace::new(1 + TEMP_MOVES.len()))
    }

    fn reset(&mut self) -> flowsheet_rl_core::Result<(Self::Observation, StepInfo)> {
        self.episode = EpisodeState::new(&self.config.feed_stream);
        let nominal = self.config.nominal_temp;
        for controller in &self.config.temp_changers[..self.config.stages] {
            self.solver
                .write_value(&path::block_temp(controller), nominal)?;
        }
        let observation = self.build_observation()?;
        Ok((observation, StepInfo::default()))
    }

    fn step(&mut self, action: Self::Action) -> flowsheet_rl_core::Result<Step<Self::Observation>> {
        let tuning = TuningAction::from_action(action.0).ok_or_else(|| {
            EnvError::InvalidAction(format!("no setpoint move for action {}", action.0))
        })?;
        if self.episode.is_done() {
            return Err(EnvError::InvalidAction(
                "episode is finished; call reset()".to_string(),
            ));
        }

        match tuning {
            TuningAction::Advance => self.step_advance(),
            TuningAction::Adjust(delta) => self.step_adjust(delta),
        }
    }
}

/// In-memory session mirroring the reference archive: the four-stage
/// reactor train is wired, controllers sit at the nominal setpoint, and
/// each stage outlet reports a plausible solved conversion ladder.
#[must_use]
pub fn demo_flowsheet() -> MockFlowsheet {
    let config = SetpointConfig::default();
    let mut mock = MockFlowsheet::new();
    let streams = path::streams();
    let blocks = path::blocks();

    // Cumulative conversion after each stage.
    let ladder = [0.55, 0.72, 0.78, 0.80];

    mock.seed_entity(&streams, &config.feed_stream);
    for (index, controller) in config.temp_changers.iter().enumerate() {
        mock.seed_entity(&blocks, controller);
        mock.seed_value(&path::block_temp(controller), config.nominal_temp);

        let stage = index + 1;
        let block = reactor_name(stage);
        mock.seed_entity(&blocks, &block);
        mock.seed_entity(&streams, &stage_inlet(stage));
        mock.seed_entity(&streams, &stage_outlet(stage));
        mock.seed_entity(&path::block_port(&block, Port::FeedIn), &stage_inlet(stage));
        mock.seed_entity(
            &path::block_port(&block, Port::ProductOut),
            &stage_outlet(stage),
        );

        let output = config.component_flows[0] * (1.0 - ladder[index]);
        mock.seed_computed(
            &path::stream_moleflow(&stage_outlet(stage), &config.chemicals[0]),
            output,
        );
    }
    mock
}
