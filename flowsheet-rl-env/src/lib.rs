//! Episodic flowsheet-configuration environments
//!
//! Two sequential decision processes over an external steady-state
//! flowsheet solver, sharing one episode state machine:
//!
//! - [`ReactorSynthesisEnv`] — build a reactor train four blocks long,
//!   choosing a reactor type per step; reward is the conversion gained
//!   by each inserted block.
//! - [`SetpointTuningEnv`] — walk four reactor stages, nudging each
//!   stage's temperature setpoint inside a bounded envelope before
//!   advancing; leaving the envelope clamps the write and pays a fixed
//!   penalty.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod conversion;
pub mod episode;
pub mod registry;
pub mod setpoint;
pub mod synthesis;

// Re-export environments
pub use conversion::{conversion, ConversionProbe};
pub use episode::{BestCase, BestCaseRecord, CycleCounter, EpisodeState, EpisodeSummary};
pub use registry::{list_envs, make_env, register_env, BoxedEnvironment, EnvRegistry};
pub use setpoint::{SetpointConfig, SetpointTuningEnv};
pub use synthesis::{ReactorSynthesisEnv, Route, StreamSpec, SynthesisConfig};

// Re-export core types
pub use flowsheet_rl_core::{
    Action, ActionSpace, DiscreteAction, EnvError, Environment, EnvironmentConfig, Observation,
    ObservationSpace, Reward, Step, StepInfo, VectorObservation,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        make_env, ConversionProbe, ReactorSynthesisEnv, SetpointConfig, SetpointTuningEnv,
        SynthesisConfig,
    };
    pub use flowsheet_rl_core::prelude::*;
}
