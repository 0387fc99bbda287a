//! Environment registry for easy environment creation

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flowsheet_rl_core::{DiscreteAction, EnvError, Environment, EnvironmentConfig, VectorObservation};

use crate::setpoint::{self, SetpointConfig, SetpointTuningEnv};
use crate::synthesis::{self, ReactorSynthesisEnv, SynthesisConfig};

/// A type-erased environment over the observation/action types every
/// registered variant shares.
pub type BoxedEnvironment =
    Box<dyn Environment<Observation = VectorObservation, Action = DiscreteAction>>;

type EnvConstructor =
    Box<dyn Fn(EnvironmentConfig) -> flowsheet_rl_core::Result<BoxedEnvironment> + Send + Sync>;

lazy_static::lazy_static! {
    static ref REGISTRY: Arc<Mutex<EnvRegistry>> = Arc::new(Mutex::new(EnvRegistry::with_defaults()));
}

/// Global environment registry
pub struct EnvRegistry {
    /// Registered environments
    envs: HashMap<String, EnvConstructor>,
}

impl EnvRegistry {
    /// Registry pre-populated with both flowsheet variants, each backed
    /// by its in-memory demo session.
    fn with_defaults() -> Self {
        let mut registry = Self {
            envs: HashMap::new(),
        };
        registry.register("reactor-synthesis", |config| {
            let config = SynthesisConfig::from_environment(&config)?;
            let env = ReactorSynthesisEnv::with_config(synthesis::demo_flowsheet(), config)?;
            Ok(Box::new(env) as BoxedEnvironment)
        });
        registry.register("setpoint-tuning", |config| {
            let config = SetpointConfig::from_environment(&config)?;
            let env = SetpointTuningEnv::with_config(setpoint::demo_flowsheet(), config)?;
            Ok(Box::new(env) as BoxedEnvironment)
        });
        registry
    }

    /// Register an environment
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(EnvironmentConfig) -> flowsheet_rl_core::Result<BoxedEnvironment>
            + Send
            + Sync
            + 'static,
    {
        self.envs.insert(name.into(), Box::new(constructor));
    }

    /// Create an environment by name
    pub fn make(
        &self,
        name: &str,
        config: EnvironmentConfig,
    ) -> flowsheet_rl_core::Result<BoxedEnvironment> {
        self.envs
            .get(name)
            .ok_or_else(|| EnvError::Environment(format!("unknown environment: {name}")))
            .and_then(|constructor| constructor(config))
    }

    /// List registered environments
    pub fn list(&self) -> Vec<String> {
        self.envs.keys().cloned().collect()
    }
}

/// Register an environment globally
pub fn register_env<F>(name: impl Into<String>, constructor: F)
where
    F: Fn(EnvironmentConfig) -> flowsheet_rl_core::Result<BoxedEnvironment>
        + Send
        + Sync
        + 'static,
{
    REGISTRY.lock().unwrap().register(name, constructor);
}

/// Create an environment by name
pub fn make_env(name: &str, config: EnvironmentConfig) -> flowsheet_rl_core::Result<BoxedEnvironment> {
    REGISTRY.lock().unwrap().make(name, config)
}

/// List all registered environments
pub fn list_envs() -> Vec<String> {
    REGISTRY.lock().unwrap().list()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_registered() {
        let names = list_envs();
        assert!(names.contains(&"reactor-synthesis".to_string()));
        assert!(names.contains(&"setpoint-tuning".to_string()));
    }

    #[test]
    fn make_builds_a_working_environment() {
        let mut env = make_env("reactor-synthesis", EnvironmentConfig::default()).unwrap();
        let (obs, _) = env.reset().unwrap();
        assert_eq!(obs.data, vec![0.0]);

        let step = env.step(DiscreteAction(0)).unwrap();
        assert!(!step.done);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = make_env("distillation", EnvironmentConfig::default()).err().unwrap();
        assert!(matches!(err, EnvError::Environment(_)));
    }

    #[test]
    fn params_override_variant_config() {
        let mut config = EnvironmentConfig::default();
        config
            .params
            .insert("stages".to_string(), serde_json::json!(2));

        let mut env = make_env("setpoint-tuning", config).unwrap();
        let (obs, _) = env.reset().unwrap();
        // Conversion slot plus one setpoint per remaining stage.
        assert_eq!(obs.data.len(), 3);
    }
}
