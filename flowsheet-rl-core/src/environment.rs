//! Environment traits and types

use serde::{Deserialize, Serialize};

use crate::{Action, ActionSpace, Observation, ObservationSpace, Reward};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step<O> {
    /// Observation from the environment
    pub observation: O,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode is done
    pub done: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

/// Additional information from a step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Episode information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Episode ID
    pub id: String,
    /// Total reward
    pub total_reward: f64,
    /// Number of steps
    pub steps: usize,
    /// Start time
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// End time
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Configuration for environments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Random seed
    pub seed: Option<u64>,
    /// Additional parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Core environment trait
///
/// Every call is synchronous and blocking: `step` fully completes,
/// including any solver passes it triggers, before returning. Concurrent
/// `step`/`reset` calls on one instance are not supported.
pub trait Environment: Send {
    /// Observation type
    type Observation: Observation;
    /// Action type
    type Action: Action;

    /// Get the observation space
    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>>;

    /// Get the action space
    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>>;

    /// Reset the environment and start a fresh episode
    fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)>;

    /// Take a step in the environment
    fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation>>;

    /// Close the environment
    fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }

    /// Get current episode info
    fn episode_info(&self) -> Option<Episode> {
        None
    }
}

/// Wrapper for environments that tracks episodes
pub struct TrackedEnvironment<E> {
    /// Inner environment
    pub env: E,
    /// Current episode
    pub episode: Option<Episode>,
    /// Step counter
    pub step_count: usize,
}

impl<E> TrackedEnvironment<E> {
    /// Create a new tracked environment
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode: None,
            step_count: 0,
        }
    }
}

impl<E> Environment for TrackedEnvironment<E>
where
    E: Environment,
{
    type Observation = E::Observation;
    type Action = E::Action;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.env.observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.env.action_space()
    }

    fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)> {
        // End current episode if exists
        if let Some(ref mut episode) = self.episode {
            episode.end_time = Some(chrono::Utc::now());
        }

        // Start new episode
        self.episode = Some(Episode {
            id: uuid::Uuid::new_v4().to_string(),
            total_reward: 0.0,
            steps: 0,
            start_time: chrono::Utc::now(),
            end_time: None,
        });
        self.step_count = 0;

        self.env.reset()
    }

    fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation>> {
        let step = self.env.step(action)?;

        self.step_count += 1;
        if let Some(ref mut episode) = self.episode {
            episode.total_reward += step.reward.0;
            episode.steps = self.step_count;

            if step.done {
                episode.end_time = Some(chrono::Utc::now());
            }
        }

        Ok(step)
    }

    fn close(&mut self) -> crate::Result<()> {
        self.env.close()
    }

    fn episode_info(&self) -> Option<Episode> {
        self.episode.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxObservationSpace, DiscreteAction, DiscreteSpace, VectorObservation};

    /// Counts down from three steps, one unit of reward per step.
    struct Countdown {
        remaining: usize,
    }

    impl Environment for Countdown {
        type Observation = VectorObservation;
        type Action = DiscreteAction;

        fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
            Box::new(BoxObservationSpace::uniform(0.0, 3.0, 1).unwrap())
        }

        fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
            Box::new(DiscreteSpace::new(1))
        }

        fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)> {
            self.remaining = 3;
            Ok((VectorObservation::new(vec![3.0]), StepInfo::default()))
        }

        fn step(&mut self, _action: Self::Action) -> crate::Result<Step<Self::Observation>> {
            self.remaining -= 1;
            Ok(Step {
                observation: VectorObservation::new(vec![self.remaining as f64]),
                reward: Reward(1.0),
                done: self.remaining == 0,
                info: StepInfo::default(),
            })
        }
    }

    #[test]
    fn tracked_environment_accumulates_episode_stats() {
        let mut env = TrackedEnvironment::new(Countdown { remaining: 0 });
        env.reset().unwrap();

        for _ in 0..3 {
            env.step(DiscreteAction(0)).unwrap();
        }

        let episode = env.episode_info().unwrap();
        assert_eq!(episode.steps, 3);
        assert!((episode.total_reward - 3.0).abs() < f64::EPSILON);
        assert!(episode.end_time.is_some());
    }

    #[test]
    fn reset_starts_a_fresh_episode() {
        let mut env = TrackedEnvironment::new(Countdown { remaining: 0 });
        env.reset().unwrap();
        env.step(DiscreteAction(0)).unwrap();
        let first = env.episode_info().unwrap();

        env.reset().unwrap();
        let second = env.episode_info().unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.steps, 0);
    }
}
