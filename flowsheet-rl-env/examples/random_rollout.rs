//! Example: random agent over both flowsheet decision processes

use flowsheet_rl_core::{Environment, TrackedEnvironment};
use flowsheet_rl_env::{setpoint, synthesis, ReactorSynthesisEnv, SetpointTuningEnv};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let synthesis_env = run(
        "reactor-synthesis",
        ReactorSynthesisEnv::new(synthesis::demo_flowsheet())?,
    )?;
    if let Some(best) = synthesis_env.env.best_cases().entries().last() {
        println!(
            "Best reactor train: {:?} at conversion {:.3}",
            best.descriptor, best.conversion
        );
    }

    let setpoint_env = run(
        "setpoint-tuning",
        SetpointTuningEnv::new(setpoint::demo_flowsheet())?,
    )?;
    if let Some(best) = setpoint_env.env.best_cases().entries().last() {
        println!(
            "Best operating point: {:?} at conversion {:.3}",
            best.descriptor, best.conversion
        );
    }

    Ok(())
}

/// Run a handful of random episodes and print per-episode stats.
fn run<E: Environment>(
    name: &str,
    env: E,
) -> Result<TrackedEnvironment<E>, Box<dyn std::error::Error>> {
    let mut env = TrackedEnvironment::new(env);
    let num_episodes = 5;
    // A random policy may wander; cap the episode length.
    let max_steps = 200;

    for episode in 0..num_episodes {
        env.reset()?;
        let mut total_reward = 0.0;
        let mut steps = 0;

        loop {
            let action = env.action_space().sample();
            let step = env.step(action)?;
            total_reward += step.reward.0;
            steps += 1;

            if step.done || steps >= max_steps {
                break;
            }
        }

        println!(
            "[{name}] Episode {}: Total Reward = {:.3}, Steps = {}",
            episode + 1,
            total_reward,
            steps
        );
    }

    env.close()?;
    Ok(env)
}
