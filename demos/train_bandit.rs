//! Train PPO on SimpleBandit (Correctness Test)
//!
//! SimpleBandit is trivial: state is 0 or 1, optimal action equals state.
//! A working training loop pushes the per-step reward towards 1.0.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example train_bandit --release -- [export_dir]
//! RUST_LOG=debug cargo run --example train_bandit
//! ```

use anyhow::{bail, Result};
use ppo_core::{
    env::{bandit::SimpleBandit, Environment, SpaceType},
    policy::{InferenceModel, MlpPolicy},
    train::ppo::{PPOConfig, PPORunner, PPOTrainer},
};
use tch::Device;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    const NUM_ENVS: usize = 4;
    const EPISODE_LEN: usize = 128;
    const LEARNING_RATE: f64 = 1e-3;

    let export_dir = std::env::args().nth(1).unwrap_or_else(|| "bandit_models".to_string());
    let device = Device::cuda_if_available();

    let env = SimpleBandit::new(NUM_ENVS, EPISODE_LEN);
    let obs_dim = env.observation_space().flat_dim() as i64;
    let action_dim = match env.action_space().space_type {
        SpaceType::Discrete(n) => n as i64,
        SpaceType::Box => bail!("Expected discrete action space"),
    };

    tracing::info!("Environment: SimpleBandit");
    tracing::info!("  Observation dim: {}", obs_dim);
    tracing::info!("  Action dim: {}", action_dim);
    tracing::info!("  Num envs: {}", NUM_ENVS);
    tracing::info!("  Device: {:?}", device);

    let policy = MlpPolicy::new(obs_dim, action_dim, 64, device);
    // Bandit steps are independent; a near-zero discount leaves A ~ r - V
    let config = PPOConfig::new()
        .learning_rate(LEARNING_RATE)
        .n_epochs(10)
        .batch_size(64)
        .n_steps(EPISODE_LEN)
        .max_steps(50_000)
        .gamma(1e-6)
        .vf_coef(0.5)
        .ent_coef(0.01)
        .export_dir(&export_dir);
    let optimizer = policy.optimizer_for(&config)?;
    let trainer = PPOTrainer::with_seed(config, 0)?;

    let mut runner = PPORunner::with_trainer(env, policy, optimizer, trainer, device);
    let summary = runner.run()?;

    let max_reward = (EPISODE_LEN * NUM_ENVS) as f32;
    tracing::info!("Training complete!");
    tracing::info!("  Total steps: {}", summary.total_steps);
    tracing::info!("  Iterations: {} ({} skipped)", summary.iterations, summary.skipped);
    if let Some(best) = summary.best_reward {
        tracing::info!("  Best rollout reward: {:.0} / {:.0}", best, max_reward);
    }

    let best = InferenceModel::load_json(&summary.best_model_path)?;
    for state in [0.0_f32, 1.0] {
        let action = best.act(&[state])?;
        tracing::info!("  Best policy: state {} -> action {}", state, action);
    }

    Ok(())
}
