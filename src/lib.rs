//! # ppo-core
//!
//! The training core of Proximal Policy Optimization on top of tch-rs:
//! rollout collection, advantage bootstrapping, minibatch training with the
//! clipped objective, and an outer loop that keeps and exports the best
//! policy.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ppo_core::prelude::*;
//! use tch::Device;
//!
//! # fn main() -> anyhow::Result<()> {
//! let env = SimpleBandit::new(4, 64);
//! let policy = MlpPolicy::new(1, 2, 64, Device::Cpu);
//! let optimizer = policy.optimizer(1e-3)?;
//! let config = PPOConfig::new().n_steps(64).batch_size(16).max_steps(10_000);
//!
//! let mut runner = PPORunner::new(env, policy, optimizer, config, Device::Cpu)?;
//! let summary = runner.run()?;
//! println!("best reward: {:?}", summary.best_reward);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Environment contract and the reference bandit
pub mod env;

/// Policy contract, the MLP actor-critic and its inference export
pub mod policy;

/// Rollout storage, advantage bootstrapping and batching
pub mod buffer;

/// Training algorithms
pub mod train;

/// Optimizer contract
pub mod optim;

/// Prelude module for convenient imports
///
/// This module re-exports commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::{
        buffer::{bootstrap_advantages, AdvantageDecay, Batch, Rollout},
        env::{bandit::SimpleBandit, Environment, SpaceInfo, SpaceType, StepResult},
        optim::Optimizer,
        policy::{ActorCritic, ExportMetadata, InferenceModel, MlpPolicy, PolicyOutput},
        train::ppo::{
            collect_rollout, Collection, IterationOutcome, PPOConfig, PPORunner, PPOTrainer,
            RunSummary, TrainingStats,
        },
    };
}

/// Current version of ppo-core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
