//! Training algorithms
//!
//! This module implements the PPO training loop.

pub mod ppo;

pub use ppo::{
    collect_rollout, compute_policy_loss, compute_value_loss, Collection, IterationOutcome,
    PPOConfig, PPORunner, PPOTrainer, RunSummary, TrainingStats,
};
