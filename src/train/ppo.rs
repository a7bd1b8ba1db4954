//! Proximal Policy Optimization (PPO) algorithm
//!
//! PPO is a policy gradient method that uses a clipped surrogate objective
//! to keep each update close to the policy that collected the data.
//!
//! # Algorithm Overview
//!
//! ```text
//! While total_steps < max_steps:
//!   1. Collect a rollout with the current policy until the budget runs out
//!      or an episode ends
//!   2. Skip it if it is shorter than one minibatch
//!   3. Bootstrap advantages and returns
//!   4. For n_epochs:
//!      a. Shuffle the batch into minibatches
//!      b. Compute PPO loss (clipped objective)
//!      c. Update policy via gradient descent
//!   5. Snapshot the policy if the rollout reward is a new best
//! Export the final and the best policy
//! ```
//!
//! # References
//!
//! - [Proximal Policy Optimization Algorithms](https://arxiv.org/abs/1707.06347)
//! - [High-Dimensional Continuous Control Using GAE](https://arxiv.org/abs/1506.02438)
//! - [OpenAI Spinning Up: PPO](https://spinningup.openai.com/en/latest/algorithms/ppo.html)

pub mod collector;
pub mod config;
pub mod loss;
pub mod runner;
pub mod stats;
pub mod trainer;

pub use collector::{collect_rollout, Collection};
pub use config::PPOConfig;
pub use loss::{
    compute_entropy_loss, compute_policy_loss, compute_total_loss, compute_value_loss,
    normalize_advantages, policy_diagnostics, PolicyDiagnostics,
};
pub use runner::{IterationOutcome, PPORunner, RunSummary, BEST_MODEL_FILE, MODEL_FILE};
pub use stats::TrainingStats;
pub use trainer::{generate_minibatch_indices, PPOTrainer};
