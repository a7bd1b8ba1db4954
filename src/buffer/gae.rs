//! Generalized Advantage Estimation (GAE) bootstrapping
//!
//! Advantages are computed by a backward recursion over the valid part of a
//! rollout, independently for every environment instance.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::rollout::Rollout;

/// Decay applied to the next advantage in the backward recursion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvantageDecay {
    /// `gamma * gamma` (default)
    GammaSquared,

    /// `gamma * lambda`, conventional GAE smoothing
    Lambda(f32),
}

impl AdvantageDecay {
    /// Effective per-step decay factor for a discount `gamma`
    pub fn factor(self, gamma: f32) -> f32 {
        match self {
            AdvantageDecay::GammaSquared => gamma * gamma,
            AdvantageDecay::Lambda(lambda) => gamma * lambda,
        }
    }
}

impl Default for AdvantageDecay {
    fn default() -> Self {
        AdvantageDecay::GammaSquared
    }
}

/// Compute advantages and returns for `[0, end_step)`
///
/// # Arguments
/// * `rollout` - Populated rollout; receives the estimates
/// * `end_step` - Index of the last valid step
/// * `gamma` - Discount factor (0 < gamma <= 1)
/// * `decay` - Decay of the advantage recursion
///
/// # Mathematical Formula
/// ```text
/// δ_t = r_t + γ * V_{t+1} * (1 - done_{t+1}) - V_t
/// A_t = δ_t + decay * A_{t+1}
/// R_t = A_t + V_t
/// ```
///
/// The cell at `end_step` only serves as the bootstrap source for
/// `end_step - 1`; its own advantage stays zero. With `end_step == 0` every
/// advantage is zero.
pub fn bootstrap_advantages(
    rollout: &mut Rollout,
    end_step: usize,
    gamma: f32,
    decay: AdvantageDecay,
) -> Result<()> {
    let (num_steps, num_envs, _) = rollout.shape();
    if end_step >= num_steps {
        bail!("end_step {} out of range for a rollout of {} steps", end_step, num_steps);
    }

    let decay = decay.factor(gamma);
    let rewards = rollout.rewards();
    let values = rollout.values();
    let terminated = rollout.terminated();

    let mut advantages = vec![vec![0.0_f32; num_envs]; num_steps];

    for env_id in 0..num_envs {
        for t in (0..end_step).rev() {
            let next_non_terminal = if terminated[t + 1][env_id] { 0.0 } else { 1.0 };
            let delta = rewards[t][env_id] + gamma * values[t + 1][env_id] * next_non_terminal
                - values[t][env_id];

            advantages[t][env_id] = delta + decay * advantages[t + 1][env_id];
        }
    }

    let returns = advantages
        .iter()
        .zip(values)
        .map(|(adv_row, value_row)| adv_row.iter().zip(value_row).map(|(a, v)| a + v).collect())
        .collect();

    rollout.set_estimates(advantages, returns);
    Ok(())
}
