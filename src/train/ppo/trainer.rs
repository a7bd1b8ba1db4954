//! PPO trainer
//!
//! Runs several epochs of shuffled minibatch updates over one batch using the
//! clipped PPO objective.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tch::{Device, Tensor};

use super::{config::PPOConfig, loss::*, stats::TrainingStats};
use crate::{buffer::Batch, optim::Optimizer, policy::ActorCritic};

/// Shuffle `[0, len)` and split it into chunks of `batch_size`
///
/// The last chunk holds the remainder and may be shorter.
pub fn generate_minibatch_indices<R: rand::Rng + ?Sized>(
    len: usize,
    batch_size: usize,
    rng: &mut R,
) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);

    indices.chunks(batch_size.max(1)).map(<[usize]>::to_vec).collect()
}

/// PPO Trainer for policy optimization
#[derive(Debug)]
pub struct PPOTrainer {
    config: PPOConfig,
    rng: StdRng,
    last_stats: TrainingStats,
}

impl PPOTrainer {
    /// Create a new PPO trainer
    pub fn new(config: PPOConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a trainer with deterministic minibatch shuffling
    pub fn with_seed(config: PPOConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: PPOConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, rng, last_stats: TrainingStats::zeros() })
    }

    /// Get the configuration
    pub fn config(&self) -> &PPOConfig {
        &self.config
    }

    /// Averaged statistics of the most recent `train` call
    pub fn last_stats(&self) -> &TrainingStats {
        &self.last_stats
    }

    /// Run `n_epochs` passes of minibatch updates over `batch`
    ///
    /// Every minibatch advances the returned counter by `batch_size`, so the
    /// result counts update sample slots rather than environment steps.
    ///
    /// # Arguments
    ///
    /// * `batch` - Flattened rollout data
    /// * `policy` - Policy whose parameters `optimizer` updates
    /// * `optimizer` - Gradient-descent step over the policy parameters
    /// * `device` - Device the policy lives on
    pub fn train<P, O>(
        &mut self,
        batch: &Batch,
        policy: &P,
        optimizer: &mut O,
        device: Device,
    ) -> Result<usize>
    where
        P: ActorCritic,
        O: Optimizer + ?Sized,
    {
        if batch.is_empty() {
            bail!("cannot train on an empty batch");
        }

        let data = batch.to_tensors(device);
        let mut updates = 0;
        let mut stats_sum = TrainingStats::zeros();

        for epoch in 0..self.config.n_epochs {
            let minibatches =
                generate_minibatch_indices(batch.len(), self.config.batch_size, &mut self.rng);
            let mut epoch_stats = TrainingStats::zeros();

            for indices in &minibatches {
                let indices_i64: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
                let index = Tensor::from_slice(&indices_i64).to_device(device);

                let mb_obs = data.observations.index_select(0, &index);
                let mb_actions = data.actions.index_select(0, &index);
                let mb_old_log_probs = data.log_probs.index_select(0, &index);
                let mb_old_values = data.values.index_select(0, &index);
                let mb_advantages = data.advantages.index_select(0, &index);
                let mb_returns = data.returns.index_select(0, &index);

                let out = policy.get_action_and_value(&mb_obs, Some(&mb_actions));
                let log_ratio = &out.log_probs - &mb_old_log_probs;
                let ratio = log_ratio.exp();

                let diagnostics =
                    policy_diagnostics(&log_ratio, &ratio, self.config.clip_range)?;

                let mb_advantages = if self.config.normalize_advantages {
                    normalize_advantages(&mb_advantages)
                } else {
                    mb_advantages
                };

                let policy_loss =
                    compute_policy_loss(&ratio, &mb_advantages, self.config.clip_range);
                let value_loss = compute_value_loss(
                    &out.values.flatten(0, -1),
                    &mb_old_values,
                    &mb_returns,
                    self.config.clip_range,
                );
                let entropy_loss = compute_entropy_loss(&out.entropy);
                let loss = compute_total_loss(
                    &policy_loss,
                    &entropy_loss,
                    &value_loss,
                    self.config.ent_coef,
                    self.config.vf_coef,
                );

                optimizer.zero_grad();
                loss.backward();
                optimizer.step();

                updates += self.config.batch_size;

                epoch_stats += &TrainingStats::new(
                    f64::try_from(&policy_loss)?,
                    f64::try_from(&value_loss)?,
                    f64::try_from(&entropy_loss)?,
                    f64::try_from(&loss)?,
                    diagnostics,
                );
            }

            let epoch_avg = epoch_stats.average();
            tracing::debug!(
                "Epoch {} | Loss: {:.4} | Clip Fraction: {:.3} | Approx KL: {:.5}",
                epoch,
                epoch_avg.total_loss,
                epoch_avg.clip_fraction,
                epoch_avg.approx_kl,
            );
            stats_sum += &epoch_stats;
        }

        self.last_stats = stats_sum.average();
        tracing::info!(
            "Trained {} epochs | Loss: {:.4} | Policy: {:.4} | Value: {:.4} | Entropy: {:.4} | Clip Fraction: {:.3}",
            self.config.n_epochs,
            self.last_stats.total_loss,
            self.last_stats.policy_loss,
            self.last_stats.value_loss,
            self.last_stats.entropy,
            self.last_stats.clip_fraction,
        );

        Ok(updates)
    }
}
