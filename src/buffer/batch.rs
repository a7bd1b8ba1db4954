//! Flattening rollouts into training batches
//!
//! The `[time, env]` leading dimensions of every rollout field are folded into
//! a single entry index, time-major and env-minor. Position `i` refers to the
//! same `(step, env)` cell in every field.

use anyhow::{anyhow, Result};
use tch::{Device, Kind, Tensor};

use super::rollout::Rollout;

/// Flattened rollout data for the valid range `[0, end_step)`
#[derive(Debug, Clone)]
pub struct Batch {
    /// Flattened observations [len * obs_dim]
    pub observations: Vec<f32>,

    /// Actions taken [len]
    pub actions: Vec<i64>,

    /// Log probabilities recorded during collection [len]
    pub log_probs: Vec<f32>,

    /// Value estimates recorded during collection [len]
    pub values: Vec<f32>,

    /// Rewards [len]
    pub rewards: Vec<f32>,

    /// Bootstrapped advantages [len]
    pub advantages: Vec<f32>,

    /// Bootstrapped returns [len]
    pub returns: Vec<f32>,

    /// Observation dimension
    obs_dim: usize,
}

impl Batch {
    /// Flatten the cells before `end_step`
    ///
    /// Fails if the rollout has not been bootstrapped yet.
    pub fn from_rollout(rollout: &Rollout, end_step: usize) -> Result<Self> {
        let advantages = rollout
            .advantages()
            .ok_or_else(|| anyhow!("rollout must be bootstrapped before batching"))?;
        let returns = rollout
            .returns()
            .ok_or_else(|| anyhow!("rollout must be bootstrapped before batching"))?;

        let (num_steps, num_envs, obs_dim) = rollout.shape();
        let steps = end_step.min(num_steps);
        let len = steps * num_envs;

        let mut batch = Self {
            observations: Vec::with_capacity(len * obs_dim),
            actions: Vec::with_capacity(len),
            log_probs: Vec::with_capacity(len),
            values: Vec::with_capacity(len),
            rewards: Vec::with_capacity(len),
            advantages: Vec::with_capacity(len),
            returns: Vec::with_capacity(len),
            obs_dim,
        };

        for step in 0..steps {
            for env in 0..num_envs {
                batch.observations.extend_from_slice(&rollout.observations()[step][env]);
                batch.actions.push(rollout.actions()[step][env]);
                batch.log_probs.push(rollout.log_probs()[step][env]);
                batch.values.push(rollout.values()[step][env]);
                batch.rewards.push(rollout.rewards()[step][env]);
                batch.advantages.push(advantages[step][env]);
                batch.returns.push(returns[step][env]);
            }
        }

        Ok(batch)
    }

    /// Get batch size
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observation dimension
    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    /// Observation of entry `index`
    pub fn observation(&self, index: usize) -> &[f32] {
        &self.observations[index * self.obs_dim..(index + 1) * self.obs_dim]
    }

    /// Move the batch onto `device` as tensors
    pub fn to_tensors(&self, device: Device) -> BatchTensors {
        let len = self.len() as i64;
        BatchTensors {
            observations: Tensor::from_slice(&self.observations)
                .reshape([len, self.obs_dim as i64])
                .to_kind(Kind::Float)
                .to_device(device),
            actions: Tensor::from_slice(&self.actions).to_device(device),
            log_probs: Tensor::from_slice(&self.log_probs).to_device(device),
            values: Tensor::from_slice(&self.values).to_device(device),
            advantages: Tensor::from_slice(&self.advantages).to_device(device),
            returns: Tensor::from_slice(&self.returns).to_device(device),
        }
    }
}

/// Device-resident view of a [`Batch`] used by the trainer
#[derive(Debug)]
pub struct BatchTensors {
    /// Observations [len, obs_dim]
    pub observations: Tensor,
    /// Actions [len]
    pub actions: Tensor,
    /// Old log probabilities [len]
    pub log_probs: Tensor,
    /// Old value estimates [len]
    pub values: Tensor,
    /// Advantages [len]
    pub advantages: Tensor,
    /// Returns [len]
    pub returns: Tensor,
}
