//! PPO configuration and hyperparameters
//!
//! This module defines the configuration parameters for PPO training
//! and provides validation and builder pattern methods.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::buffer::AdvantageDecay;

/// PPO configuration parameters
///
/// Defaults: a 10k-step rollout budget, gamma 0.99, clip 0.2 and 0.1 for
/// both loss coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PPOConfig {
    /// Learning rate used by `MlpPolicy::optimizer_for`
    pub learning_rate: f64,

    /// Number of training epochs per rollout
    pub n_epochs: usize,

    /// Minibatch size for training, also the minimum usable rollout length
    pub batch_size: usize,

    /// Step budget of one rollout
    pub n_steps: usize,

    /// Total training budget; the outer loop stops once it is reached
    pub max_steps: usize,

    /// Discount factor (gamma)
    pub gamma: f32,

    /// Decay of the advantage recursion
    pub advantage_decay: AdvantageDecay,

    /// PPO clipping parameter (epsilon), also bounds value clipping
    pub clip_range: f64,

    /// Value function loss coefficient
    pub vf_coef: f64,

    /// Entropy bonus coefficient
    pub ent_coef: f64,

    /// Feed minibatch-normalized advantages into the policy loss
    pub normalize_advantages: bool,

    /// Directory receiving the exported policies
    pub export_dir: PathBuf,
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self {
            learning_rate: 3e-4,
            n_epochs: 4,
            batch_size: 64,
            n_steps: 10_000,
            max_steps: 100_000,
            gamma: 0.99,
            advantage_decay: AdvantageDecay::GammaSquared,
            clip_range: 0.2,
            vf_coef: 0.1,
            ent_coef: 0.1,
            normalize_advantages: true,
            export_dir: PathBuf::from("."),
        }
    }
}

impl PPOConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.learning_rate <= 0.0 {
            return Err(anyhow!("learning_rate must be positive"));
        }
        if self.n_epochs == 0 {
            return Err(anyhow!("n_epochs must be positive"));
        }
        if self.batch_size == 0 {
            return Err(anyhow!("batch_size must be positive"));
        }
        if self.n_steps == 0 {
            return Err(anyhow!("n_steps must be positive"));
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(anyhow!("gamma must be in (0, 1]"));
        }
        if let AdvantageDecay::Lambda(lambda) = self.advantage_decay {
            if !(0.0..=1.0).contains(&lambda) {
                return Err(anyhow!("GAE lambda must be in [0, 1]"));
            }
        }
        if self.clip_range <= 0.0 {
            return Err(anyhow!("clip_range must be positive"));
        }
        if self.vf_coef < 0.0 {
            return Err(anyhow!("vf_coef must be non-negative"));
        }
        if self.ent_coef < 0.0 {
            return Err(anyhow!("ent_coef must be non-negative"));
        }
        Ok(())
    }

    /// Set learning rate
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set number of training epochs
    pub fn n_epochs(mut self, epochs: usize) -> Self {
        self.n_epochs = epochs;
        self
    }

    /// Set minibatch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set rollout step budget
    pub fn n_steps(mut self, steps: usize) -> Self {
        self.n_steps = steps;
        self
    }

    /// Set total training budget
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    /// Set discount factor
    pub fn gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set advantage decay
    pub fn advantage_decay(mut self, decay: AdvantageDecay) -> Self {
        self.advantage_decay = decay;
        self
    }

    /// Use conventional `gamma * lambda` GAE smoothing
    pub fn gae_lambda(self, lambda: f32) -> Self {
        self.advantage_decay(AdvantageDecay::Lambda(lambda))
    }

    /// Set PPO clipping parameter
    pub fn clip_range(mut self, clip: f64) -> Self {
        self.clip_range = clip;
        self
    }

    /// Set value function loss coefficient
    pub fn vf_coef(mut self, coef: f64) -> Self {
        self.vf_coef = coef;
        self
    }

    /// Set entropy bonus coefficient
    pub fn ent_coef(mut self, coef: f64) -> Self {
        self.ent_coef = coef;
        self
    }

    /// Choose whether normalized advantages feed the policy loss
    pub fn normalize_advantages(mut self, normalize: bool) -> Self {
        self.normalize_advantages = normalize;
        self
    }

    /// Set export directory
    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }
}
