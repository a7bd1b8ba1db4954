//! Training statistics for PPO
//!
//! Per-minibatch metrics and their average over one `train` call.

use std::ops::AddAssign;

use super::loss::PolicyDiagnostics;

/// Training statistics for a PPO update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingStats {
    /// Policy loss
    pub policy_loss: f64,

    /// Value function loss
    pub value_loss: f64,

    /// Mean entropy
    pub entropy: f64,

    /// Total loss (weighted sum of policy, value, and entropy losses)
    pub total_loss: f64,

    /// Fraction of clipped policy updates
    pub clip_fraction: f64,

    /// KL estimate `mean((r - 1) - log r)`
    pub approx_kl: f64,

    /// KL estimate `mean(-log r)`
    pub old_approx_kl: f64,

    /// Number of gradient updates performed
    pub num_updates: usize,
}

impl TrainingStats {
    /// Create zero-initialized statistics
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Statistics of a single minibatch update
    pub fn new(
        policy_loss: f64,
        value_loss: f64,
        entropy: f64,
        total_loss: f64,
        diagnostics: PolicyDiagnostics,
    ) -> Self {
        Self {
            policy_loss,
            value_loss,
            entropy,
            total_loss,
            clip_fraction: diagnostics.clip_fraction,
            approx_kl: diagnostics.approx_kl,
            old_approx_kl: diagnostics.old_approx_kl,
            num_updates: 1,
        }
    }

    /// Add another statistics instance to this one
    pub fn add(&mut self, other: &TrainingStats) {
        self.policy_loss += other.policy_loss;
        self.value_loss += other.value_loss;
        self.entropy += other.entropy;
        self.total_loss += other.total_loss;
        self.clip_fraction += other.clip_fraction;
        self.approx_kl += other.approx_kl;
        self.old_approx_kl += other.old_approx_kl;
        self.num_updates += other.num_updates;
    }

    /// Compute average statistics across multiple updates
    ///
    /// `num_updates` of the result keeps the number of updates averaged.
    pub fn average(&self) -> Self {
        let scale = self.num_updates as f64;
        if scale == 0.0 {
            return Self::zeros();
        }

        Self {
            policy_loss: self.policy_loss / scale,
            value_loss: self.value_loss / scale,
            entropy: self.entropy / scale,
            total_loss: self.total_loss / scale,
            clip_fraction: self.clip_fraction / scale,
            approx_kl: self.approx_kl / scale,
            old_approx_kl: self.old_approx_kl / scale,
            num_updates: self.num_updates,
        }
    }
}

impl AddAssign<&TrainingStats> for TrainingStats {
    fn add_assign(&mut self, other: &TrainingStats) {
        self.add(other);
    }
}
