//! Loss computation functions for PPO
//!
//! This module contains the clipped surrogate policy loss, the clipped value
//! loss, the entropy term and the no-grad diagnostics used for monitoring.

use anyhow::Result;
use tch::{Kind, Tensor};

/// Epsilon added to the advantage standard deviation
pub const ADVANTAGE_EPS: f64 = 1e-8;

/// Compute the clipped surrogate policy loss
///
/// `mean(max(-A * r, -A * clamp(r, 1 - c, 1 + c)))`, the pessimistic bound
/// of the PPO objective.
///
/// # Arguments
/// * `ratio` - Probability ratio `exp(new_log_prob - old_log_prob)`
/// * `advantages` - Advantages of the sampled actions
/// * `clip_range` - PPO clipping parameter (epsilon)
pub fn compute_policy_loss(ratio: &Tensor, advantages: &Tensor, clip_range: f64) -> Tensor {
    let pg_loss_1 = -advantages * ratio;
    let pg_loss_2 = -advantages * ratio.clamp(1.0 - clip_range, 1.0 + clip_range);
    pg_loss_1.maximum(&pg_loss_2).mean(Kind::Float)
}

/// Compute the clipped value function loss
///
/// `0.5 * mean(max((v - R)^2, (v_old + clamp(v - v_old, -c, c) - R)^2))`
///
/// # Arguments
/// * `values` - Predicted values under current value function
/// * `old_values` - Values recorded during collection
/// * `returns` - Return targets
/// * `clip_range` - Maximum distance of the clipped value from `old_values`
pub fn compute_value_loss(
    values: &Tensor,
    old_values: &Tensor,
    returns: &Tensor,
    clip_range: f64,
) -> Tensor {
    let v_loss_unclipped = (values - returns).square();
    let v_clipped = old_values + (values - old_values).clamp(-clip_range, clip_range);
    let v_loss_clipped = (v_clipped - returns).square();
    0.5 * v_loss_unclipped.maximum(&v_loss_clipped).mean(Kind::Float)
}

/// Mean entropy of a minibatch; subtracted from the total loss
pub fn compute_entropy_loss(entropy: &Tensor) -> Tensor {
    entropy.mean(Kind::Float)
}

/// `policy_loss - ent_coef * entropy_loss + vf_coef * value_loss`
pub fn compute_total_loss(
    policy_loss: &Tensor,
    entropy_loss: &Tensor,
    value_loss: &Tensor,
    ent_coef: f64,
    vf_coef: f64,
) -> Tensor {
    policy_loss - ent_coef * entropy_loss + vf_coef * value_loss
}

/// Zero mean, unit standard deviation
///
/// Fewer than two entries have no standard deviation and are returned
/// unchanged.
pub fn normalize_advantages(advantages: &Tensor) -> Tensor {
    if advantages.numel() < 2 {
        return advantages.shallow_clone();
    }
    let mean = advantages.mean(Kind::Float);
    let std = advantages.std(true);
    (advantages - mean) / (std + ADVANTAGE_EPS)
}

/// Monitoring statistics of one minibatch update
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolicyDiagnostics {
    /// `mean(-log_ratio)`
    pub old_approx_kl: f64,
    /// `mean((ratio - 1) - log_ratio)`
    pub approx_kl: f64,
    /// Fraction of ratios farther than the clip range from 1
    pub clip_fraction: f64,
}

/// Fraction of `ratio` entries with `|ratio - 1| > clip_range`
pub fn clip_fraction(ratio: &Tensor, clip_range: f64) -> Result<f64> {
    let clipped = (ratio - 1.0).abs().gt(clip_range).to_kind(Kind::Float).mean(Kind::Float);
    Ok(f64::try_from(&clipped)?)
}

/// Compute KL estimators and clip fraction without tracking gradients
///
/// See <http://joschu.net/blog/kl-approx.html> for the estimators.
pub fn policy_diagnostics(
    log_ratio: &Tensor,
    ratio: &Tensor,
    clip_range: f64,
) -> Result<PolicyDiagnostics> {
    tch::no_grad(|| {
        let old_approx_kl = (-log_ratio).mean(Kind::Float);
        let approx_kl = ((ratio - 1.0) - log_ratio).mean(Kind::Float);
        Ok(PolicyDiagnostics {
            old_approx_kl: f64::try_from(&old_approx_kl)?,
            approx_kl: f64::try_from(&approx_kl)?,
            clip_fraction: clip_fraction(ratio, clip_range)?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(t: &Tensor) -> f64 {
        f64::try_from(t).unwrap()
    }

    #[test]
    fn test_policy_loss_no_clipping() {
        let ratio = Tensor::from_slice(&[1.0_f32, 1.0]);
        let advantages = Tensor::from_slice(&[1.0_f32, -2.0]);

        let loss = compute_policy_loss(&ratio, &advantages, 0.2);
        // -(1 + -2) / 2
        assert!((scalar(&loss) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_policy_loss_with_clipping() {
        // Positive advantage: gain capped at 1 + clip
        let ratio = Tensor::from_slice(&[1.5_f32]);
        let advantages = Tensor::from_slice(&[2.0_f32]);
        let loss = compute_policy_loss(&ratio, &advantages, 0.2);
        assert!((scalar(&loss) - (-2.4)).abs() < 1e-5);

        // Negative advantage: the unclipped, more pessimistic term wins
        let ratio = Tensor::from_slice(&[1.5_f32]);
        let advantages = Tensor::from_slice(&[-2.0_f32]);
        let loss = compute_policy_loss(&ratio, &advantages, 0.2);
        assert!((scalar(&loss) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_value_loss() {
        let values = Tensor::from_slice(&[1.0_f32, 2.0]);
        let old_values = Tensor::from_slice(&[1.0_f32, 2.0]);
        let returns = Tensor::from_slice(&[2.0_f32, 2.0]);

        let loss = compute_value_loss(&values, &old_values, &returns, 0.2);
        // 0.5 * mean([1, 0])
        assert!((scalar(&loss) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_value_loss_with_clipping() {
        // The new value jumped past the target; the clipped value is still
        // far away, so the larger clipped error is used
        let values = Tensor::from_slice(&[3.0_f32]);
        let old_values = Tensor::from_slice(&[0.0_f32]);
        let returns = Tensor::from_slice(&[3.0_f32]);

        let loss = compute_value_loss(&values, &old_values, &returns, 0.2);
        let expected = 0.5 * (0.2_f64 - 3.0).powi(2);
        assert!((scalar(&loss) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_entropy_and_total_loss() {
        let entropy = Tensor::from_slice(&[0.5_f32, 1.5]);
        let entropy_loss = compute_entropy_loss(&entropy);
        assert!((scalar(&entropy_loss) - 1.0).abs() < 1e-6);

        let policy_loss = Tensor::from(2.0_f32);
        let value_loss = Tensor::from(4.0_f32);
        let total = compute_total_loss(&policy_loss, &entropy_loss, &value_loss, 0.1, 0.5);
        assert!((scalar(&total) - (2.0 - 0.1 + 2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_advantages() {
        let advantages = Tensor::from_slice(&[1.0_f32, 2.0, 3.0, 4.0]);
        let normalized = normalize_advantages(&advantages);

        assert!(scalar(&normalized.mean(Kind::Float)).abs() < 1e-6);
        assert!((scalar(&normalized.std(true)) - 1.0).abs() < 1e-4);

        let single = Tensor::from_slice(&[5.0_f32]);
        assert_eq!(scalar(&normalize_advantages(&single).sum(Kind::Float)), 5.0);
    }

    #[test]
    fn test_clip_fraction_monotonic_in_clip_range() {
        let ratio = Tensor::from_slice(&[0.5_f32, 0.85, 0.95, 1.0, 1.05, 1.15, 1.3, 2.0]);

        let mut previous = f64::INFINITY;
        for clip in [0.01, 0.05, 0.1, 0.2, 0.3, 0.5, 1.0, 2.0] {
            let fraction = clip_fraction(&ratio, clip).unwrap();
            assert!(
                fraction <= previous,
                "clip fraction rose from {} to {} at clip {}",
                previous,
                fraction,
                clip
            );
            previous = fraction;
        }
        assert_eq!(clip_fraction(&ratio, 0.01).unwrap(), 7.0 / 8.0);
        assert_eq!(clip_fraction(&ratio, 2.0).unwrap(), 0.0);
    }

    #[test]
    fn test_diagnostics_at_identity_ratio() {
        let log_ratio = Tensor::zeros([4], (Kind::Float, tch::Device::Cpu));
        let ratio = log_ratio.exp();

        let diagnostics = policy_diagnostics(&log_ratio, &ratio, 0.2).unwrap();
        assert_eq!(diagnostics, PolicyDiagnostics::default());
    }

    #[test]
    fn test_diagnostics_kl_estimators() {
        let log_ratio = Tensor::from_slice(&[0.5_f32, -0.5]);
        let ratio = log_ratio.exp();

        let diagnostics = policy_diagnostics(&log_ratio, &ratio, 0.2).unwrap();
        let expected_k3 = ((0.5_f64.exp() - 1.0 - 0.5) + ((-0.5_f64).exp() - 1.0 + 0.5)) / 2.0;
        assert!(diagnostics.old_approx_kl.abs() < 1e-6);
        assert!((diagnostics.approx_kl - expected_k3).abs() < 1e-5);
        assert_eq!(diagnostics.clip_fraction, 1.0);
    }

    #[test]
    fn test_diagnostics_on_double_tensors() {
        let log_ratio = Tensor::from_slice(&[0.1_f64, -0.1, 0.3]);
        let ratio = log_ratio.exp();

        let diagnostics = policy_diagnostics(&log_ratio, &ratio, 0.2).unwrap();
        assert!((diagnostics.old_approx_kl - (-0.3 / 3.0)).abs() < 1e-6);
        // Only exp(0.3) - 1 = 0.35 lies outside the clip range
        assert!((diagnostics.clip_fraction - 1.0 / 3.0).abs() < 1e-6);
    }
}
