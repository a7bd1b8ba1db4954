//! Rollout collection
//!
//! Drives the environment with the current policy until the step budget runs
//! out or any instance finishes its episode.

use anyhow::{bail, Result};
use tch::{Device, Kind, Tensor};

use crate::{buffer::Rollout, env::Environment, policy::ActorCritic};

/// Outcome of one collection cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collection {
    /// Rewards summed over steps and instances
    pub total_reward: f32,

    /// Index of the last valid step
    ///
    /// The step at which an episode ended, or `num_steps - 1` when the
    /// budget ran out first.
    pub end_step: usize,
}

fn check_width(source: &str, what: &str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        bail!("{} returned {} {} for {} instances", source, got, what, expected);
    }
    Ok(())
}

fn check_observations(observations: &[Vec<f32>], num_envs: usize, obs_dim: usize) -> Result<()> {
    check_width("environment", "observations", observations.len(), num_envs)?;
    if let Some(bad) = observations.iter().position(|obs| obs.len() != obs_dim) {
        bail!(
            "observation of instance {} has {} features, expected {}",
            bad,
            observations[bad].len(),
            obs_dim
        );
    }
    Ok(())
}

fn to_f32_vec(tensor: &Tensor) -> Result<Vec<f32>> {
    Ok(Vec::<f32>::try_from(tensor.to_device(Device::Cpu).to_kind(Kind::Float).view([-1]))?)
}

/// Fill `rollout` by stepping `env` with actions sampled from `policy`
///
/// Each step records the observation the policy was queried with, the
/// sampled action, its log probability and value estimate, then the reward
/// and termination flag the environment returned. Collection stops at the
/// first step where any instance terminates or is truncated.
///
/// Runs without gradient tracking; `policy` is never modified.
pub fn collect_rollout<E, P>(
    env: &mut E,
    policy: &P,
    rollout: &mut Rollout,
    device: Device,
) -> Result<Collection>
where
    E: Environment + ?Sized,
    P: ActorCritic + ?Sized,
{
    let (num_steps, num_envs, obs_dim) = rollout.shape();
    if num_steps == 0 {
        bail!("rollout has no steps to collect into");
    }
    if env.num_envs() != num_envs {
        bail!("rollout sized for {} instances, environment has {}", num_envs, env.num_envs());
    }

    tch::no_grad(|| -> Result<Collection> {
        let mut observations = env.reset()?;
        check_observations(&observations, num_envs, obs_dim)?;

        let mut total_reward = 0.0_f32;
        let mut end_step = num_steps - 1;

        for step in 0..num_steps {
            let flat: Vec<f32> = observations.iter().flatten().copied().collect();
            let obs_tensor = Tensor::from_slice(&flat)
                .view([num_envs as i64, obs_dim as i64])
                .to_device(device);

            let out = policy.get_action_and_value(&obs_tensor, None);
            let actions = Vec::<i64>::try_from(out.actions.to_device(Device::Cpu).view([-1]))?;
            let log_probs = to_f32_vec(&out.log_probs)?;
            let values = to_f32_vec(&out.values)?;
            check_width("policy", "actions", actions.len(), num_envs)?;
            check_width("policy", "log probabilities", log_probs.len(), num_envs)?;
            check_width("policy", "values", values.len(), num_envs)?;

            for env_id in 0..num_envs {
                rollout.record_decision(
                    step,
                    env_id,
                    &observations[env_id],
                    actions[env_id],
                    log_probs[env_id],
                    values[env_id],
                );
            }

            let result = env.step(&actions)?;
            check_width("environment", "rewards", result.rewards.len(), num_envs)?;
            check_width("environment", "termination flags", result.terminated.len(), num_envs)?;
            check_width("environment", "truncation flags", result.truncated.len(), num_envs)?;
            check_observations(&result.observations, num_envs, obs_dim)?;

            for env_id in 0..num_envs {
                rollout.record_outcome(
                    step,
                    env_id,
                    result.rewards[env_id],
                    result.terminated[env_id],
                );
            }
            total_reward += result.rewards.iter().sum::<f32>();

            if result.any_done() {
                end_step = step;
                tracing::debug!("Episode ended at step {}", step);
                break;
            }

            observations = result.observations;
        }

        tracing::debug!("Collected rollout | end_step: {} | reward: {:.3}", end_step, total_reward);
        Ok(Collection { total_reward, end_step })
    })
}
