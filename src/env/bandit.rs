//! Contextual bandit reference environment
//!
//! A trivial environment for checking the training loop end to end:
//! - State: a single binary value (0 or 1) per instance
//! - Actions: two choices (0 or 1)
//! - Reward: +1.0 if action == state, 0.0 otherwise
//! - Episodes: fixed length, reported as truncation
//!
//! A working PPO loop drives the per-step reward towards 1.0.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{Environment, SpaceInfo, SpaceType, StepInfo, StepResult};

/// Vectorized contextual bandit
#[derive(Debug)]
pub struct SimpleBandit {
    states: Vec<f32>,
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl SimpleBandit {
    /// Create a bandit with `num_envs` instances and episodes of `max_steps`
    pub fn new(num_envs: usize, max_steps: usize) -> Self {
        Self::with_rng(num_envs, max_steps, StdRng::from_entropy())
    }

    /// Create a bandit with a deterministic state sequence
    pub fn seeded(num_envs: usize, max_steps: usize, seed: u64) -> Self {
        Self::with_rng(num_envs, max_steps, StdRng::seed_from_u64(seed))
    }

    fn with_rng(num_envs: usize, max_steps: usize, rng: StdRng) -> Self {
        Self { states: vec![0.0; num_envs], steps: 0, max_steps, rng }
    }

    fn observations(&self) -> Vec<Vec<f32>> {
        self.states.iter().map(|&s| vec![s]).collect()
    }

    fn resample(&mut self) {
        for state in &mut self.states {
            *state = self.rng.gen_range(0..2) as f32;
        }
    }
}

impl Environment for SimpleBandit {
    fn num_envs(&self) -> usize {
        self.states.len()
    }

    fn reset(&mut self) -> Result<Vec<Vec<f32>>> {
        self.steps = 0;
        self.resample();
        Ok(self.observations())
    }

    fn step(&mut self, actions: &[i64]) -> Result<StepResult> {
        if actions.len() != self.states.len() {
            bail!("expected {} actions, got {}", self.states.len(), actions.len());
        }

        let rewards = actions
            .iter()
            .zip(&self.states)
            .map(|(&action, &state)| if action == state as i64 { 1.0 } else { 0.0 })
            .collect();

        self.steps += 1;
        let truncated = self.steps >= self.max_steps;
        self.resample();

        let num_envs = self.states.len();
        Ok(StepResult {
            observations: self.observations(),
            rewards,
            terminated: vec![false; num_envs],
            truncated: vec![truncated; num_envs],
            info: StepInfo { episodes_finished: if truncated { num_envs } else { 0 } },
        })
    }

    fn observation_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![1], space_type: SpaceType::Box }
    }

    fn action_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![], space_type: SpaceType::Discrete(2) }
    }
}
