//! Environment contract
//!
//! The training loop talks to environments only through the [`Environment`]
//! trait. An environment may carry several instances side by side; every
//! per-step quantity is reported once per instance.

use anyhow::Result;

pub mod bandit;

/// Core trait for RL environments
pub trait Environment {
    /// Number of environment instances stepped together
    fn num_envs(&self) -> usize {
        1
    }

    /// Reset every instance and return the initial observations
    /// `[num_envs][obs_dim]`
    fn reset(&mut self) -> Result<Vec<Vec<f32>>>;

    /// Step every instance with one action each
    fn step(&mut self, actions: &[i64]) -> Result<StepResult>;

    /// Get the observation space dimensions
    fn observation_space(&self) -> SpaceInfo;

    /// Get the action space dimensions
    fn action_space(&self) -> SpaceInfo;
}

/// Result of an environment step, one entry per instance
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Next observations `[num_envs][obs_dim]`
    pub observations: Vec<Vec<f32>>,

    /// Rewards received
    pub rewards: Vec<f32>,

    /// Whether each instance's episode terminated
    pub terminated: Vec<bool>,

    /// Whether each instance's episode was truncated
    pub truncated: Vec<bool>,

    /// Additional info
    pub info: StepInfo,
}

impl StepResult {
    /// True when any instance terminated or was truncated
    pub fn any_done(&self) -> bool {
        self.terminated.iter().chain(&self.truncated).any(|&done| done)
    }
}

/// Space information for observations and actions
#[derive(Debug, Clone)]
pub struct SpaceInfo {
    /// Shape of the space
    pub shape: Vec<usize>,

    /// Kind of space
    pub space_type: SpaceType,
}

impl SpaceInfo {
    /// Flattened size of one element of the space
    pub fn flat_dim(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Space data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceType {
    /// Discrete space with n options
    Discrete(usize),

    /// Continuous space (Box)
    Box,
}

/// Additional step information
#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    /// Episodes finished during this step, summed over instances
    pub episodes_finished: usize,
}
