//! Rollout storage
//!
//! A [`Rollout`] holds one trajectory batch of interaction data with a
//! `[num_steps, num_envs]` layout where:
//! - `num_steps`: step budget of one collection cycle
//! - `num_envs`: number of environment instances stepped together
//!
//! Every field is allocated up front and overwritten in place; nothing is
//! ever appended. Advantages and returns stay absent until bootstrapping
//! fills them.

/// Preallocated storage for one collection cycle
///
/// # Example
///
/// ```rust
/// use ppo_core::buffer::rollout::Rollout;
///
/// // 128 steps of a single environment with 4D observations
/// let mut rollout = Rollout::new(128, 1, 4);
///
/// rollout.record_decision(0, 0, &[0.1, 0.2, 0.3, 0.4], 1, -0.69, 0.5);
/// rollout.record_outcome(0, 0, 1.0, false);
/// assert!(!rollout.is_bootstrapped());
/// ```
#[derive(Debug, Clone)]
pub struct Rollout {
    /// Number of steps per rollout
    num_steps: usize,

    /// Number of environment instances
    num_envs: usize,

    /// Dimensionality of observations
    obs_dim: usize,

    /// Observations fed to the policy [num_steps, num_envs, obs_dim]
    observations: Vec<Vec<Vec<f32>>>,

    /// Actions taken [num_steps, num_envs]
    actions: Vec<Vec<i64>>,

    /// Log probabilities of the taken actions [num_steps, num_envs]
    log_probs: Vec<Vec<f32>>,

    /// Value estimates [num_steps, num_envs]
    values: Vec<Vec<f32>>,

    /// Rewards received [num_steps, num_envs]
    rewards: Vec<Vec<f32>>,

    /// Episode termination flags [num_steps, num_envs]
    terminated: Vec<Vec<bool>>,

    /// Bootstrapped advantages [num_steps, num_envs]
    advantages: Option<Vec<Vec<f32>>>,

    /// Bootstrapped returns [num_steps, num_envs]
    returns: Option<Vec<Vec<f32>>>,
}

impl Rollout {
    /// Create a new zero-filled rollout
    ///
    /// # Arguments
    ///
    /// * `num_steps` - Step budget of one collection cycle
    /// * `num_envs` - Number of environment instances
    /// * `obs_dim` - Dimensionality of observations
    pub fn new(num_steps: usize, num_envs: usize, obs_dim: usize) -> Self {
        Self {
            num_steps,
            num_envs,
            obs_dim,
            observations: vec![vec![vec![0.0; obs_dim]; num_envs]; num_steps],
            actions: vec![vec![0; num_envs]; num_steps],
            log_probs: vec![vec![0.0; num_envs]; num_steps],
            values: vec![vec![0.0; num_envs]; num_steps],
            rewards: vec![vec![0.0; num_envs]; num_steps],
            terminated: vec![vec![false; num_envs]; num_steps],
            advantages: None,
            returns: None,
        }
    }

    /// Record what the policy saw and decided at `(step, env_id)`
    ///
    /// # Arguments
    ///
    /// * `observation` - Observation the policy was queried with
    /// * `action` - Action taken
    /// * `log_prob` - Log probability of the action
    /// * `value` - Value estimate for the observation
    pub fn record_decision(
        &mut self,
        step: usize,
        env_id: usize,
        observation: &[f32],
        action: i64,
        log_prob: f32,
        value: f32,
    ) {
        debug_assert!(step < self.num_steps, "step {} >= num_steps {}", step, self.num_steps);
        debug_assert!(env_id < self.num_envs, "env_id {} >= num_envs {}", env_id, self.num_envs);
        debug_assert_eq!(observation.len(), self.obs_dim, "observation dimension mismatch");

        self.observations[step][env_id].copy_from_slice(observation);
        self.actions[step][env_id] = action;
        self.log_probs[step][env_id] = log_prob;
        self.values[step][env_id] = value;
    }

    /// Record what the environment returned for `(step, env_id)`
    pub fn record_outcome(&mut self, step: usize, env_id: usize, reward: f32, terminated: bool) {
        debug_assert!(step < self.num_steps, "step {} >= num_steps {}", step, self.num_steps);
        debug_assert!(env_id < self.num_envs, "env_id {} >= num_envs {}", env_id, self.num_envs);

        self.rewards[step][env_id] = reward;
        self.terminated[step][env_id] = terminated;
    }

    /// Install bootstrapped advantages and returns
    pub(crate) fn set_estimates(&mut self, advantages: Vec<Vec<f32>>, returns: Vec<Vec<f32>>) {
        debug_assert_eq!(advantages.len(), self.num_steps);
        debug_assert_eq!(returns.len(), self.num_steps);

        self.advantages = Some(advantages);
        self.returns = Some(returns);
    }

    /// Get rollout shape (num_steps, num_envs, obs_dim)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.num_steps, self.num_envs, self.obs_dim)
    }

    /// Total number of cells in the rollout
    pub fn len(&self) -> usize {
        self.num_steps * self.num_envs
    }

    /// Check if the rollout has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether advantages and returns have been computed
    pub fn is_bootstrapped(&self) -> bool {
        self.advantages.is_some() && self.returns.is_some()
    }

    /// Sum of every recorded reward
    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().flatten().sum()
    }

    // Getters for raw data access
    pub fn observations(&self) -> &[Vec<Vec<f32>>] { &self.observations }
    pub fn actions(&self) -> &[Vec<i64>] { &self.actions }
    pub fn log_probs(&self) -> &[Vec<f32>] { &self.log_probs }
    pub fn values(&self) -> &[Vec<f32>] { &self.values }
    pub fn rewards(&self) -> &[Vec<f32>] { &self.rewards }
    pub fn terminated(&self) -> &[Vec<bool>] { &self.terminated }
    pub fn advantages(&self) -> Option<&[Vec<f32>]> { self.advantages.as_deref() }
    pub fn returns(&self) -> Option<&[Vec<f32>]> { self.returns.as_deref() }
}
