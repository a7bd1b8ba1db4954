//! Collector and runner behaviour against a scripted environment
//!
//! The scripted environment emits the step index as its observation, a fixed
//! reward per episode, and ends each instance's episode after a fixed number
//! of steps, either by termination or by truncation.

use anyhow::{bail, Result};
use ppo_core::{
    buffer::Rollout,
    env::{Environment, SpaceInfo, SpaceType, StepInfo, StepResult},
    optim::Optimizer,
    policy::{ActorCritic, MlpPolicy},
    train::ppo::{collect_rollout, IterationOutcome, PPOConfig, PPORunner, PPOTrainer},
};
use tch::{Device, Tensor};

struct ScriptedEnv {
    /// Episode length of every instance
    lengths: Vec<usize>,
    /// Per-step reward of episode `k` is `rewards[k % rewards.len()]`
    rewards: Vec<f32>,
    /// Report the episode end as truncation instead of termination
    truncate: bool,
    episode: usize,
    t: usize,
}

impl ScriptedEnv {
    fn new(lengths: Vec<usize>, rewards: Vec<f32>) -> Self {
        Self { lengths, rewards, truncate: false, episode: 0, t: 0 }
    }

    fn truncating(mut self) -> Self {
        self.truncate = true;
        self
    }

    fn observations(&self) -> Vec<Vec<f32>> {
        vec![vec![self.t as f32]; self.lengths.len()]
    }
}

impl Environment for ScriptedEnv {
    fn num_envs(&self) -> usize {
        self.lengths.len()
    }

    fn reset(&mut self) -> Result<Vec<Vec<f32>>> {
        self.t = 0;
        Ok(self.observations())
    }

    fn step(&mut self, actions: &[i64]) -> Result<StepResult> {
        if actions.len() != self.lengths.len() {
            bail!("wrong number of actions");
        }
        let reward = self.rewards[self.episode % self.rewards.len()];
        self.t += 1;

        let done: Vec<bool> = self.lengths.iter().map(|&len| self.t >= len).collect();
        if done.iter().any(|&d| d) {
            self.episode += 1;
        }
        let none = vec![false; done.len()];
        let (terminated, truncated) =
            if self.truncate { (none, done) } else { (done, none) };

        Ok(StepResult {
            observations: self.observations(),
            rewards: vec![reward; self.lengths.len()],
            terminated,
            truncated,
            info: StepInfo::default(),
        })
    }

    fn observation_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![1], space_type: SpaceType::Box }
    }

    fn action_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![], space_type: SpaceType::Discrete(2) }
    }
}

/// Returns one reward too few
struct BrokenEnv;

impl Environment for BrokenEnv {
    fn num_envs(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![0.0]; 2])
    }

    fn step(&mut self, _actions: &[i64]) -> Result<StepResult> {
        Ok(StepResult {
            observations: vec![vec![0.0]; 2],
            rewards: vec![1.0],
            terminated: vec![false; 2],
            truncated: vec![false; 2],
            info: StepInfo::default(),
        })
    }

    fn observation_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![1], space_type: SpaceType::Box }
    }

    fn action_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![], space_type: SpaceType::Discrete(2) }
    }
}

#[derive(Default)]
struct CountingOptimizer {
    steps: usize,
}

impl Optimizer for CountingOptimizer {
    fn zero_grad(&mut self) {}

    fn step(&mut self) {
        self.steps += 1;
    }
}

fn policy() -> MlpPolicy {
    MlpPolicy::new(1, 2, 16, Device::Cpu)
}

fn probe(policy: &MlpPolicy) -> (Tensor, Tensor) {
    let obs = Tensor::from_slice(&[0.0_f32, 1.0, 2.0, 5.0]).view([4, 1]);
    tch::no_grad(|| policy.forward(&obs))
}

fn max_abs_diff(a: &Tensor, b: &Tensor) -> f64 {
    f64::try_from((a - b).abs().max()).unwrap()
}

#[test]
fn test_collect_stops_on_termination() {
    let mut env = ScriptedEnv::new(vec![3], vec![0.5]);
    let policy = policy();
    let mut rollout = Rollout::new(8, 1, 1);

    let collection = collect_rollout(&mut env, &policy, &mut rollout, Device::Cpu).unwrap();

    assert_eq!(collection.end_step, 2);
    assert_eq!(collection.total_reward, 1.5);
    assert!(rollout.terminated()[2][0]);
    assert!(!rollout.terminated()[1][0]);
    // Cells after the stop are untouched
    assert_eq!(rollout.rewards()[3][0], 0.0);
}

#[test]
fn test_collect_stops_on_truncation() {
    let mut env = ScriptedEnv::new(vec![4], vec![1.0]).truncating();
    let policy = policy();
    let mut rollout = Rollout::new(8, 1, 1);

    let collection = collect_rollout(&mut env, &policy, &mut rollout, Device::Cpu).unwrap();

    assert_eq!(collection.end_step, 3);
    // Truncation is not recorded as termination
    assert!(rollout.terminated().iter().flatten().all(|&t| !t));
}

#[test]
fn test_collect_stops_when_any_instance_finishes() {
    let mut env = ScriptedEnv::new(vec![6, 2, 9], vec![1.0]);
    let policy = policy();
    let mut rollout = Rollout::new(8, 3, 1);

    let collection = collect_rollout(&mut env, &policy, &mut rollout, Device::Cpu).unwrap();

    assert_eq!(collection.end_step, 1);
    assert_eq!(collection.total_reward, 6.0);
    assert_eq!(rollout.terminated()[1], vec![false, true, false]);
}

#[test]
fn test_collect_budget_exhausted() {
    let mut env = ScriptedEnv::new(vec![100, 100], vec![0.25]);
    let policy = policy();
    let mut rollout = Rollout::new(5, 2, 1);

    let collection = collect_rollout(&mut env, &policy, &mut rollout, Device::Cpu).unwrap();

    assert_eq!(collection.end_step, 4);
    assert_eq!(collection.total_reward, 2.5);
}

#[test]
fn test_collect_records_input_observations() {
    let mut env = ScriptedEnv::new(vec![10], vec![1.0]);
    let policy = policy();
    let mut rollout = Rollout::new(4, 1, 1);

    collect_rollout(&mut env, &policy, &mut rollout, Device::Cpu).unwrap();

    // Observation at step t is the one the policy acted on, not the next one
    for t in 0..4 {
        assert_eq!(rollout.observations()[t][0], vec![t as f32]);
    }
}

#[test]
fn test_collect_does_not_modify_policy() {
    let mut env = ScriptedEnv::new(vec![10], vec![1.0]);
    let policy = policy();
    let (logits_before, values_before) = probe(&policy);

    let mut rollout = Rollout::new(6, 1, 1);
    collect_rollout(&mut env, &policy, &mut rollout, Device::Cpu).unwrap();

    let (logits_after, values_after) = probe(&policy);
    assert_eq!(max_abs_diff(&logits_before, &logits_after), 0.0);
    assert_eq!(max_abs_diff(&values_before, &values_after), 0.0);
}

#[test]
fn test_collect_rejects_malformed_step() {
    let policy = policy();
    let mut rollout = Rollout::new(4, 2, 1);

    let err = collect_rollout(&mut BrokenEnv, &policy, &mut rollout, Device::Cpu).unwrap_err();
    assert!(err.to_string().contains("rewards"), "unexpected error: {}", err);
}

#[test]
fn test_short_episode_is_skipped() {
    let env = ScriptedEnv::new(vec![4], vec![1.0]);
    let mut optimizer = CountingOptimizer::default();
    let config = PPOConfig::new().n_steps(16).batch_size(10);

    {
        let mut runner =
            PPORunner::new(env, policy(), &mut optimizer, config, Device::Cpu).unwrap();

        let outcome = runner.iteration().unwrap();
        match outcome {
            IterationOutcome::Skipped { collection } => assert_eq!(collection.end_step, 3),
            other => panic!("expected a skip, got {:?}", other),
        }
        assert_eq!(runner.total_steps(), 0);
        assert!(runner.best_policy().is_none());
        assert_eq!(runner.best_reward(), None);
    }

    assert_eq!(optimizer.steps, 0);
}

#[test]
fn test_best_policy_is_retained() {
    // Episode 0 pays 0.5 per step, episode 1 pays 0.3; both last 10 steps
    let env = ScriptedEnv::new(vec![10], vec![0.5, 0.3]);
    let policy = policy();
    let optimizer = policy.optimizer(0.01).unwrap();
    let config = PPOConfig::new().n_steps(32).batch_size(4).n_epochs(4);
    let trainer = PPOTrainer::with_seed(config, 42).unwrap();

    let mut runner = PPORunner::with_trainer(env, policy, optimizer, trainer, Device::Cpu);

    let first = runner.iteration().unwrap();
    assert!(matches!(first, IterationOutcome::Trained { collection, .. } if collection.total_reward == 5.0));
    assert_eq!(runner.best_reward(), Some(5.0));

    let best = runner.best_policy().expect("best policy after first iteration");
    let (best_logits, best_values) = probe(best);

    // The best snapshot matches the policy it was taken from
    let (current_logits, _) = probe(runner.policy());
    assert_eq!(max_abs_diff(&best_logits, &current_logits), 0.0);

    let second = runner.iteration().unwrap();
    match second {
        IterationOutcome::Trained { collection, .. } => {
            assert!((collection.total_reward - 3.0).abs() < 1e-5)
        }
        other => panic!("expected training, got {:?}", other),
    }

    // Worse rollout: best is kept as it was
    assert_eq!(runner.best_reward(), Some(5.0));
    let best = runner.best_policy().expect("best policy retained");
    let (kept_logits, kept_values) = probe(best);
    assert_eq!(max_abs_diff(&best_logits, &kept_logits), 0.0);
    assert_eq!(max_abs_diff(&best_values, &kept_values), 0.0);

    // The live policy kept training
    let (current_logits, current_values) = probe(runner.policy());
    assert!(
        max_abs_diff(&best_logits, &current_logits) > 0.0
            || max_abs_diff(&best_values, &current_values) > 0.0
    );

    // A snapshot of a snapshot is still equal
    let copy = runner.best_policy().unwrap().snapshot().unwrap();
    let (copy_logits, _) = probe(&copy);
    assert_eq!(max_abs_diff(&best_logits, &copy_logits), 0.0);
}
