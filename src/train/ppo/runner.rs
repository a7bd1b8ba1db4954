//! PPO outer loop
//!
//! [`PPORunner`] alternates collection and training until the step budget is
//! spent, keeps a frozen copy of the best policy seen, and exports both the
//! final and the best policy when done.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Result;
use tch::Device;

use super::{
    collector::{collect_rollout, Collection},
    config::PPOConfig,
    trainer::PPOTrainer,
};
use crate::{
    buffer::{bootstrap_advantages, Batch, Rollout},
    env::Environment,
    optim::Optimizer,
    policy::{ActorCritic, ExportMetadata},
};

/// File name of the exported final policy
pub const MODEL_FILE: &str = "model.json";

/// File name of the exported best policy
pub const BEST_MODEL_FILE: &str = "best_model.json";

/// What one call to [`PPORunner::iteration`] did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IterationOutcome {
    /// The episode ended before `batch_size` steps; nothing was trained
    Skipped {
        /// Collection result
        collection: Collection,
    },

    /// The rollout was bootstrapped and trained on
    Trained {
        /// Collection result
        collection: Collection,
        /// Steps credited to the training budget
        steps: usize,
    },
}

/// Summary returned by [`PPORunner::run`]
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Training budget consumed
    pub total_steps: usize,
    /// Iterations that reached the trainer
    pub iterations: usize,
    /// Iterations skipped because the rollout was too short
    pub skipped: usize,
    /// Best total rollout reward among trained iterations
    pub best_reward: Option<f32>,
    /// Path of the exported final policy
    pub model_path: PathBuf,
    /// Path of the exported best policy
    pub best_model_path: PathBuf,
}

/// Collect, bootstrap, train; repeat until `max_steps`
pub struct PPORunner<E, P, O> {
    env: E,
    policy: P,
    optimizer: O,
    trainer: PPOTrainer,
    config: PPOConfig,
    device: Device,
    obs_dim: usize,
    total_steps: usize,
    iterations: usize,
    skipped: usize,
    best_policy: Option<P>,
    best_reward: Option<f32>,
}

impl<E, P, O> PPORunner<E, P, O>
where
    E: Environment,
    P: ActorCritic,
    O: Optimizer,
{
    /// Create a runner; `optimizer` must update the parameters of `policy`
    pub fn new(env: E, policy: P, optimizer: O, config: PPOConfig, device: Device) -> Result<Self> {
        let trainer = PPOTrainer::new(config)?;
        Ok(Self::with_trainer(env, policy, optimizer, trainer, device))
    }

    /// Create a runner around an existing trainer (e.g. a seeded one)
    pub fn with_trainer(
        env: E,
        policy: P,
        optimizer: O,
        trainer: PPOTrainer,
        device: Device,
    ) -> Self {
        let obs_dim = env.observation_space().flat_dim();
        let config = trainer.config().clone();
        Self {
            env,
            policy,
            optimizer,
            trainer,
            config,
            device,
            obs_dim,
            total_steps: 0,
            iterations: 0,
            skipped: 0,
            best_policy: None,
            best_reward: None,
        }
    }

    /// One collect/bootstrap/train cycle
    pub fn iteration(&mut self) -> Result<IterationOutcome> {
        let mut rollout = Rollout::new(self.config.n_steps, self.env.num_envs(), self.obs_dim);
        let collection = collect_rollout(&mut self.env, &self.policy, &mut rollout, self.device)?;
        let end_step = collection.end_step;

        if end_step < self.config.batch_size {
            self.skipped += 1;
            tracing::debug!(
                "Skipping rollout: end_step {} < batch_size {}",
                end_step,
                self.config.batch_size
            );
            return Ok(IterationOutcome::Skipped { collection });
        }

        bootstrap_advantages(
            &mut rollout,
            end_step,
            self.config.gamma,
            self.config.advantage_decay,
        )?;
        let batch = Batch::from_rollout(&rollout, end_step)?;

        let steps = self.trainer.train(&batch, &self.policy, &mut self.optimizer, self.device)?;
        self.total_steps += steps;
        self.iterations += 1;

        if self.best_reward.map_or(true, |best| collection.total_reward > best) {
            self.best_policy = Some(self.policy.snapshot()?);
            self.best_reward = Some(collection.total_reward);
            tracing::info!("New best policy | reward: {:.3}", collection.total_reward);
        }

        tracing::info!(
            "Iteration {} | Steps: {}/{} | Episode length: {} | Reward: {:.3}",
            self.iterations,
            self.total_steps,
            self.config.max_steps,
            end_step + 1,
            collection.total_reward,
        );

        Ok(IterationOutcome::Trained { collection, steps })
    }

    /// Iterate until `max_steps` is reached, then export both policies
    ///
    /// Loops forever if every episode is shorter than `batch_size`.
    pub fn run(&mut self) -> Result<RunSummary> {
        tracing::info!("Starting training for {} steps...", self.config.max_steps);
        while self.total_steps < self.config.max_steps {
            self.iteration()?;
        }
        self.export()
    }

    /// Write `model.json` and `best_model.json` into the export directory
    ///
    /// Without a best policy yet, the current policy is snapshotted as best.
    pub fn export(&mut self) -> Result<RunSummary> {
        let dir = self.config.export_dir.clone();
        std::fs::create_dir_all(&dir)?;

        let best = match self.best_policy.take() {
            Some(best) => best,
            None => self.policy.snapshot()?,
        };

        let metadata = self.metadata()?;
        let model_path = dir.join(MODEL_FILE);
        let best_model_path = dir.join(BEST_MODEL_FILE);
        let exported = export_policy(&self.policy, &model_path, &metadata)
            .and_then(|_| export_policy(&best, &best_model_path, &metadata));
        self.best_policy = Some(best);
        exported?;

        tracing::info!("Training complete | total steps: {}", self.total_steps);
        Ok(RunSummary {
            total_steps: self.total_steps,
            iterations: self.iterations,
            skipped: self.skipped,
            best_reward: self.best_reward,
            model_path,
            best_model_path,
        })
    }

    fn metadata(&self) -> Result<ExportMetadata> {
        let hyperparameters: HashMap<String, serde_json::Value> =
            serde_json::from_value(serde_json::to_value(&self.config)?)?;

        Ok(ExportMetadata {
            total_steps: self.total_steps,
            iterations: self.iterations,
            best_reward: self.best_reward,
            device: format!("{:?}", self.device),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            hyperparameters: Some(hyperparameters),
        })
    }

    /// Training budget consumed so far
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Iterations that reached the trainer
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Iterations skipped because the episode was too short
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The policy being trained
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Frozen copy of the best policy so far
    pub fn best_policy(&self) -> Option<&P> {
        self.best_policy.as_ref()
    }

    /// Total rollout reward of the best policy
    pub fn best_reward(&self) -> Option<f32> {
        self.best_reward
    }

    /// The trainer, for its statistics
    pub fn trainer(&self) -> &PPOTrainer {
        &self.trainer
    }

    /// The environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Get the configuration
    pub fn config(&self) -> &PPOConfig {
        &self.config
    }
}

fn export_policy<P: ActorCritic>(policy: &P, path: &Path, metadata: &ExportMetadata) -> Result<()> {
    policy.export(path, metadata)?;
    tracing::info!("Model exported to {}", path.display());
    Ok(())
}
