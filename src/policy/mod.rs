//! Policy contract and the reference actor-critic
//!
//! The training loop only needs an [`ActorCritic`]: something that maps
//! observations to an action distribution and a value estimate, can be
//! snapshotted, and can be exported as a runnable artifact.

use std::path::Path;

use anyhow::Result;
use tch::Tensor;

pub mod inference;
pub mod mlp;

pub use inference::{ExportMetadata, InferenceModel};
pub use mlp::{MlpConfig, MlpPolicy};

/// Output of a policy query
#[derive(Debug)]
pub struct PolicyOutput {
    /// Actions [batch] (sampled, or the ones supplied by the caller)
    pub actions: Tensor,

    /// Log probabilities of `actions` [batch]
    pub log_probs: Tensor,

    /// Entropy of the action distribution per observation [batch]
    pub entropy: Tensor,

    /// Value estimates [batch]
    pub values: Tensor,
}

/// Actor-critic policy driven by the PPO loop
pub trait ActorCritic {
    /// Query the policy for `obs` [batch, obs_dim]
    ///
    /// With `actions == None` new actions are sampled. When actions are
    /// supplied, log probabilities and entropy refer to those actions.
    fn get_action_and_value(&self, obs: &Tensor, actions: Option<&Tensor>) -> PolicyOutput;

    /// Independent copy of the current parameters
    ///
    /// Later updates to `self` never reach the snapshot.
    fn snapshot(&self) -> Result<Self>
    where
        Self: Sized;

    /// Write a device-independent, runnable artifact to `path`
    fn export(&self, path: &Path, metadata: &ExportMetadata) -> Result<()>;
}
