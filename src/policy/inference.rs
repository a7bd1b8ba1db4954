//! Exported policy artifacts
//!
//! Trained policies are written as JSON: plain weight matrices plus the
//! activation they were trained with. Loading and running an artifact needs
//! neither libtorch nor the device the policy was trained on.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Hidden-layer activation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Activation {
    /// `max(x, 0)`
    ReLU,
    /// Hyperbolic tangent
    Tanh,
}

impl Activation {
    /// Apply activation function to a single value
    #[inline]
    pub fn apply(&self, x: f32) -> f32 {
        match self {
            Activation::ReLU => x.max(0.0),
            Activation::Tanh => x.tanh(),
        }
    }
}

/// Fully connected layer, PyTorch layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weights [out_features, in_features]
    pub weight: Vec<Vec<f32>>,
    /// Bias [out_features]
    pub bias: Vec<f32>,
}

impl DenseLayer {
    /// Number of inputs
    pub fn in_features(&self) -> usize {
        self.weight.first().map_or(0, Vec::len)
    }

    /// Number of outputs
    pub fn out_features(&self) -> usize {
        self.weight.len()
    }

    /// `W x + b`
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weight
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }
}

/// Provenance recorded alongside exported weights
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Training budget consumed when the artifact was written
    pub total_steps: usize,
    /// Outer-loop iterations that reached the trainer
    pub iterations: usize,
    /// Best total rollout reward seen
    pub best_reward: Option<f32>,
    /// Device the policy was trained on
    pub device: String,
    /// RFC 3339 export time
    pub timestamp: Option<String>,
    /// Hyperparameters used for training
    pub hyperparameters: Option<HashMap<String, serde_json::Value>>,
}

/// A serializable actor-critic MLP for inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceModel {
    /// Input dimension
    pub obs_dim: usize,
    /// Number of discrete actions
    pub action_dim: usize,
    /// Activation applied after every shared layer
    pub activation: Activation,
    /// Shared feature layers, input first
    pub shared: Vec<DenseLayer>,
    /// Policy head (action logits)
    pub policy_head: DenseLayer,
    /// Value head (single output)
    pub value_head: DenseLayer,
    /// Training provenance
    #[serde(default)]
    pub metadata: Option<ExportMetadata>,
}

impl InferenceModel {
    /// Check that layer shapes chain from `obs_dim` to the heads
    pub fn validate(&self) -> Result<()> {
        let mut width = self.obs_dim;
        for (i, layer) in self.shared.iter().enumerate() {
            if layer.in_features() != width || layer.bias.len() != layer.out_features() {
                bail!("shared layer {} does not accept {} inputs", i, width);
            }
            width = layer.out_features();
        }
        if self.policy_head.in_features() != width
            || self.policy_head.out_features() != self.action_dim
        {
            bail!("policy head shape does not match [{}, {}]", self.action_dim, width);
        }
        if self.value_head.in_features() != width || self.value_head.out_features() != 1 {
            bail!("value head shape does not match [1, {}]", width);
        }
        Ok(())
    }

    /// Save model to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load model from JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&json)?;
        model.validate()?;
        Ok(model)
    }

    /// Forward pass: compute action logits and value
    ///
    /// # Arguments
    /// * `obs` - Observation vector [obs_dim]
    ///
    /// # Returns
    /// * `(logits, value)` - Action logits [action_dim] and state value
    pub fn forward(&self, obs: &[f32]) -> Result<(Vec<f32>, f32)> {
        if obs.len() != self.obs_dim {
            bail!("expected observation of length {}, got {}", self.obs_dim, obs.len());
        }

        let mut features = obs.to_vec();
        for layer in &self.shared {
            features = layer.forward(&features);
            for x in &mut features {
                *x = self.activation.apply(*x);
            }
        }

        let logits = self.policy_head.forward(&features);
        let value = self.value_head.forward(&features)[0];
        Ok((logits, value))
    }

    /// Greedy action for `obs`
    pub fn act(&self, obs: &[f32]) -> Result<usize> {
        let (logits, _) = self.forward(obs)?;
        let action = logits
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, &l)| if l > best.1 { (i, l) } else { best })
            .0;
        Ok(action)
    }
}
