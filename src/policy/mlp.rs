//! Multi-Layer Perceptron (MLP) actor-critic for discrete actions
//!
//! A feedforward policy built with tch-rs. It outputs both action logits and
//! a value estimate, which is what the PPO loop queries.
//!
//! # Architecture
//!
//! ```text
//! Input (observations)
//!         |
//!  [Dense(hidden)] x num_layers, each followed by the activation
//!      /     \
//!  Policy   Value
//!     |        |
//! [Dense(n)]  [Dense(1)]
//!     |        |
//!  Logits    Value
//! ```

use std::path::Path;

use anyhow::{anyhow, Result};
use tch::{
    nn::{self, Init, Module, OptimizerConfig},
    Device, Kind, Tensor,
};

use super::{
    inference::{Activation, DenseLayer, ExportMetadata, InferenceModel},
    ActorCritic, PolicyOutput,
};
use crate::train::ppo::PPOConfig;

/// Configuration for MLP policy architecture
#[derive(Debug, Clone)]
pub struct MlpConfig {
    /// Number of shared hidden layers
    pub num_layers: usize,
    /// Width of every hidden layer
    pub hidden_dim: i64,
    /// Orthogonal initialization instead of small gaussian weights
    pub use_orthogonal_init: bool,
    /// Hidden-layer activation
    pub activation: Activation,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            num_layers: 2,
            hidden_dim: 64,
            use_orthogonal_init: true,
            activation: Activation::Tanh,
        }
    }
}

fn activate(activation: Activation, x: &Tensor) -> Tensor {
    match activation {
        Activation::ReLU => x.relu(),
        Activation::Tanh => x.tanh(),
    }
}

/// Multi-layer perceptron policy for discrete actions
///
/// Implements an actor-critic architecture with:
/// - Shared feature extraction layers
/// - Orthogonal weight initialization (better for RL)
/// - Separate policy head (outputs action logits)
/// - Separate value head (outputs state value estimate)
pub struct MlpPolicy {
    vs: nn::VarStore,
    shared: nn::Sequential,
    policy_head: nn::Linear,
    value_head: nn::Linear,
    obs_dim: i64,
    action_dim: i64,
    config: MlpConfig,
}

impl std::fmt::Debug for MlpPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlpPolicy")
            .field("obs_dim", &self.obs_dim)
            .field("action_dim", &self.action_dim)
            .field("device", &self.vs.device())
            .field("config", &self.config)
            .finish()
    }
}

impl MlpPolicy {
    /// Create a new MLP policy with the default 2-layer architecture
    ///
    /// # Arguments
    ///
    /// * `obs_dim` - Observation space dimensionality
    /// * `action_dim` - Number of discrete actions
    /// * `hidden_dim` - Size of hidden layers
    /// * `device` - Where the parameters live
    pub fn new(obs_dim: i64, action_dim: i64, hidden_dim: i64, device: Device) -> Self {
        let config = MlpConfig { hidden_dim, ..Default::default() };
        Self::with_config(obs_dim, action_dim, config, device)
    }

    /// Create a new MLP policy with custom configuration
    pub fn with_config(obs_dim: i64, action_dim: i64, config: MlpConfig, device: Device) -> Self {
        tracing::debug!("MlpPolicy using device: {:?}", device);
        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let hidden_init = if config.use_orthogonal_init {
            Init::Orthogonal { gain: 2.0_f64.sqrt() }
        } else {
            Init::Randn { mean: 0.0, stdev: 0.01 }
        };
        let hidden_config = nn::LinearConfig { ws_init: hidden_init, ..Default::default() };

        let mut shared = nn::seq();
        let mut in_dim = obs_dim;
        for layer in 1..=config.num_layers {
            let activation = config.activation;
            shared = shared
                .add(nn::linear(
                    &root / "shared" / format!("fc{}", layer),
                    in_dim,
                    config.hidden_dim,
                    hidden_config,
                ))
                .add_fn(move |x| activate(activation, x));
            in_dim = config.hidden_dim;
        }

        // Smaller gain for output layers
        let output_init = if config.use_orthogonal_init {
            Init::Orthogonal { gain: 0.01 }
        } else {
            Init::Randn { mean: 0.0, stdev: 0.01 }
        };
        let output_config = nn::LinearConfig { ws_init: output_init, ..Default::default() };

        let policy_head = nn::linear(&root / "policy", in_dim, action_dim, output_config);
        let value_head = nn::linear(&root / "value", in_dim, 1, output_config);

        Self { vs, shared, policy_head, value_head, obs_dim, action_dim, config }
    }

    /// Forward pass: compute action logits [batch, action_dim] and values [batch]
    pub fn forward(&self, obs: &Tensor) -> (Tensor, Tensor) {
        let features = self.shared.forward(obs);
        let logits = self.policy_head.forward(&features);
        let values = self.value_head.forward(&features).squeeze_dim(-1);
        (logits, values)
    }

    /// Get the device this policy is on (CPU or CUDA)
    pub fn device(&self) -> Device {
        self.vs.device()
    }

    /// Get reference to variable store
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Create an Adam optimizer over this policy's parameters
    pub fn optimizer(&self, learning_rate: f64) -> Result<nn::Optimizer> {
        Ok(nn::Adam::default().build(&self.vs, learning_rate)?)
    }

    /// Create an Adam optimizer with the configured learning rate
    pub fn optimizer_for(&self, config: &PPOConfig) -> Result<nn::Optimizer> {
        self.optimizer(config.learning_rate)
    }

    /// Extract the weights into a pure Rust [`InferenceModel`]
    pub fn to_inference_model(&self) -> Result<InferenceModel> {
        let variables = self.vs.variables();
        let layer = |name: &str| -> Result<DenseLayer> {
            let weight = variables
                .get(&format!("{}.weight", name))
                .ok_or_else(|| anyhow!("missing {}.weight", name))?;
            let bias = variables
                .get(&format!("{}.bias", name))
                .ok_or_else(|| anyhow!("missing {}.bias", name))?;
            Ok(DenseLayer { weight: tensor_to_2d(weight)?, bias: tensor_to_1d(bias)? })
        };

        let shared = (1..=self.config.num_layers)
            .map(|i| layer(&format!("shared.fc{}", i)))
            .collect::<Result<Vec<_>>>()?;

        let model = InferenceModel {
            obs_dim: self.obs_dim as usize,
            action_dim: self.action_dim as usize,
            activation: self.config.activation,
            shared,
            policy_head: layer("policy")?,
            value_head: layer("value")?,
            metadata: None,
        };
        model.validate()?;
        Ok(model)
    }
}

fn tensor_to_1d(tensor: &Tensor) -> Result<Vec<f32>> {
    let cpu = tensor.to_device(Device::Cpu).to_kind(Kind::Float).contiguous();
    Ok(Vec::<f32>::try_from(cpu.view([-1]))?)
}

fn tensor_to_2d(tensor: &Tensor) -> Result<Vec<Vec<f32>>> {
    let size = tensor.size();
    if size.len() != 2 {
        return Err(anyhow!("expected a 2D tensor, got shape {:?}", size));
    }
    let cols = size[1] as usize;
    let flat = tensor_to_1d(tensor)?;
    Ok(flat.chunks(cols.max(1)).map(<[f32]>::to_vec).collect())
}

impl ActorCritic for MlpPolicy {
    fn get_action_and_value(&self, obs: &Tensor, actions: Option<&Tensor>) -> PolicyOutput {
        let (logits, values) = self.forward(obs);

        // log_softmax for numerical stability
        let log_probs_all = logits.log_softmax(-1, Kind::Float);
        let probs = log_probs_all.exp();

        let actions = match actions {
            Some(actions) => actions.shallow_clone(),
            None => probs.multinomial(1, true).squeeze_dim(-1),
        };

        let log_probs = log_probs_all.gather(-1, &actions.unsqueeze(-1), false).squeeze_dim(-1);

        // H = -Σ p(x) * log(p(x)), one value per observation
        let entropy = -(&probs * &log_probs_all).sum_dim_intlist(-1, false, Kind::Float);

        PolicyOutput { actions, log_probs, entropy, values }
    }

    fn snapshot(&self) -> Result<Self> {
        let mut copy =
            MlpPolicy::with_config(self.obs_dim, self.action_dim, self.config.clone(), self.device());
        copy.vs.copy(&self.vs)?;
        copy.vs.freeze();
        Ok(copy)
    }

    fn export(&self, path: &Path, metadata: &ExportMetadata) -> Result<()> {
        let mut model = self.to_inference_model()?;
        model.metadata = Some(metadata.clone());
        model.save_json(path)
    }
}
