//! Rollout storage, advantage bootstrapping and batching
//!
//! One collection cycle flows through this module as:
//!
//! ```text
//! Rollout (filled by the collector)
//!     -> bootstrap_advantages  (advantages + returns)
//!     -> Batch::from_rollout   (flattened [0, end_step) x envs)
//! ```

pub mod batch;
pub mod gae;
pub mod rollout;

pub use batch::{Batch, BatchTensors};
pub use gae::{bootstrap_advantages, AdvantageDecay};
pub use rollout::Rollout;
