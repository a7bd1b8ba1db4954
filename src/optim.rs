//! Optimizer contract
//!
//! The trainer only resets gradients and applies one step; learning-rate
//! schedules and parameter registration stay with whoever built the
//! optimizer.

use tch::nn;

/// Gradient-descent optimizer driven by the trainer
pub trait Optimizer {
    /// Clear accumulated gradients
    fn zero_grad(&mut self);

    /// Apply one update from the current gradients
    fn step(&mut self);
}

impl Optimizer for nn::Optimizer {
    fn zero_grad(&mut self) {
        nn::Optimizer::zero_grad(self)
    }

    fn step(&mut self) {
        nn::Optimizer::step(self)
    }
}

impl<O: Optimizer + ?Sized> Optimizer for &mut O {
    fn zero_grad(&mut self) {
        (**self).zero_grad()
    }

    fn step(&mut self) {
        (**self).step()
    }
}
