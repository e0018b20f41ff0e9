//! Reconstruction loss and the parameter update that minimizes it.

mod adam;
mod loss;

use ndarray::Array1;

use crate::{
    Result,
    model::{ForwardPass, GcnModel},
};

pub use self::{adam::Adam, loss::ReconstructionLoss};

/// Couples a [`ReconstructionLoss`] with an [`Adam`] optimizer.
///
/// Each call to [`Optimizer::step`] applies exactly one update to the
/// model's weights.
#[derive(Clone, Debug)]
pub struct Optimizer {
    loss: ReconstructionLoss,
    adam: Adam,
}

impl Optimizer {
    /// Creates an optimizer for `loss` with a fixed learning rate.
    ///
    /// # Errors
    /// Returns [`crate::GcnError::InvalidConfiguration`] for a non-positive
    /// or non-finite learning rate.
    pub fn new(loss: ReconstructionLoss, learning_rate: f32) -> Result<Self> {
        Ok(Self {
            loss,
            adam: Adam::new(learning_rate)?,
        })
    }

    /// Returns the loss being minimized.
    #[must_use]
    pub const fn loss(&self) -> &ReconstructionLoss {
        &self.loss
    }

    /// Returns the number of updates applied so far.
    #[must_use]
    pub const fn steps(&self) -> i32 {
        self.adam.steps()
    }

    /// Computes the cost of `pass`, back-propagates it and updates `model`.
    ///
    /// Returns the cost evaluated before the update.
    ///
    /// # Errors
    /// Returns [`crate::GcnError::ShapeMismatch`] when `labels` or `pass`
    /// do not match the model.
    pub fn step(&mut self, model: &mut GcnModel, pass: &ForwardPass, labels: &Array1<f32>) -> Result<f32> {
        let cost = self.loss.cost(pass.logits(), labels)?;
        let grad_logits = self.loss.gradient(pass.logits(), labels)?;
        let gradients = model.backward(pass, &grad_logits)?;
        let [first, second] = model.parameters_mut();
        self.adam
            .update(&mut [first, second], &[&gradients.first, &gradients.second])?;
        Ok(cost)
    }
}
