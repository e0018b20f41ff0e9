//! Adam with bias-corrected step size.

use ndarray::Array2;

use crate::{Result, error::GcnError, layers::LayerParameters};

/// First and second moment estimates for one parameter matrix.
#[derive(Clone, Debug)]
struct Moments {
    first: Array2<f32>,
    second: Array2<f32>,
}

/// Adaptive moment estimation over a fixed list of parameter matrices.
///
/// Moment buffers are allocated on the first update and must keep the same
/// shapes afterwards.
#[derive(Clone, Debug)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    step: i32,
    moments: Vec<Moments>,
}

impl Adam {
    /// Creates an optimizer with `beta1 = 0.9`, `beta2 = 0.999` and
    /// `epsilon = 1e-8`.
    ///
    /// # Errors
    /// Returns [`GcnError::InvalidConfiguration`] unless `learning_rate` is
    /// finite and positive.
    pub fn new(learning_rate: f32) -> Result<Self> {
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(GcnError::invalid_configuration(
                "learning_rate",
                format!("must be finite and positive (got {learning_rate})"),
            ));
        }
        Ok(Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
            moments: Vec::new(),
        })
    }

    /// Returns the fixed learning rate.
    #[must_use]
    pub const fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Returns how many updates have been applied.
    #[must_use]
    pub const fn steps(&self) -> i32 {
        self.step
    }

    /// Applies one update to every parameter matrix.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when the gradients do not pair up
    /// with the parameters or with the moment buffers of earlier steps.
    pub fn update(
        &mut self,
        parameters: &mut [&mut LayerParameters],
        gradients: &[&Array2<f32>],
    ) -> Result<()> {
        if parameters.len() != gradients.len() {
            return Err(GcnError::ShapeMismatch {
                operation: "adam parameter list",
                left: (parameters.len(), 1),
                right: (gradients.len(), 1),
            });
        }
        for (param, &grad) in parameters.iter().zip(gradients) {
            if param.shape() != grad.dim() {
                return Err(GcnError::ShapeMismatch {
                    operation: "adam update",
                    left: param.shape(),
                    right: grad.dim(),
                });
            }
        }
        if self.moments.is_empty() {
            self.moments = gradients
                .iter()
                .map(|grad| Moments {
                    first: Array2::zeros(grad.dim()),
                    second: Array2::zeros(grad.dim()),
                })
                .collect();
        } else if self.moments.len() != gradients.len()
            || self
                .moments
                .iter()
                .zip(gradients)
                .any(|(moments, &grad)| moments.first.dim() != grad.dim())
        {
            return Err(GcnError::ShapeMismatch {
                operation: "adam moments",
                left: (self.moments.len(), 1),
                right: (gradients.len(), 1),
            });
        }

        self.step += 1;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let step_size = self.learning_rate * (1.0 - beta2.powi(self.step)).sqrt()
            / (1.0 - beta1.powi(self.step));

        for ((param, &grad), moments) in parameters.iter_mut().zip(gradients).zip(&mut self.moments) {
            moments
                .first
                .zip_mut_with(grad, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
            moments
                .second
                .zip_mut_with(grad, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);
            let weights = param.weights_mut();
            ndarray::Zip::from(weights)
                .and(&moments.first)
                .and(&moments.second)
                .for_each(|w, &m, &v| *w -= step_size * m / (v.sqrt() + epsilon));
        }
        Ok(())
    }
}
