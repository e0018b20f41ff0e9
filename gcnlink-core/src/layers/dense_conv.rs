//! Graph convolution over a dense input matrix.

use std::sync::Arc;

use ndarray::Array2;
use rand::Rng;

use crate::{
    Result,
    error::GcnError,
    layers::{Activation, LayerParameters, Phase, dropout_mask, ensure_compatible, validate_dropout},
    sparse::SparseMatrix,
};

/// Intermediate values of a [`GraphConvolution`] forward pass.
#[derive(Clone, Debug)]
pub struct DenseConvTrace {
    mask: Array2<f32>,
    dropped_input: Array2<f32>,
    pre_activation: Array2<f32>,
}

impl DenseConvTrace {
    /// Input after dropout.
    #[must_use]
    pub const fn dropped_input(&self) -> &Array2<f32> {
        &self.dropped_input
    }

    /// `Â · (X · W)` before the activation.
    #[must_use]
    pub const fn pre_activation(&self) -> &Array2<f32> {
        &self.pre_activation
    }
}

/// Hidden-layer convolution `act(Â · (dropout(X) · W))`.
#[derive(Clone, Debug)]
pub struct GraphConvolution {
    name: Arc<str>,
    parameters: LayerParameters,
    adjacency: Arc<SparseMatrix>,
    adjacency_t: Arc<SparseMatrix>,
    activation: Activation,
    dropout: f32,
}

impl GraphConvolution {
    /// Builds the layer around existing parameters.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when the adjacency is not square
    /// and [`GcnError::InvalidConfiguration`] for a dropout outside `[0, 1)`.
    pub fn new(
        name: impl Into<Arc<str>>,
        parameters: LayerParameters,
        adjacency: Arc<SparseMatrix>,
        activation: Activation,
        dropout: f32,
    ) -> Result<Self> {
        validate_dropout(dropout)?;
        if !adjacency.is_square() {
            return Err(GcnError::ShapeMismatch {
                operation: "dense convolution adjacency",
                left: adjacency.shape(),
                right: (adjacency.cols(), adjacency.rows()),
            });
        }
        let adjacency_t = Arc::new(adjacency.transpose());
        Ok(Self {
            name: name.into(),
            parameters,
            adjacency,
            adjacency_t,
            activation,
            dropout,
        })
    }

    /// Returns the layer name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the layer's weights.
    #[must_use]
    pub const fn parameters(&self) -> &LayerParameters {
        &self.parameters
    }

    pub(crate) fn parameters_mut(&mut self) -> &mut LayerParameters {
        &mut self.parameters
    }

    /// Runs the layer on `input`.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] for incompatible operands.
    pub fn forward<R: Rng>(
        &self,
        phase: Phase,
        input: &Array2<f32>,
        rng: &mut R,
    ) -> Result<(Array2<f32>, DenseConvTrace)> {
        ensure_compatible("dense convolution input", input.dim(), self.parameters.shape())?;
        let mask = dropout_mask(input.dim(), phase.effective_dropout(self.dropout), rng)?;
        let dropped_input = input * &mask;
        let transformed = dropped_input.dot(self.parameters.weights());
        let pre_activation = self.adjacency.matmul_dense(&transformed)?;
        let activation = self.activation;
        let output = pre_activation.mapv(|x| activation.apply(x));
        Ok((
            output,
            DenseConvTrace {
                mask,
                dropped_input,
                pre_activation,
            },
        ))
    }

    /// Back-propagates `grad_output` and returns `(d cost / d W, d cost / d input)`.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when `grad_output` does not match
    /// the traced output shape.
    pub fn backward(
        &self,
        trace: &DenseConvTrace,
        grad_output: &Array2<f32>,
    ) -> Result<(Array2<f32>, Array2<f32>)> {
        if grad_output.dim() != trace.pre_activation.dim() {
            return Err(GcnError::ShapeMismatch {
                operation: "dense convolution backward",
                left: grad_output.dim(),
                right: trace.pre_activation.dim(),
            });
        }
        let activation = self.activation;
        let mut grad_pre = grad_output.clone();
        grad_pre.zip_mut_with(&trace.pre_activation, |g, &z| *g *= activation.derivative(z));
        let grad_transformed = self.adjacency_t.matmul_dense(&grad_pre)?;
        let grad_weights = trace.dropped_input.t().dot(&grad_transformed);
        let grad_input = grad_transformed.dot(&self.parameters.weights().t()) * &trace.mask;
        Ok((grad_weights, grad_input))
    }
}
