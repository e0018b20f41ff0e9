//! Graph convolution over a sparse input matrix.

use std::sync::Arc;

use ndarray::Array2;
use rand::Rng;

use crate::{
    Result,
    error::GcnError,
    layers::{Activation, LayerParameters, Phase, ensure_compatible, validate_dropout},
    sparse::{SparseMatrix, sparse_dropout},
};

/// Intermediate values of a [`GraphConvolutionSparse`] forward pass.
#[derive(Clone, Debug)]
pub struct SparseConvTrace {
    dropped_input: SparseMatrix,
    pre_activation: Array2<f32>,
}

impl SparseConvTrace {
    /// Input after sparse dropout.
    #[must_use]
    pub const fn dropped_input(&self) -> &SparseMatrix {
        &self.dropped_input
    }

    /// `Â · (X · W)` before the activation.
    #[must_use]
    pub const fn pre_activation(&self) -> &Array2<f32> {
        &self.pre_activation
    }
}

/// First-layer convolution `act(Â · (sparse_dropout(X) · W))`.
///
/// The pre-activation output is checked for NaN and infinity on every
/// forward pass.
#[derive(Clone, Debug)]
pub struct GraphConvolutionSparse {
    name: Arc<str>,
    parameters: LayerParameters,
    adjacency: Arc<SparseMatrix>,
    adjacency_t: Arc<SparseMatrix>,
    activation: Activation,
    dropout: f32,
    features_nonzero: usize,
}

impl GraphConvolutionSparse {
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
        features_nonzero: usize,
    ) -> Result<Self> {
        validate_dropout(dropout)?;
        if !adjacency.is_square() {
            return Err(GcnError::ShapeMismatch {
                operation: "sparse convolution adjacency",
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
            features_nonzero,
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
    /// Returns [`GcnError::NonzeroMismatch`] when `input` does not store the
    /// configured nonzero count, [`GcnError::ShapeMismatch`] for incompatible
    /// operands and [`GcnError::NumericalInstability`] when the
    /// pre-activation output holds a non-finite value.
    pub fn forward<R: Rng>(
        &self,
        phase: Phase,
        input: &SparseMatrix,
        rng: &mut R,
    ) -> Result<(Array2<f32>, SparseConvTrace)> {
        ensure_compatible("sparse convolution input", input.shape(), self.parameters.shape())?;
        let keep = 1.0 - phase.effective_dropout(self.dropout);
        let dropped_input = sparse_dropout(input, keep, self.features_nonzero, rng)?;
        let transformed = dropped_input.matmul_dense(self.parameters.weights())?;
        let pre_activation = self.adjacency.matmul_dense(&transformed)?;

        let non_finite = pre_activation.iter().filter(|value| !value.is_finite()).count();
        if non_finite > 0 {
            return Err(GcnError::NumericalInstability {
                layer: Arc::clone(&self.name),
                non_finite,
            });
        }

        let activation = self.activation;
        let output = pre_activation.mapv(|x| activation.apply(x));
        Ok((
            output,
            SparseConvTrace {
                dropped_input,
                pre_activation,
            },
        ))
    }

    /// Returns `d cost / d W` given the gradient of the cost with respect to
    /// this layer's output.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when `grad_output` does not match
    /// the traced output shape.
    pub fn backward(&self, trace: &SparseConvTrace, grad_output: &Array2<f32>) -> Result<Array2<f32>> {
        if grad_output.dim() != trace.pre_activation.dim() {
            return Err(GcnError::ShapeMismatch {
                operation: "sparse convolution backward",
                left: grad_output.dim(),
                right: trace.pre_activation.dim(),
            });
        }
        let activation = self.activation;
        let mut grad_pre = grad_output.clone();
        grad_pre.zip_mut_with(&trace.pre_activation, |g, &z| *g *= activation.derivative(z));
        let grad_transformed = self.adjacency_t.matmul_dense(&grad_pre)?;
        trace.dropped_input.transpose().matmul_dense(&grad_transformed)
    }
}
