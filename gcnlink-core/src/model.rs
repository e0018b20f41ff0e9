//! Two-layer GCN autoencoder.
//!
//! Building a model is a separate step from running it:
//! [`GcnModel::configure`] validates dimensions and draws the initial
//! weights, after which [`GcnModel::forward`] may be called any number of
//! times.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use rand::Rng;
use tracing::debug;

use crate::{
    Result,
    error::GcnError,
    layers::{
        Activation, DecoderTrace, DenseConvTrace, GraphConvolution, GraphConvolutionSparse,
        InnerProductDecoder, LayerParameters, Phase, SparseConvTrace, validate_dropout,
    },
    sparse::SparseMatrix,
};

/// Dropout rate of the decoder. Only the two convolutions drop inputs.
const DECODER_DROPOUT: f32 = 0.0;

/// Input width and hidden sizes of a [`GcnModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelDimensions {
    /// Width of the feature matrix.
    pub input_dim: usize,
    /// Output width of the first convolution.
    pub hidden1: usize,
    /// Embedding width.
    pub hidden2: usize,
}

impl ModelDimensions {
    /// Creates a dimension set.
    #[must_use]
    pub const fn new(input_dim: usize, hidden1: usize, hidden2: usize) -> Self {
        Self {
            input_dim,
            hidden1,
            hidden2,
        }
    }
}

/// Outputs of one forward pass together with the values needed to
/// back-propagate through it.
#[derive(Clone, Debug)]
pub struct ForwardPass {
    embeddings: Array2<f32>,
    logits: Array1<f32>,
    first: SparseConvTrace,
    second: DenseConvTrace,
    decoder: DecoderTrace,
}

impl ForwardPass {
    /// Node embeddings, `N × hidden2`.
    #[must_use]
    pub const fn embeddings(&self) -> &Array2<f32> {
        &self.embeddings
    }

    /// Flattened reconstruction logits, length `N²`.
    #[must_use]
    pub const fn logits(&self) -> &Array1<f32> {
        &self.logits
    }
}

/// Weight gradients for both convolution layers.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradients {
    /// `d cost / d W1`.
    pub first: Array2<f32>,
    /// `d cost / d W2`.
    pub second: Array2<f32>,
}

/// Sparse convolution (ReLU) → dense convolution (identity) → inner-product
/// decoder (identity, logits).
#[derive(Clone, Debug)]
pub struct GcnModel {
    dimensions: ModelDimensions,
    first: GraphConvolutionSparse,
    second: GraphConvolution,
    decoder: InnerProductDecoder,
}

impl GcnModel {
    /// Validates `dimensions` against `adjacency` and draws Glorot weights.
    ///
    /// `adjacency` is the normalized training adjacency and
    /// `features_nonzero` the stored-entry count of the feature matrix that
    /// will be passed to [`GcnModel::forward`].
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when the adjacency is not square,
    /// and [`GcnError::InvalidConfiguration`] for zero dimensions or a
    /// dropout outside `[0, 1)`.
    pub fn configure<R: Rng>(
        dimensions: ModelDimensions,
        adjacency: SparseMatrix,
        features_nonzero: usize,
        dropout: f32,
        rng: &mut R,
    ) -> Result<Self> {
        validate_dropout(dropout)?;
        if !adjacency.is_square() {
            return Err(GcnError::ShapeMismatch {
                operation: "model adjacency",
                left: adjacency.shape(),
                right: (adjacency.cols(), adjacency.rows()),
            });
        }
        let adjacency = Arc::new(adjacency);
        let first_weights = LayerParameters::glorot(dimensions.input_dim, dimensions.hidden1, rng)?;
        let second_weights = LayerParameters::glorot(dimensions.hidden1, dimensions.hidden2, rng)?;
        debug!(
            nodes = adjacency.rows(),
            input_dim = dimensions.input_dim,
            hidden1 = dimensions.hidden1,
            hidden2 = dimensions.hidden2,
            "model configured"
        );
        Ok(Self {
            dimensions,
            first: GraphConvolutionSparse::new(
                "gcn_sparse_layer",
                first_weights,
                Arc::clone(&adjacency),
                Activation::Relu,
                dropout,
                features_nonzero,
            )?,
            second: GraphConvolution::new(
                "gcn_dense_layer",
                second_weights,
                adjacency,
                Activation::Identity,
                dropout,
            )?,
            decoder: InnerProductDecoder::new(DECODER_DROPOUT, Activation::Identity)?,
        })
    }

    /// Returns the configured dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> ModelDimensions {
        self.dimensions
    }

    /// Returns the weights of both layers.
    #[must_use]
    pub fn parameters(&self) -> [&LayerParameters; 2] {
        [self.first.parameters(), self.second.parameters()]
    }

    pub(crate) fn parameters_mut(&mut self) -> [&mut LayerParameters; 2] {
        [self.first.parameters_mut(), self.second.parameters_mut()]
    }

    /// Runs encoder and decoder on `features`.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when `features` does not have
    /// `input_dim` columns or one row per node, plus any layer error.
    pub fn forward<R: Rng>(
        &self,
        phase: Phase,
        features: &SparseMatrix,
        rng: &mut R,
    ) -> Result<ForwardPass> {
        let (hidden, first) = self.first.forward(phase, features, rng)?;
        let (embeddings, second) = self.second.forward(phase, &hidden, rng)?;
        let (logits, decoder) = self.decoder.forward(phase, &embeddings, rng)?;
        Ok(ForwardPass {
            embeddings,
            logits,
            first,
            second,
            decoder,
        })
    }

    /// Back-propagates the gradient of the cost with respect to the logits.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when `grad_logits` does not match
    /// the pass it is applied to.
    pub fn backward(&self, pass: &ForwardPass, grad_logits: &Array1<f32>) -> Result<Gradients> {
        let grad_embeddings = self.decoder.backward(&pass.decoder, grad_logits)?;
        let (second, grad_hidden) = self.second.backward(&pass.second, &grad_embeddings)?;
        let first = self.first.backward(&pass.first, &grad_hidden)?;
        Ok(Gradients { first, second })
    }
}
