//! Inner-product reconstruction of the adjacency matrix.

use ndarray::{Array1, Array2};
use rand::Rng;

use crate::{
    Result,
    error::GcnError,
    layers::{Activation, Phase, dropout_mask, validate_dropout},
};

/// Intermediate values of an [`InnerProductDecoder`] forward pass.
#[derive(Clone, Debug)]
pub struct DecoderTrace {
    mask: Array2<f32>,
    dropped: Array2<f32>,
}

impl DecoderTrace {
    /// Embeddings after dropout.
    #[must_use]
    pub const fn dropped(&self) -> &Array2<f32> {
        &self.dropped
    }
}

/// Parameter-free decoder `act(flatten(Z · Zᵀ))` over dropped-out embeddings.
///
/// # Examples
/// ```
/// use gcnlink_core::{Activation, InnerProductDecoder, Phase};
/// use ndarray::array;
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let decoder = InnerProductDecoder::new(0.0, Activation::Identity)?;
/// let embeddings = array![[0.0_f32, 1.0], [0.0, 1.0], [0.0, 0.0]];
/// let (logits, _) = decoder.forward(Phase::Inference, &embeddings, &mut SmallRng::seed_from_u64(0))?;
/// assert_eq!(logits.to_vec(), vec![1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InnerProductDecoder {
    dropout: f32,
    activation: Activation,
}

impl InnerProductDecoder {
    /// Creates a decoder.
    ///
    /// # Errors
    /// Returns [`GcnError::InvalidConfiguration`] for a dropout outside
    /// `[0, 1)`.
    pub fn new(dropout: f32, activation: Activation) -> Result<Self> {
        validate_dropout(dropout)?;
        Ok(Self {
            dropout,
            activation,
        })
    }

    /// Returns the output activation.
    #[must_use]
    pub const fn activation(&self) -> Activation {
        self.activation
    }

    /// Decodes `embeddings` into a row-major vector of `N²` pair scores.
    ///
    /// # Errors
    /// Propagates dropout validation failures.
    pub fn forward<R: Rng>(
        &self,
        phase: Phase,
        embeddings: &Array2<f32>,
        rng: &mut R,
    ) -> Result<(Array1<f32>, DecoderTrace)> {
        let mask = dropout_mask(embeddings.dim(), phase.effective_dropout(self.dropout), rng)?;
        let dropped = embeddings * &mask;
        let activation = self.activation;
        let scores = dropped
            .dot(&dropped.t())
            .iter()
            .map(|&x| activation.apply(x))
            .collect();
        Ok((scores, DecoderTrace { mask, dropped }))
    }

    /// Returns `d cost / d embeddings` given the gradient with respect to the
    /// decoder's pre-activation scores.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when `grad_scores` does not hold
    /// `N²` entries.
    pub fn backward(&self, trace: &DecoderTrace, grad_scores: &Array1<f32>) -> Result<Array2<f32>> {
        let nodes = trace.dropped.nrows();
        let grad = Array2::from_shape_vec((nodes, nodes), grad_scores.to_vec()).map_err(|_| {
            GcnError::ShapeMismatch {
                operation: "decoder backward",
                left: (grad_scores.len(), 1),
                right: (nodes * nodes, 1),
            }
        })?;
        let symmetric = &grad + &grad.t();
        Ok(symmetric.dot(&trace.dropped) * &trace.mask)
    }
}
