//! Graph convolution layers, the inner-product decoder and their shared
//! building blocks.
//!
//! Every layer exposes a `forward` that returns its output together with a
//! trace of the intermediate values needed by `backward`. Layers never
//! mutate their own parameters; updates happen through
//! [`LayerParameters::weights_mut`], which only the optimizer calls.

mod decoder;
mod dense_conv;
mod sparse_conv;

use ndarray::Array2;
use rand::{Rng, distributions::Uniform};

use crate::{Result, error::GcnError};

pub use self::{
    decoder::{DecoderTrace, InnerProductDecoder},
    dense_conv::{DenseConvTrace, GraphConvolution},
    sparse_conv::{GraphConvolutionSparse, SparseConvTrace},
};

/// Element-wise nonlinearity applied to a layer's pre-activation output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Activation {
    /// `max(x, 0)`.
    #[default]
    Relu,
    /// `x`.
    Identity,
    /// `1 / (1 + e^-x)`.
    Sigmoid,
}

impl Activation {
    /// Applies the activation to one value.
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Relu => x.max(0.0),
            Self::Identity => x,
            Self::Sigmoid => sigmoid(x),
        }
    }

    /// Returns `d act / dx` evaluated at the pre-activation value `x`.
    #[must_use]
    pub fn derivative(self, x: f32) -> f32 {
        match self {
            Self::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Identity => 1.0,
            Self::Sigmoid => {
                let s = sigmoid(x);
                s * (1.0 - s)
            }
        }
    }
}

/// Numerically stable logistic function.
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Whether dropout is active for a forward pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Dropout applies at the configured rate.
    Training,
    /// Dropout is disabled.
    Inference,
}

impl Phase {
    /// Returns the dropout rate in effect for this phase.
    #[must_use]
    pub const fn effective_dropout(self, rate: f32) -> f32 {
        match self {
            Self::Training => rate,
            Self::Inference => 0.0,
        }
    }
}

/// Trainable weight matrix of a convolution layer, shaped
/// `(input_dim, output_dim)`.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerParameters {
    weights: Array2<f32>,
}

impl LayerParameters {
    /// Draws Glorot-uniform weights in `±sqrt(6 / (input_dim + output_dim))`.
    ///
    /// # Errors
    /// Returns [`GcnError::InvalidConfiguration`] when either dimension is
    /// zero.
    ///
    /// # Examples
    /// ```
    /// use gcnlink_core::LayerParameters;
    /// use rand::{SeedableRng, rngs::SmallRng};
    ///
    /// let params = LayerParameters::glorot(4, 2, &mut SmallRng::seed_from_u64(1))?;
    /// let bound = (6.0_f32 / 6.0).sqrt();
    /// assert_eq!(params.shape(), (4, 2));
    /// assert!(params.weights().iter().all(|w| w.abs() <= bound));
    /// # Ok::<(), gcnlink_core::GcnError>(())
    /// ```
    pub fn glorot<R: Rng>(input_dim: usize, output_dim: usize, rng: &mut R) -> Result<Self> {
        if input_dim == 0 || output_dim == 0 {
            return Err(GcnError::invalid_configuration(
                "layer dimensions",
                format!("must be non-zero (got {input_dim}x{output_dim})"),
            ));
        }
        let bound = (6.0 / (input_dim + output_dim) as f32).sqrt();
        let distribution = Uniform::new_inclusive(-bound, bound);
        let weights = Array2::from_shape_fn((input_dim, output_dim), |_| rng.sample(distribution));
        Ok(Self { weights })
    }

    /// Wraps an explicit weight matrix.
    #[must_use]
    pub fn from_weights(weights: Array2<f32>) -> Self {
        Self { weights }
    }

    /// Returns the weight matrix.
    #[must_use]
    pub const fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    /// Returns the weight matrix for in-place updates.
    pub fn weights_mut(&mut self) -> &mut Array2<f32> {
        &mut self.weights
    }

    /// Returns `(input_dim, output_dim)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.weights.dim()
    }
}

/// Returns an inverted-dropout mask of the given shape: each entry is
/// `1 / (1 - rate)` with probability `1 - rate` and `0` otherwise.
///
/// A zero rate yields a mask of ones without drawing from `rng`.
///
/// # Errors
/// Returns [`GcnError::InvalidConfiguration`] unless `0 <= rate < 1`.
pub fn dropout_mask<R: Rng>(shape: (usize, usize), rate: f32, rng: &mut R) -> Result<Array2<f32>> {
    validate_dropout(rate)?;
    if rate == 0.0 {
        return Ok(Array2::ones(shape));
    }
    let keep = 1.0 - rate;
    let scale = keep.recip();
    Ok(Array2::from_shape_fn(shape, |_| {
        if rng.r#gen::<f32>() < keep { scale } else { 0.0 }
    }))
}

/// Applies inverted dropout to a dense matrix.
///
/// # Errors
/// Returns [`GcnError::InvalidConfiguration`] unless `0 <= rate < 1`.
///
/// # Examples
/// ```
/// use gcnlink_core::dropout;
/// use ndarray::array;
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let input = array![[1.0_f32, 2.0], [3.0, 4.0]];
/// let same = dropout(&input, 0.0, &mut SmallRng::seed_from_u64(0))?;
/// assert_eq!(same, input);
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
pub fn dropout<R: Rng>(input: &Array2<f32>, rate: f32, rng: &mut R) -> Result<Array2<f32>> {
    Ok(input * &dropout_mask(input.dim(), rate, rng)?)
}

pub(crate) fn validate_dropout(rate: f32) -> Result<()> {
    if (0.0..1.0).contains(&rate) {
        Ok(())
    } else {
        Err(GcnError::invalid_configuration(
            "dropout",
            format!("must lie in [0, 1) (got {rate})"),
        ))
    }
}

pub(crate) fn ensure_compatible(
    operation: &'static str,
    left: (usize, usize),
    right: (usize, usize),
) -> Result<()> {
    if left.1 == right.0 {
        Ok(())
    } else {
        Err(GcnError::ShapeMismatch {
            operation,
            left,
            right,
        })
    }
}
