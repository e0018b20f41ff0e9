//! Class-balanced reconstruction loss.

use ndarray::Array1;

use crate::{Result, error::GcnError, layers::sigmoid};

/// `norm · mean(weighted_cross_entropy(logits, labels, pos_weight))`.
///
/// With `N` nodes and `E` edges, `pos_weight = (N² − E) / E` up-weights the
/// rare positive entries and `norm = N² / (2 (N² − E))` rescales the mean.
///
/// # Examples
/// ```
/// use gcnlink_core::ReconstructionLoss;
///
/// let loss = ReconstructionLoss::new(4, 4.0)?;
/// assert_eq!(loss.pos_weight(), 3.0);
/// assert!((loss.norm() - 16.0 / 24.0).abs() < 1e-12);
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReconstructionLoss {
    node_count: usize,
    pos_weight: f64,
    norm: f64,
}

impl ReconstructionLoss {
    /// Derives the weighting from the node count and the total edge mass.
    ///
    /// # Errors
    /// Returns [`GcnError::InvalidConfiguration`] unless `0 < edges < N²`.
    pub fn new(node_count: usize, edges: f64) -> Result<Self> {
        let cells = (node_count as f64).powi(2);
        if !(edges > 0.0 && edges < cells) {
            return Err(GcnError::invalid_configuration(
                "edges",
                format!("must lie strictly between 0 and {cells} (got {edges})"),
            ));
        }
        let negatives = cells - edges;
        Ok(Self {
            node_count,
            pos_weight: negatives / edges,
            norm: cells / (2.0 * negatives),
        })
    }

    /// Returns the positive-class weight.
    #[must_use]
    pub const fn pos_weight(&self) -> f64 {
        self.pos_weight
    }

    /// Returns the normalization factor.
    #[must_use]
    pub const fn norm(&self) -> f64 {
        self.norm
    }

    fn check(&self, logits: &Array1<f32>, labels: &Array1<f32>) -> Result<()> {
        let expected = self.node_count * self.node_count;
        if logits.len() != expected || labels.len() != expected {
            return Err(GcnError::ShapeMismatch {
                operation: "reconstruction loss",
                left: (logits.len(), 1),
                right: (labels.len(), expected),
            });
        }
        Ok(())
    }

    /// Evaluates the cost.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] unless both vectors hold `N²`
    /// entries.
    pub fn cost(&self, logits: &Array1<f32>, labels: &Array1<f32>) -> Result<f32> {
        self.check(logits, labels)?;
        let total: f64 = logits
            .iter()
            .zip(labels.iter())
            .map(|(&x, &y)| weighted_cross_entropy(f64::from(x), f64::from(y), self.pos_weight))
            .sum();
        Ok((self.norm * total / logits.len() as f64) as f32)
    }

    /// Returns `d cost / d logits`.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] unless both vectors hold `N²`
    /// entries.
    pub fn gradient(&self, logits: &Array1<f32>, labels: &Array1<f32>) -> Result<Array1<f32>> {
        self.check(logits, labels)?;
        let scale = self.norm / logits.len() as f64;
        Ok(logits
            .iter()
            .zip(labels.iter())
            .map(|(&x, &y)| {
                let y = f64::from(y);
                let weight = 1.0 + (self.pos_weight - 1.0) * y;
                let slope = (1.0 - y) - weight * f64::from(sigmoid(-x));
                (scale * slope) as f32
            })
            .collect())
    }
}

/// `(1 − y)·x + (1 + (w − 1)·y)·softplus(−x)`, evaluated without overflow.
fn weighted_cross_entropy(x: f64, y: f64, pos_weight: f64) -> f64 {
    let softplus_neg = (-x.abs()).exp().ln_1p() + (-x).max(0.0);
    (1.0 - y) * x + (1.0 + (pos_weight - 1.0) * y) * softplus_neg
}
