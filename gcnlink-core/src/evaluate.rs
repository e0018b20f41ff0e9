//! Link-prediction scoring of held-out edges.
//!
//! Scores are the logistic link applied to embedding dot products. Positive
//! edges are labelled 1 and sampled negatives 0; the true adjacency is not
//! consulted.

use std::cmp::Ordering;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{Result, error::GcnError, layers::sigmoid, split::Edge};

/// ROC-AUC and average precision for one positive/negative edge pair of sets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkScores {
    /// Area under the ROC curve.
    pub roc_auc: f64,
    /// Average precision (area under the precision-recall step curve).
    pub average_precision: f64,
}

/// Scores `positive` against `negative` edges using `embeddings`.
///
/// # Errors
/// Returns [`GcnError::EmptyEdgeSet`] when either set is empty and
/// [`GcnError::NodeOutOfBounds`] when an edge names a row missing from
/// `embeddings`.
///
/// # Examples
/// ```
/// use gcnlink_core::{Edge, score};
/// use ndarray::array;
///
/// let embeddings = array![[1.0_f32, 0.0], [1.0, 0.0], [-1.0, 0.0]];
/// let scores = score(&embeddings, &[Edge::new(0, 1)], &[Edge::new(0, 2)])?;
/// assert_eq!(scores.roc_auc, 1.0);
/// assert_eq!(scores.average_precision, 1.0);
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
pub fn score(embeddings: &Array2<f32>, positive: &[Edge], negative: &[Edge]) -> Result<LinkScores> {
    if positive.is_empty() {
        return Err(GcnError::EmptyEdgeSet { role: "positive" });
    }
    if negative.is_empty() {
        return Err(GcnError::EmptyEdgeSet { role: "negative" });
    }
    let predict = |edge: &Edge| -> Result<f64> {
        let node_count = embeddings.nrows();
        let node = edge.source().max(edge.target());
        if node >= node_count {
            return Err(GcnError::NodeOutOfBounds { node, node_count });
        }
        let dot = embeddings.row(edge.source()).dot(&embeddings.row(edge.target()));
        Ok(f64::from(sigmoid(dot)))
    };

    let mut predictions = Vec::with_capacity(positive.len() + negative.len());
    let mut labels = Vec::with_capacity(positive.len() + negative.len());
    for edge in positive {
        predictions.push(predict(edge)?);
        labels.push(true);
    }
    for edge in negative {
        predictions.push(predict(edge)?);
        labels.push(false);
    }
    Ok(LinkScores {
        roc_auc: roc_auc_score(&labels, &predictions)?,
        average_precision: average_precision_score(&labels, &predictions)?,
    })
}

fn check_inputs(labels: &[bool], scores: &[f64]) -> Result<(usize, usize)> {
    if labels.len() != scores.len() {
        return Err(GcnError::ShapeMismatch {
            operation: "binary scoring",
            left: (labels.len(), 1),
            right: (scores.len(), 1),
        });
    }
    let positives = labels.iter().filter(|&&label| label).count();
    let negatives = labels.len() - positives;
    if positives == 0 {
        return Err(GcnError::EmptyEdgeSet { role: "positive" });
    }
    if negatives == 0 {
        return Err(GcnError::EmptyEdgeSet { role: "negative" });
    }
    Ok((positives, negatives))
}

/// Area under the ROC curve, computed as the Mann-Whitney statistic with
/// average ranks for tied scores.
///
/// # Errors
/// Returns [`GcnError::ShapeMismatch`] for unequal lengths and
/// [`GcnError::EmptyEdgeSet`] when one class is absent.
pub fn roc_auc_score(labels: &[bool], scores: &[f64]) -> Result<f64> {
    let (positives, negatives) = check_inputs(labels, scores)?;
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; a tie group shares the mean of its ranks.
        let mean_rank = (start + end + 1) as f64 / 2.0;
        let tied_positives = order[start..end].iter().filter(|&&index| labels[index]).count();
        positive_rank_sum += mean_rank * tied_positives as f64;
        start = end;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Average precision `Σ (R_k − R_{k−1}) · P_k` over distinct score
/// thresholds, highest first.
///
/// # Errors
/// Returns [`GcnError::ShapeMismatch`] for unequal lengths and
/// [`GcnError::EmptyEdgeSet`] when one class is absent.
pub fn average_precision_score(labels: &[bool], scores: &[f64]) -> Result<f64> {
    let (positives, _) = check_inputs(labels, scores)?;
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let total = positives as f64;
    let mut true_positives = 0_usize;
    let mut seen = 0_usize;
    let mut previous_recall = 0.0;
    let mut precision_area = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        true_positives += order[start..end].iter().filter(|&&index| labels[index]).count();
        seen += end - start;
        let recall = true_positives as f64 / total;
        let precision = true_positives as f64 / seen as f64;
        precision_area += (recall - previous_recall) * precision;
        previous_recall = recall;
        start = end;
    }
    Ok(precision_area)
}
