//! Range and consistency properties of the loss and the ranking metrics.

use ndarray::Array1;
use proptest::test_runner::{TestCaseError, TestCaseResult};

use crate::{ReconstructionLoss, average_precision_score, roc_auc_score};

/// ROC-AUC and AP stay in `[0, 1]`; flipping every label mirrors ROC-AUC.
pub(super) fn run_metric_range_property(labels: &[bool], scores: &[f64]) -> TestCaseResult {
    let auc = roc_auc_score(labels, scores)
        .map_err(|err| TestCaseError::fail(format!("roc failed: {err}")))?;
    let ap = average_precision_score(labels, scores)
        .map_err(|err| TestCaseError::fail(format!("ap failed: {err}")))?;
    if !(0.0..=1.0).contains(&auc) || !(0.0..=1.0).contains(&ap) {
        return Err(TestCaseError::fail(format!("metrics out of range: roc={auc} ap={ap}")));
    }
    let flipped: Vec<bool> = labels.iter().map(|label| !label).collect();
    let mirrored = roc_auc_score(&flipped, scores)
        .map_err(|err| TestCaseError::fail(format!("roc failed: {err}")))?;
    if (auc + mirrored - 1.0).abs() > 1e-9 {
        return Err(TestCaseError::fail(format!(
            "flipped labels should mirror roc: {auc} + {mirrored} != 1"
        )));
    }
    Ok(())
}

/// A perfect separation scores exactly one on both metrics.
pub(super) fn run_perfect_separation_property(labels: &[bool]) -> TestCaseResult {
    let scores: Vec<f64> = labels.iter().map(|&label| if label { 0.9 } else { 0.1 }).collect();
    let auc = roc_auc_score(labels, &scores)
        .map_err(|err| TestCaseError::fail(format!("roc failed: {err}")))?;
    let ap = average_precision_score(labels, &scores)
        .map_err(|err| TestCaseError::fail(format!("ap failed: {err}")))?;
    if auc != 1.0 || ap != 1.0 {
        return Err(TestCaseError::fail(format!("expected 1.0, got roc={auc} ap={ap}")));
    }
    Ok(())
}

/// The weighted reconstruction cost is finite and non-negative for any
/// finite logits.
pub(super) fn run_loss_range_property(logits: &[f32], label_bits: &[bool]) -> TestCaseResult {
    let node_count = 4;
    let loss = ReconstructionLoss::new(node_count, 5.0)
        .map_err(|err| TestCaseError::fail(format!("loss rejected: {err}")))?;
    let logits: Array1<f32> = logits.iter().copied().collect();
    let labels: Array1<f32> = label_bits.iter().map(|&bit| f32::from(u8::from(bit))).collect();
    let cost = loss
        .cost(&logits, &labels)
        .map_err(|err| TestCaseError::fail(format!("cost failed: {err}")))?;
    if !cost.is_finite() || cost < 0.0 {
        return Err(TestCaseError::fail(format!("cost {cost} is not a finite non-negative value")));
    }
    let gradient = loss
        .gradient(&logits, &labels)
        .map_err(|err| TestCaseError::fail(format!("gradient failed: {err}")))?;
    if gradient.iter().any(|value| !value.is_finite()) {
        return Err(TestCaseError::fail("gradient has non-finite entries"));
    }
    Ok(())
}
