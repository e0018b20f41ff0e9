//! Benchmark setup error type.
//!
//! Setup functions propagate failures with `?` so benchmark bodies never
//! call `.expect()`.

use crate::source::SyntheticError;
use gcnlink_core::GcnError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic graph generation failed.
    #[error("synthetic graph generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// Splitting, model construction or training failed.
    #[error("core operation failed: {0}")]
    Core(#[from] GcnError),
}
