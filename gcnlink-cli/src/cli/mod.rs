//! Command-line interface for training link-prediction models.
//!
//! The `train` command reads an edge list, trains the graph autoencoder and
//! reports per-epoch validation scores followed by the test scores.

mod commands;

pub use commands::{
    Cli, CliError, Command, ExecutionSummary, OutputFormat, TrainCommand, render_summary, run_cli,
};

#[cfg(test)]
mod tests;
