//! Command implementations and argument parsing for the gcnlink CLI.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use gcnlink_core::{
    GcnError, GraphSource, Trainer, TrainingConfig, TrainingConfigBuilder, TrainingReport,
};
use gcnlink_providers_edgelist::{EdgeListError, EdgeListProvider};
use serde::Serialize;
use thiserror::Error;
use tracing::{Span, field, info, instrument};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "gcnlink", about = "Train a graph autoencoder for link prediction.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Train on an edge list and report validation and test scores.
    Train(TrainCommand),
}

/// Options accepted by the `train` command.
#[derive(Debug, Args, Clone)]
pub struct TrainCommand {
    /// Edge list with one `left right` pair per line.
    pub path: PathBuf,

    /// Override name for the graph (defaults to the file name).
    #[arg(long)]
    pub name: Option<String>,

    /// Adam learning rate.
    #[arg(long = "learning-rate", default_value_t = TrainingConfig::default().learning_rate())]
    pub learning_rate: f32,

    /// Number of training epochs.
    #[arg(long, default_value_t = TrainingConfig::default().epochs())]
    pub epochs: usize,

    /// Width of the first graph convolution.
    #[arg(long, default_value_t = TrainingConfig::default().hidden1().get())]
    pub hidden1: usize,

    /// Width of the node embeddings.
    #[arg(long, default_value_t = TrainingConfig::default().hidden2().get())]
    pub hidden2: usize,

    /// Dropout rate applied during training.
    #[arg(long, default_value_t = TrainingConfig::default().dropout())]
    pub dropout: f32,

    /// Seed for weight initialization, dropout and the edge split.
    #[arg(long, default_value_t = TrainingConfig::default().seed())]
    pub seed: u64,

    /// Share of edges held out for validation.
    #[arg(long = "val-fraction", default_value_t = TrainingConfig::default().split().val_fraction())]
    pub val_fraction: f64,

    /// Share of edges held out for testing.
    #[arg(long = "test-fraction", default_value_t = TrainingConfig::default().split().test_fraction())]
    pub test_fraction: f64,

    /// JSON file caching the edge split between runs.
    #[arg(long = "split-cache")]
    pub split_cache: Option<PathBuf>,

    /// Rebuild the edge split even when the cache exists.
    #[arg(long = "regenerate-training-data")]
    pub regenerate_training_data: bool,

    /// Report format written to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Format of the report written to stdout.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// One line per epoch followed by the test scores.
    #[default]
    Text,
    /// A single JSON document.
    Json,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The edge list could not be read.
    #[error("failed to load edge list `{path}`: {source}")]
    Input {
        /// Path of the edge list.
        path: PathBuf,
        /// Underlying provider failure.
        #[source]
        source: EdgeListError,
    },
    /// Configuration, splitting or training failed.
    #[error(transparent)]
    Core(#[from] GcnError),
}

/// Outcome of a `train` command.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    /// Name of the graph.
    pub data_source: String,
    /// Number of nodes in the graph.
    pub nodes: usize,
    /// Number of distinct undirected edges in the graph.
    pub edges: usize,
    /// Per-epoch and final scores.
    pub report: TrainingReport,
    /// How [`render_summary`] formats this summary.
    #[serde(skip)]
    pub output: OutputFormat,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading, configuration or training fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use clap::Parser;
/// # use gcnlink_cli::cli::{Cli, run_cli};
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// let edges: String = (0..40).map(|n| format!("{n} {}\n{n} {}\n", (n + 1) % 40, (n + 3) % 40)).collect();
/// std::fs::write(file.path(), edges)?;
/// let path = file.path().to_string_lossy().into_owned();
/// let cli = Cli::try_parse_from(["gcnlink", "train", path.as_str(), "--epochs", "2"])?;
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.report.epochs.len(), 2);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Train(train) => {
            Span::current().record("command", field::display("train"));
            run_train(train)
        }
    }
}

#[instrument(
    name = "cli.train",
    err,
    skip(command),
    fields(path = %command.path.display(), epochs = command.epochs, seed = command.seed, data_source = field::Empty),
)]
pub(super) fn run_train(command: TrainCommand) -> Result<ExecutionSummary, CliError> {
    let config = TrainingConfigBuilder::new()
        .with_learning_rate(command.learning_rate)
        .with_epochs(command.epochs)
        .with_hidden1(command.hidden1)
        .with_hidden2(command.hidden2)
        .with_dropout(command.dropout)
        .with_seed(command.seed)
        .with_val_fraction(command.val_fraction)
        .with_test_fraction(command.test_fraction)
        .with_regenerate_training_data(command.regenerate_training_data)
        .build()?;

    let provider = load_edge_list(&command.path, command.name.as_deref())?;
    Span::current().record("data_source", field::display(provider.name()));

    let report = Trainer::new(config).run(&provider, command.split_cache.as_deref())?;
    info!(
        data_source = provider.name(),
        test_roc = report.test.roc_auc,
        test_ap = report.test.average_precision,
        "command completed"
    );
    Ok(ExecutionSummary {
        data_source: provider.name().to_owned(),
        nodes: provider.node_count(),
        edges: provider.edge_count(),
        report,
        output: command.output,
    })
}

pub(super) fn load_edge_list(
    path: &Path,
    override_name: Option<&str>,
) -> Result<EdgeListProvider, CliError> {
    let provider = EdgeListProvider::open(path).map_err(|source| CliError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match override_name {
        Some(name) => provider.with_name(name),
        None => provider,
    })
}

/// Renders `summary` to `writer` in its requested [`OutputFormat`].
///
/// The text format prints one `Epoch:` line per epoch with five-decimal
/// scores, then `Optimization Finished!` and the test ROC and AP scores.
///
/// # Errors
/// Returns [`io::Error`] if writing or serialization fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use gcnlink_cli::cli::{ExecutionSummary, OutputFormat, render_summary};
/// # use gcnlink_core::{EpochReport, LinkScores, TrainingReport};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let scores = LinkScores { roc_auc: 0.75, average_precision: 0.5 };
/// let summary = ExecutionSummary {
///     data_source: "demo".into(),
///     nodes: 4,
///     edges: 5,
///     report: TrainingReport {
///         epochs: vec![EpochReport { epoch: 0, train_loss: 0.25, validation: scores, seconds: 0.5 }],
///         test: scores,
///     },
///     output: OutputFormat::Text,
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// let text = String::from_utf8(buffer)?;
/// assert!(text.starts_with("Epoch: 0001 train_loss= 0.25000 val_roc= 0.75000"));
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary.output {
        OutputFormat::Text => {
            for epoch in &summary.report.epochs {
                writeln!(
                    writer,
                    "Epoch: {:04} train_loss= {:.5} val_roc= {:.5} val_ap= {:.5} time= {:.5}",
                    epoch.epoch + 1,
                    epoch.train_loss,
                    epoch.validation.roc_auc,
                    epoch.validation.average_precision,
                    epoch.seconds,
                )?;
            }
            writeln!(writer, "Optimization Finished!")?;
            writeln!(writer, "Test ROC score: {:.5}", summary.report.test.roc_auc)?;
            writeln!(writer, "Test AP score: {:.5}", summary.report.test.average_precision)
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, summary)?;
            writeln!(writer)
        }
    }
}
