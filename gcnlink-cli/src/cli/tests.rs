//! Unit tests for the CLI commands and report rendering.

use super::commands::{load_edge_list, run_train};
use super::{Cli, CliError, Command, ExecutionSummary, OutputFormat, TrainCommand, render_summary, run_cli};

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use gcnlink_core::{
    EpochReport, GcnError, GcnErrorCode, LinkScores, TrainingConfig, TrainingReport,
};
use gcnlink_providers_edgelist::EdgeListError;
use gcnlink_test_support::tracing::capture;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use tracing::Level;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Workspace {
    dir: TempDir,
    edges: PathBuf,
}

#[fixture]
fn workspace() -> Workspace {
    let dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    };
    let contents: String = (0..40)
        .map(|node| format!("{node} {}\n{node}\t{}\n", (node + 1) % 40, (node + 4) % 40))
        .collect();
    let edges = match create_file(&dir, "ring.edges", &contents) {
        Ok(path) => path,
        Err(err) => panic!("failed to write edge list: {err}"),
    };
    Workspace { dir, edges }
}

fn create_file(dir: &TempDir, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.path().join(name);
    let mut file = File::create(&path)?;
    file.write_all(contents.as_bytes())?;
    Ok(path)
}

fn parse(args: &[&str]) -> TrainCommand {
    let cli = Cli::try_parse_from(std::iter::once("gcnlink").chain(args.iter().copied()))
        .expect("arguments must parse");
    match cli.command {
        Command::Train(train) => train,
    }
}

#[rstest]
fn defaults_follow_the_training_config() {
    let command = parse(&["train", "graph.edges"]);
    let defaults = TrainingConfig::default();
    assert_eq!(command.epochs, defaults.epochs());
    assert_eq!(command.hidden1, defaults.hidden1().get());
    assert_eq!(command.hidden2, defaults.hidden2().get());
    assert_eq!(command.seed, defaults.seed());
    assert!((command.learning_rate - defaults.learning_rate()).abs() < f32::EPSILON);
    assert!((command.dropout - defaults.dropout()).abs() < f32::EPSILON);
    assert!((command.val_fraction - 0.05).abs() < f64::EPSILON);
    assert!((command.test_fraction - 0.10).abs() < f64::EPSILON);
    assert!(!command.regenerate_training_data);
    assert!(command.split_cache.is_none());
    assert_eq!(command.output, OutputFormat::Text);
}

#[rstest]
fn every_hyperparameter_has_a_flag() {
    let command = parse(&[
        "train",
        "graph.edges",
        "--learning-rate",
        "0.05",
        "--epochs",
        "7",
        "--hidden1",
        "8",
        "--hidden2",
        "4",
        "--dropout",
        "0",
        "--seed",
        "9",
        "--val-fraction",
        "0.1",
        "--test-fraction",
        "0.2",
        "--split-cache",
        "split.json",
        "--regenerate-training-data",
        "--output",
        "json",
        "--name",
        "karate",
    ]);
    assert_eq!(command.epochs, 7);
    assert_eq!((command.hidden1, command.hidden2), (8, 4));
    assert_eq!(command.seed, 9);
    assert_eq!(command.split_cache, Some(PathBuf::from("split.json")));
    assert!(command.regenerate_training_data);
    assert_eq!(command.output, OutputFormat::Json);
    assert_eq!(command.name.as_deref(), Some("karate"));
}

#[rstest]
fn clap_rejects_unknown_output_formats() {
    let result = Cli::try_parse_from(["gcnlink", "train", "graph.edges", "--output", "xml"]);
    assert!(result.is_err());
}

#[rstest]
fn train_reports_every_epoch(workspace: Workspace) -> TestResult {
    let path = workspace.edges.to_string_lossy().into_owned();
    let cli = Cli::try_parse_from(["gcnlink", "train", path.as_str(), "--epochs", "3"])?;
    let summary = run_cli(cli)?;
    assert_eq!(summary.data_source, "ring");
    assert_eq!(summary.nodes, 40);
    assert_eq!(summary.edges, 80);
    assert_eq!(summary.report.epochs.len(), 3);

    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    let text = String::from_utf8(buffer)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("Epoch: 0001 train_loss= "));
    assert!(lines[2].starts_with("Epoch: 0003 "));
    assert_eq!(lines[3], "Optimization Finished!");
    assert!(lines[4].starts_with("Test ROC score: "));
    assert!(lines[5].starts_with("Test AP score: "));
    Ok(())
}

#[rstest]
fn split_cache_is_written(workspace: Workspace) -> TestResult {
    let cache = workspace.dir.path().join("split.json");
    let mut command = parse(&["train", "unused", "--epochs", "1"]);
    command.path.clone_from(&workspace.edges);
    command.split_cache = Some(cache.clone());
    run_train(command)?;
    assert!(cache.exists());
    Ok(())
}

#[rstest]
fn invalid_hyperparameters_fail_before_loading(workspace: Workspace) {
    let mut command = parse(&["train", "missing.edges", "--dropout", "1.0"]);
    command.path = workspace.dir.path().join("missing.edges");
    let err = run_train(command).expect_err("dropout of one is invalid");
    match err {
        CliError::Core(core) => assert_eq!(core.code(), GcnErrorCode::InvalidConfiguration),
        other => panic!("expected a core error, got {other:?}"),
    }
}

#[rstest]
fn missing_edge_lists_are_input_errors(workspace: Workspace) {
    let path = workspace.dir.path().join("missing.edges");
    let err = load_edge_list(&path, None).expect_err("file does not exist");
    match err {
        CliError::Input { path: reported, source } => {
            assert_eq!(reported, path);
            assert!(matches!(source, EdgeListError::Io(_)));
        }
        other => panic!("expected an input error, got {other:?}"),
    }
}

#[rstest]
fn name_override_is_applied(workspace: Workspace) -> TestResult {
    let provider = load_edge_list(&workspace.edges, Some("renamed"))?;
    assert_eq!(gcnlink_core::GraphSource::name(&provider), "renamed");
    Ok(())
}

#[rstest]
fn tiny_graphs_surface_core_errors(workspace: Workspace) -> TestResult {
    let path = create_file(&workspace.dir, "tiny.edges", "a b\nb c\n")?;
    let mut command = parse(&["train", "unused"]);
    command.path = path;
    let err = run_train(command).expect_err("two edges cannot be split");
    assert!(matches!(err, CliError::Core(GcnError::InsufficientEdges { .. })));
    Ok(())
}

fn summary(output: OutputFormat) -> ExecutionSummary {
    let validation = LinkScores {
        roc_auc: 0.5,
        average_precision: 0.625,
    };
    ExecutionSummary {
        data_source: "demo".into(),
        nodes: 4,
        edges: 5,
        report: TrainingReport {
            epochs: vec![
                EpochReport {
                    epoch: 0,
                    train_loss: 0.75,
                    validation,
                    seconds: 0.125,
                },
                EpochReport {
                    epoch: 1,
                    train_loss: 0.5,
                    validation,
                    seconds: 0.25,
                },
            ],
            test: LinkScores {
                roc_auc: 0.875,
                average_precision: 0.9,
            },
        },
        output,
    }
}

#[rstest]
fn text_report_matches_the_line_format() -> TestResult {
    let mut buffer = Vec::new();
    render_summary(&summary(OutputFormat::Text), &mut buffer)?;
    let expected = "\
Epoch: 0001 train_loss= 0.75000 val_roc= 0.50000 val_ap= 0.62500 time= 0.12500
Epoch: 0002 train_loss= 0.50000 val_roc= 0.50000 val_ap= 0.62500 time= 0.25000
Optimization Finished!
Test ROC score: 0.87500
Test AP score: 0.90000
";
    assert_eq!(String::from_utf8(buffer)?, expected);
    Ok(())
}

#[rstest]
fn json_report_round_trips_the_scores() -> TestResult {
    let mut buffer = Vec::new();
    render_summary(&summary(OutputFormat::Json), &mut buffer)?;
    let value: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(value["data_source"], "demo");
    assert_eq!(value["report"]["epochs"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["report"]["test"]["roc_auc"], 0.875);
    assert!(value.get("output").is_none());
    Ok(())
}

#[rstest]
fn train_emits_tracing_fields(workspace: Workspace) -> TestResult {
    let mut command = parse(&["train", "unused", "--epochs", "2", "--name", "traced"]);
    command.path.clone_from(&workspace.edges);
    let (summary, recording) = capture(|| run_train(command));
    summary?;

    let span = recording.span("cli.train").expect("cli.train span must exist");
    assert!(span.field("path").is_some_and(|value| value.ends_with("ring.edges")));
    assert_eq!(span.field("epochs"), Some("2"));
    assert_eq!(span.field("data_source"), Some("traced"));
    assert!(recording.span("core.train").is_some());

    let completed: Vec<_> = recording.events_with_message("command completed").collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].level, Level::INFO);
    assert_eq!(completed[0].field("data_source"), Some("traced"));
    Ok(())
}
