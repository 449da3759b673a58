//! Training-data generator for test selection.
//!
//! `trainer train` runs the workspace's command list against the current tree
//! and against fuzzed variants of each source file, then prints the resulting
//! log groups as JSON.

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use trainer::exit_codes;
use trainer::io::cancel::CancelScope;
use trainer::io::commands::load_commands;
use trainer::io::config::load_config;
use trainer::io::executor::ShellRunner;
use trainer::io::interrupt::{KeySource, TerminalKeys};
use trainer::io::progress::BarProgress;
#[cfg(unix)]
use trainer::io::signals::SignalWatcher;
use trainer::io::workspace::Workspace;
use trainer::logging;
use trainer::train::{TrainIo, TrainRequest, train};

#[derive(Parser)]
#[command(
    name = "trainer",
    version,
    about = "Generate training data for deciding which tests to run"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all commands against the workspace and fuzzed variants of it, then print the logs.
    Train {
        /// Stop generating after this many seconds (overrides `train_timeout_secs`).
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(exit_codes::OK) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(exit_codes::FAILURE);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Train { timeout_secs } => cmd_train(timeout_secs),
    }
}

fn cmd_train(timeout_secs: Option<u64>) -> Result<i32> {
    let cwd = std::env::current_dir().context("resolve current directory")?;
    let ws = Workspace::find_or_init(&cwd).context("open workspace")?;

    let mut config = load_config(&ws.paths().config_path)?;
    if let Some(secs) = timeout_secs {
        config.train_timeout_secs = secs;
        config.validate()?;
    }
    let commands =
        load_commands(ws.root(), &ws.paths().commands_path).context("list commands")?;

    let keys: Option<Box<dyn KeySource>> = if std::io::stdout().is_terminal() {
        match TerminalKeys::new() {
            Ok(keys) => Some(Box::new(keys) as Box<dyn KeySource>),
            Err(err) => {
                warn!(err = %format!("{err:#}"), "interrupt keys unavailable");
                None
            }
        }
    } else {
        None
    };

    // Signals only stop the run, so fuzzed files are always restored.
    let cancel = CancelScope::new();
    #[cfg(unix)]
    let signals = SignalWatcher::install(cancel.clone())?;

    let runner = ShellRunner::new(config.command_timeout());
    let mut progress = BarProgress::new(std::io::stderr());
    let request = TrainRequest {
        workspace: &ws,
        commands: &commands,
        config: &config,
    };
    // Explicit training always regenerates.
    let groups = train(
        &request,
        &runner,
        Duration::ZERO,
        TrainIo {
            keys,
            progress: &mut progress,
            cancel,
        },
    )
    .context("train")?;

    let payload = serde_json::to_string_pretty(&groups).context("encode command logs")?;
    println!("{payload}");

    #[cfg(unix)]
    {
        if let Some(signal) = signals.received() {
            return Ok(exit_codes::signalled(signal));
        }
    }
    Ok(exit_codes::OK)
}
