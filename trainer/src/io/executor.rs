//! Single-command execution for training batches.
//!
//! The [`CommandRunner`] trait decouples batch orchestration from process
//! spawning. Tests use scripted runners that return predetermined logs.

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::types::{CommandLog, TrainCommand};
use crate::io::cancel::{CancelScope, Interrupted};
use crate::io::process::run_discarding_output;

/// Abstraction over running one command against the workspace.
pub trait CommandRunner {
    /// Run `cmd` in `root` and report its outcome.
    ///
    /// Returns an [`Interrupted`] error (possibly wrapped in context) when the
    /// scope was cancelled or its deadline passed. A command that merely fails
    /// is `Ok` with `success = false`.
    fn run(&self, root: &Path, cmd: &TrainCommand, scope: &CancelScope) -> Result<CommandLog>;
}

/// Runs commands through `sh -c` with their output discarded.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The per-command timeout, clipped to whatever is left of the scope deadline.
    fn effective_timeout(&self, scope: &CancelScope) -> Duration {
        match scope.deadline() {
            Some(deadline) => self
                .timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.timeout,
        }
    }
}

impl CommandRunner for ShellRunner {
    #[instrument(skip_all, fields(command = %cmd.command))]
    fn run(&self, root: &Path, cmd: &TrainCommand, scope: &CancelScope) -> Result<CommandLog> {
        if let Some(reason) = scope.interrupted() {
            return Err(reason.into());
        }

        let mut process = Command::new("sh");
        process.arg("-c").arg(&cmd.command).current_dir(root);
        let outcome = run_discarding_output(process, self.effective_timeout(scope))
            .with_context(|| format!("run {}", cmd.command))?;

        if outcome.timed_out && scope.interrupted() == Some(Interrupted::DeadlineExceeded) {
            debug!("training deadline cut the command short");
            return Err(Interrupted::DeadlineExceeded.into());
        }

        Ok(CommandLog {
            command: cmd.command.clone(),
            success: outcome.success(),
            duration: outcome.elapsed,
        })
    }
}
