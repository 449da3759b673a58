//! Run the whole command list against one fixed workspace state.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::core::types::{CommandLogGroup, LogContext, TrainCommand};
use crate::io::cancel::{CancelScope, Interrupted};
use crate::io::executor::CommandRunner;
use crate::io::progress::Progress;

/// Run `cmds` in order and collect one log per finished command.
///
/// Cancellation (checked before each command, or reported by the runner) ends
/// the batch early and returns the logs collected so far as a success. Any
/// other runner error is returned and aborts training.
pub fn run_batch<R: CommandRunner + ?Sized>(
    runner: &R,
    cmds: &[TrainCommand],
    root: &Path,
    context: LogContext,
    scope: &CancelScope,
    progress: &mut dyn Progress,
) -> Result<CommandLogGroup> {
    progress.start(cmds.len());
    let result = run_batch_inner(runner, cmds, root, context, scope, progress);
    progress.finish();
    result
}

fn run_batch_inner<R: CommandRunner + ?Sized>(
    runner: &R,
    cmds: &[TrainCommand],
    root: &Path,
    context: LogContext,
    scope: &CancelScope,
    progress: &mut dyn Progress,
) -> Result<CommandLogGroup> {
    let mut group = CommandLogGroup::new(context);

    for (i, cmd) in cmds.iter().enumerate() {
        if let Some(reason) = scope.interrupted() {
            info!(%reason, completed = group.logs.len(), "batch stopped early");
            break;
        }
        match runner.run(root, cmd, scope) {
            Ok(log) => {
                debug!(command = %log.command, success = log.success, "command logged");
                group.add(log);
            }
            Err(err) => match err.downcast_ref::<Interrupted>() {
                Some(reason) => {
                    info!(%reason, completed = group.logs.len(), "batch stopped early");
                    break;
                }
                None => return Err(err),
            },
        }
        progress.set(i + 1);
    }

    Ok(group)
}
