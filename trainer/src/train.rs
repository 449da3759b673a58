//! Training-data generation.
//!
//! [`train`] is the cache gate: it reuses `.trainer/cmdlog.json` while fresh
//! and otherwise regenerates it with [`train_at`], which runs every command
//! once against the untouched workspace and then once per fuzzed file, most
//! recently modified first.
//!
//! Generation is expected to be cut short by the user or by a deadline.
//! Stopping early is a normal outcome: the groups collected so far are
//! returned as a success.

use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument};

use crate::batch::run_batch;
use crate::core::freshness::{is_fresh, recent_edit, sort_by_recency};
use crate::core::fuzz::{fuzz_file, should_fuzz};
use crate::core::types::{CommandLogGroup, FileInfo, LogContext, LogSource, TrainCommand};
use crate::io::cancel::CancelScope;
use crate::io::config::TrainConfig;
use crate::io::executor::CommandRunner;
use crate::io::interrupt::{InterruptWatcher, KeySource, describe_keys};
use crate::io::log_store::{read_log_groups, write_log_groups};
use crate::io::progress::Progress;
use crate::io::rollback::RollbackGuard;
use crate::io::workspace::{CMDLOG_FILE, TRAINER_DIR, Workspace};

/// What to train against.
#[derive(Debug, Clone, Copy)]
pub struct TrainRequest<'a> {
    pub workspace: &'a Workspace,
    pub commands: &'a [TrainCommand],
    pub config: &'a TrainConfig,
}

/// Interactive plumbing for one training invocation.
pub struct TrainIo<'a> {
    /// Key source for the interrupt watcher; `None` when not attached to a terminal.
    pub keys: Option<Box<dyn KeySource>>,
    pub progress: &'a mut dyn Progress,
    /// Stop token the caller may cancel, e.g. from a signal handler.
    pub cancel: CancelScope,
}

/// Get training data, reusing the persisted artifact if it is younger than `ttl`.
///
/// A zero `ttl` always regenerates. Regenerated data (including a partial set
/// from an interrupted run) replaces the artifact.
#[instrument(skip_all, fields(ttl_secs = ttl.as_secs()))]
pub fn train<R: CommandRunner + ?Sized>(
    request: &TrainRequest<'_>,
    runner: &R,
    ttl: Duration,
    io: TrainIo<'_>,
) -> Result<Vec<CommandLogGroup>> {
    let cmdlog_path = &request.workspace.paths().cmdlog_path;

    if !ttl.is_zero() {
        match request.workspace.stat(Path::new(TRAINER_DIR).join(CMDLOG_FILE)) {
            Ok(metadata) => {
                let mod_time = metadata
                    .modified()
                    .with_context(|| format!("read mtime of {}", cmdlog_path.display()))?;
                if is_fresh(mod_time, SystemTime::now(), ttl) {
                    info!("reusing fresh command logs");
                    return read_log_groups(cmdlog_path);
                }
                debug!("command logs are stale");
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no command logs yet");
            }
            Err(err) => {
                return Err(err).with_context(|| format!("stat {}", cmdlog_path.display()));
            }
        }
    }

    let groups = train_at(request, runner, io)?;
    write_log_groups(cmdlog_path, &groups)?;
    Ok(groups)
}

/// Generate training data: a baseline batch, then one batch per fuzzed file.
#[instrument(skip_all, fields(root = %request.workspace.root().display()))]
pub fn train_at<R: CommandRunner + ?Sized>(
    request: &TrainRequest<'_>,
    runner: &R,
    io: TrainIo<'_>,
) -> Result<Vec<CommandLogGroup>> {
    let TrainIo {
        keys,
        progress,
        cancel,
    } = io;
    let config = request.config;

    let scope = match config.train_timeout() {
        Some(timeout) => cancel.until(Instant::now() + timeout),
        None => cancel,
    };
    let _watcher = keys.map(|source| {
        progress.message(&format!(
            "Beginning training...type {} to interrupt",
            describe_keys(&config.interrupt_keys)
        ));
        InterruptWatcher::spawn(source, config.interrupt_keys.clone(), scope.clone())
    });

    let mut files = request.workspace.walk_root()?;
    sort_by_recency(&mut files);

    let mut result = Vec::new();

    let recent = recent_edit(&files, SystemTime::now(), config.recency_window());
    progress.message("Running all commands in the current workspace");
    let baseline = run_batch(
        runner,
        request.commands,
        request.workspace.root(),
        LogContext::now(LogSource::TrainInit, recent),
        &scope,
        progress,
    )?;
    push_non_empty(&mut result, baseline);

    // Fuzzing every file can take a very long time; the most recently edited
    // files go first so an interrupted run still covers the likeliest ones.
    for file in &files {
        if scope.is_done() {
            break;
        }
        if !should_fuzz(&file.name, &config.fuzz_suffixes) {
            continue;
        }
        if let Some(group) = fuzz_and_run(request, runner, file, &scope, progress)? {
            push_non_empty(&mut result, group);
        }
    }

    if let Some(reason) = scope.interrupted() {
        info!(%reason, groups = result.len(), "training stopped early");
    } else {
        info!(groups = result.len(), "training finished");
    }
    Ok(result)
}

fn push_non_empty(result: &mut Vec<CommandLogGroup>, group: CommandLogGroup) {
    if !group.is_empty() {
        result.push(group);
    }
}

/// Fuzz one file, run every command, and restore the file.
///
/// Returns `None` without running anything when fuzzing changes nothing. The
/// file is restored on every exit path, including errors and cancellation. A
/// failed restore is logged and does not replace the batch result.
#[instrument(skip_all, fields(file = %file.name))]
fn fuzz_and_run<R: CommandRunner + ?Sized>(
    request: &TrainRequest<'_>,
    runner: &R,
    file: &FileInfo,
    scope: &CancelScope,
    progress: &mut dyn Progress,
) -> Result<Option<CommandLogGroup>> {
    let path = &file.path;
    let original = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let Some(fuzzed) = fuzz_file(&file.name, &original, &request.config.fuzz_suffixes) else {
        debug!("fuzzing changed nothing, skipping");
        return Ok(None);
    };

    let guard = RollbackGuard::with_contents(path, original)?;
    guard.write(&fuzzed)?;

    progress.message(&format!("Fuzzing {:?} and running all commands", file.name));
    let group = run_batch(
        runner,
        request.commands,
        request.workspace.root(),
        LogContext::now(LogSource::Fuzz, Some(&file.name)),
        scope,
        progress,
    );
    if let Err(err) = guard.restore() {
        error!(err = %format!("{err:#}"), "failed to restore fuzzed file");
    }
    Ok(Some(group?))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::core::types::CommandLog;
    use crate::io::config::TRAIN_TTL;
    use crate::test_support::{
        RecordingProgress, ScriptedRunner, Step, TestWorkspace, commands, set_mtime,
    };

    const MINUTE: Duration = Duration::from_secs(60);
    const HOUR: Duration = Duration::from_secs(60 * 60);

    /// Passes every command, but swaps `target` for a directory during the
    /// second command so the file can't be written back.
    struct ClobberingRunner {
        target: PathBuf,
        calls: Cell<usize>,
    }

    impl CommandRunner for ClobberingRunner {
        fn run(&self, _root: &Path, cmd: &TrainCommand, _: &CancelScope) -> Result<CommandLog> {
            let call = self.calls.replace(self.calls.get() + 1);
            if call == 1 {
                fs::remove_file(&self.target)?;
                fs::create_dir(&self.target)?;
            }
            Ok(CommandLog {
                command: cmd.command.clone(),
                success: true,
                duration: Duration::from_millis(1),
            })
        }
    }

    fn go_config() -> TrainConfig {
        TrainConfig {
            fuzz_suffixes: vec![".go".to_string()],
            ..TrainConfig::default()
        }
    }

    fn run_train<R: CommandRunner + ?Sized>(
        ws: &Workspace,
        cmds: &[TrainCommand],
        runner: &R,
        ttl: Duration,
    ) -> Result<Vec<CommandLogGroup>> {
        let config = go_config();
        let request = TrainRequest {
            workspace: ws,
            commands: cmds,
            config: &config,
        };
        let mut progress = RecordingProgress::default();
        train(
            &request,
            runner,
            ttl,
            TrainIo {
                keys: None,
                progress: &mut progress,
                cancel: CancelScope::new(),
            },
        )
    }

    #[test]
    fn baseline_then_fuzzable_files_only() {
        let fixture = TestWorkspace::new().expect("workspace");
        fixture.write_file("a.go", "x := 0", 10 * MINUTE).expect("a.go");
        fixture.write_file("readme.md", "false 0", MINUTE).expect("readme");
        let runner = ScriptedRunner::new(Vec::new());

        let cmds = commands(&["go test"]);
        let groups =
            run_train(&fixture.workspace(), &cmds, &runner, Duration::ZERO).expect("train");

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].context.source, LogSource::TrainInit);
        assert!(groups[0].context.recent_edits.contains("readme.md"));
        assert_eq!(groups[1].context.source, LogSource::Fuzz);
        assert_eq!(groups[1].context.recent_edits.len(), 1);
        assert!(groups[1].context.recent_edits.contains("a.go"));
        assert_eq!(fixture.read_file("readme.md").expect("read"), "false 0");
        assert_eq!(fixture.read_file("a.go").expect("read"), "x := 0");
    }

    #[test]
    fn stale_newest_file_is_not_a_recent_edit() {
        let fixture = TestWorkspace::new().expect("workspace");
        fixture.write_file("a.go", "x := 1", 3 * HOUR).expect("a.go");
        let runner = ScriptedRunner::new(Vec::new());

        let cmds = commands(&["go test"]);
        let groups =
            run_train(&fixture.workspace(), &cmds, &runner, Duration::ZERO).expect("train");

        assert_eq!(groups.len(), 1);
        assert!(groups[0].context.recent_edits.is_empty());
    }

    #[test]
    fn fresh_artifact_is_reused() {
        let fixture = TestWorkspace::new().expect("workspace");
        fixture.write_file("a.go", "x := 0", MINUTE).expect("a.go");
        let ws = fixture.workspace();
        let cmds = commands(&["go test"]);

        let first = run_train(&ws, &cmds, &ScriptedRunner::new(Vec::new()), Duration::ZERO)
            .expect("first");
        let runner = ScriptedRunner::new(Vec::new());
        let second = run_train(&ws, &cmds, &runner, TRAIN_TTL).expect("second");

        assert_eq!(second, first);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn stale_artifact_is_regenerated() {
        let fixture = TestWorkspace::new().expect("workspace");
        let ws = fixture.workspace();
        let cmdlog = &ws.paths().cmdlog_path;
        write_log_groups(cmdlog, &[]).expect("seed");
        set_mtime(cmdlog, SystemTime::now() - 2 * HOUR).expect("backdate");

        let runner = ScriptedRunner::new(Vec::new());
        let groups = run_train(&ws, &commands(&["go test"]), &runner, HOUR).expect("train");

        assert_eq!(groups.len(), 1);
        assert_eq!(runner.calls(), vec!["go test".to_string()]);
        assert_eq!(read_log_groups(cmdlog).expect("read"), groups);
    }

    #[test]
    fn zero_ttl_ignores_fresh_artifact() {
        let fixture = TestWorkspace::new().expect("workspace");
        let ws = fixture.workspace();
        write_log_groups(&ws.paths().cmdlog_path, &[]).expect("seed");

        let runner = ScriptedRunner::new(Vec::new());
        run_train(&ws, &commands(&["go test"]), &runner, Duration::ZERO).expect("train");
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn corrupt_fresh_artifact_is_an_error() {
        let fixture = TestWorkspace::new().expect("workspace");
        let ws = fixture.workspace();
        fs::write(&ws.paths().cmdlog_path, "nope").expect("write");

        let runner = ScriptedRunner::new(Vec::new());
        assert!(run_train(&ws, &commands(&["go test"]), &runner, HOUR).is_err());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn file_without_matches_is_skipped() {
        let fixture = TestWorkspace::new().expect("workspace");
        fixture.write_file("a.go", "x := 42", MINUTE).expect("a.go");
        let runner = ScriptedRunner::new(Vec::new());

        let cmds = commands(&["go test"]);
        let groups =
            run_train(&fixture.workspace(), &cmds, &runner, Duration::ZERO).expect("train");

        assert_eq!(groups.len(), 1);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn empty_command_list_yields_no_groups() {
        let fixture = TestWorkspace::new().expect("workspace");
        fixture.write_file("a.go", "x := 0", MINUTE).expect("a.go");

        let groups = run_train(
            &fixture.workspace(),
            &[],
            &ScriptedRunner::new(Vec::new()),
            Duration::ZERO,
        )
        .expect("train");
        assert!(groups.is_empty());
    }

    #[test]
    fn harness_error_aborts_and_restores() {
        let fixture = TestWorkspace::new().expect("workspace");
        fixture.write_file("a.go", "ok := false", MINUTE).expect("a.go");
        let ws = fixture.workspace();
        // Baseline passes, the fuzz batch hits a harness error.
        let runner = ScriptedRunner::new(vec![Step::Pass, Step::Error]);

        let err = run_train(&ws, &commands(&["go test"]), &runner, Duration::ZERO)
            .expect_err("fatal");

        assert!(format!("{err:#}").contains("scripted failure"));
        assert_eq!(fixture.read_file("a.go").expect("read"), "ok := false");
        assert!(!ws.paths().cmdlog_path.exists());
    }

    #[test]
    fn failed_restore_keeps_collected_groups() {
        let fixture = TestWorkspace::new().expect("workspace");
        fixture.write_file("a.go", "x := 0", MINUTE).expect("a.go");
        let ws = fixture.workspace();
        let runner = ClobberingRunner {
            target: fixture.path().join("a.go"),
            calls: Cell::new(0),
        };

        let groups =
            run_train(&ws, &commands(&["go test"]), &runner, Duration::ZERO).expect("train");

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].context.source, LogSource::Fuzz);
        assert_eq!(groups[1].logs.len(), 1);
        assert_eq!(read_log_groups(&ws.paths().cmdlog_path).expect("artifact"), groups);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_file_name_is_fuzzed_and_restored() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fixture = TestWorkspace::new().expect("workspace");
        let bad = fixture.path().join(OsStr::from_bytes(b"bad\xff.go"));
        fs::write(&bad, "x := 0").expect("write");
        set_mtime(&bad, SystemTime::now() - MINUTE).expect("mtime");
        fixture.write_file("ok.go", "y := 0", 10 * MINUTE).expect("ok.go");
        let runner = ScriptedRunner::new(Vec::new());

        let cmds = commands(&["go test"]);
        let groups =
            run_train(&fixture.workspace(), &cmds, &runner, Duration::ZERO).expect("train");

        assert_eq!(groups.len(), 3);
        assert!(groups[1].context.recent_edits.contains("bad\u{FFFD}.go"));
        assert!(groups[2].context.recent_edits.contains("ok.go"));
        assert_eq!(fs::read(&bad).expect("read"), b"x := 0");
    }
}
