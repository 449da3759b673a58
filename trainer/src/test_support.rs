//! Test-only helpers: scripted command runners, recorded progress, and
//! workspace fixtures with controlled modification times.

use std::cell::RefCell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{CommandLog, TrainCommand};
use crate::io::cancel::{CancelScope, Interrupted};
use crate::io::executor::CommandRunner;
use crate::io::progress::Progress;
use crate::io::workspace::{TRAINER_DIR, Workspace};

/// Scripted behavior for one command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Pass,
    Fail,
    /// Succeed, then cancel the scope (as if the user pressed a key mid-run).
    PassThenCancel,
    /// Report the command as cut short by cancellation.
    Interrupt,
    /// Fail the harness itself.
    Error,
}

/// Runner that replays a fixed script; once exhausted every command passes.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    steps: RefCell<Vec<Step>>,
    calls: RefCell<Vec<String>>,
    observe: Option<PathBuf>,
    observed: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: RefCell::new(steps.into_iter().rev().collect()),
            ..Self::default()
        }
    }

    /// Also record the contents of `path` at every invocation.
    pub fn observing(mut self, path: impl Into<PathBuf>) -> Self {
        self.observe = Some(path.into());
        self
    }

    /// Commands run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Contents of the observed file at each invocation.
    pub fn observed(&self) -> Vec<String> {
        self.observed.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, _root: &Path, cmd: &TrainCommand, scope: &CancelScope) -> Result<CommandLog> {
        self.calls.borrow_mut().push(cmd.command.clone());
        if let Some(path) = &self.observe {
            let contents = fs::read_to_string(path).unwrap_or_default();
            self.observed.borrow_mut().push(contents);
        }
        let step = self.steps.borrow_mut().pop().unwrap_or(Step::Pass);
        let log = |success| CommandLog {
            command: cmd.command.clone(),
            success,
            duration: Duration::from_millis(10),
        };
        match step {
            Step::Pass => Ok(log(true)),
            Step::Fail => Ok(log(false)),
            Step::PassThenCancel => {
                scope.cancel();
                Ok(log(true))
            }
            Step::Interrupt => Err(Interrupted::Cancelled.into()),
            Step::Error => Err(anyhow!("scripted failure")),
        }
    }
}

/// Progress sink that remembers what it was told.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub messages: Vec<String>,
    pub starts: Vec<usize>,
    pub sets: Vec<usize>,
    pub finished: usize,
}

impl Progress for RecordingProgress {
    fn message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn start(&mut self, total: usize) {
        self.starts.push(total);
    }

    fn set(&mut self, done: usize) {
        self.sets.push(done);
    }

    fn finish(&mut self) {
        self.finished += 1;
    }
}

/// Build a command list from bare command strings.
pub fn commands(names: &[&str]) -> Vec<TrainCommand> {
    names.iter().map(|name| TrainCommand::new(*name)).collect()
}

/// Temporary workspace with a `.trainer/` directory.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join(TRAINER_DIR))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::at(self.dir.path())
    }

    /// Write `name` and backdate its mtime by `age`.
    pub fn write_file(&self, name: &str, contents: &str, age: Duration) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        set_mtime(&path, SystemTime::now() - age)?;
        Ok(path)
    }

    pub fn read_file(&self, name: &str) -> Result<String> {
        Ok(fs::read_to_string(self.dir.path().join(name))?)
    }
}

/// Set a file's modification time.
pub fn set_mtime(path: &Path, mtime: SystemTime) -> Result<()> {
    File::options().write(true).open(path)?.set_modified(mtime)?;
    Ok(())
}
