//! Helpers for running child processes with a timeout and no captured output.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How a child process ended.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub status: ExitStatus,
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl ProcessOutcome {
    /// Exited zero without being killed.
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }
}

/// Run a command with a timeout, discarding stdin/stdout/stderr.
///
/// On unix the command leads its own process group, and the whole group is
/// killed once the command ends or times out, so nothing it started outlives
/// it. A command still running at `timeout` is reaped and the outcome is
/// returned with `timed_out` set rather than as an error.
#[instrument(skip_all, fields(timeout_ms = timeout.as_millis() as u64))]
pub fn run_discarding_output(mut cmd: Command, timeout: Duration) -> Result<ProcessOutcome> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    debug!("spawning child process");
    let started = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_ms = timeout.as_millis() as u64, "command timed out, killing");
            timed_out = true;
            kill_group(&mut child).context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };
    let elapsed = started.elapsed();
    if !timed_out {
        // Background jobs the command left behind.
        kill_group(&mut child).context("kill leftover processes")?;
    }

    debug!(
        exit_code = ?status.code(),
        timed_out,
        elapsed_ms = elapsed.as_millis() as u64,
        "command finished"
    );
    Ok(ProcessOutcome {
        status,
        elapsed,
        timed_out,
    })
}

/// SIGKILL the child's process group. An already empty group is not an error.
#[cfg(unix)]
fn kill_group(child: &mut Child) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(child.id()).map_err(std::io::Error::other)?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(errno.into()),
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}
