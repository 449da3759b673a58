//! Stable exit codes for trainer CLI commands.

/// Command succeeded (including a training run stopped early by the user).
pub const OK: i32 = 0;
/// Command failed: bad config, unreadable workspace, or a broken command harness.
pub const FAILURE: i32 = 1;

/// Shell convention for a run stopped by `signal`, after its partial output
/// was printed and persisted.
pub fn signalled(signal: i32) -> i32 {
    128 + signal
}
