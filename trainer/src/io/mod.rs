//! I/O helpers for trainer commands.

pub mod cancel;
pub mod commands;
pub mod config;
pub mod executor;
pub mod interrupt;
pub mod log_store;
pub mod process;
pub mod progress;
pub mod rollback;
#[cfg(unix)]
pub mod signals;
pub mod workspace;
