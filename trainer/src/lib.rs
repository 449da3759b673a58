//! Training-data generation for test selection.
//!
//! This crate runs a fixed list of build/test commands against a workspace in
//! several deliberately perturbed states and records, for each command,
//! whether it succeeded and how long it took. The output is an ordered list of
//! log groups, each labeled with the context that produced it. The
//! architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (log types, fuzzing, recency).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, processes, terminal).
//!   Isolated behind traits so tests can script them.
//!
//! Orchestration modules ([`train`], [`batch`]) coordinate core logic with
//! I/O to implement the `train` CLI command.

pub mod batch;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod train;
