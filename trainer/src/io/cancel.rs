//! Cooperative cancellation shared between the training loop, the interrupt
//! watcher, and the signal listener.
//!
//! Nothing is preempted: the main flow polls the scope between files and
//! between commands, so a command that has started always runs to completion
//! or to its own timeout.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Why a scope stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// Someone called [`CancelScope::cancel`].
    Cancelled,
    /// The scope's deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "training cancelled"),
            Self::DeadlineExceeded => write!(f, "training deadline exceeded"),
        }
    }
}

impl std::error::Error for Interrupted {}

/// Cloneable stop token with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelScope {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// A scope sharing this one's stop flag that also expires at `deadline`.
    pub fn until(&self, deadline: Instant) -> Self {
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// `Some` once the scope was cancelled or its deadline passed.
    ///
    /// Explicit cancellation wins over an expired deadline.
    pub fn interrupted(&self) -> Option<Interrupted> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Some(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupted::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.interrupted().is_some()
    }
}
