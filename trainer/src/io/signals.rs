//! Termination signals as cooperative cancellation.
//!
//! SIGINT, SIGTERM and SIGHUP would normally kill the process with a fuzzed
//! file still on disk. While a [`SignalWatcher`] is alive they only cancel
//! the training scope, so the running batch ends after its current command
//! and the file is restored before the process exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;

use anyhow::{Context, Result};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::{debug, info, warn};

use crate::io::cancel::CancelScope;

const TERMINATION_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGHUP];

/// Listener thread that turns termination signals into `scope.cancel()`.
///
/// Dropping the watcher closes the listener and joins it.
pub struct SignalWatcher {
    handle: Handle,
    listener: Option<thread::JoinHandle<()>>,
    first: Arc<AtomicI32>,
}

impl SignalWatcher {
    pub fn install(scope: CancelScope) -> Result<Self> {
        let mut signals =
            Signals::new(TERMINATION_SIGNALS).context("register signal handlers")?;
        let handle = signals.handle();
        let first = Arc::new(AtomicI32::new(0));
        let seen = Arc::clone(&first);

        let listener = thread::Builder::new()
            .name("trainer-signals".to_owned())
            .spawn(move || {
                for signal in signals.forever() {
                    if seen
                        .compare_exchange(0, signal, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                    {
                        info!(signal, "received signal, stopping after the running command");
                    } else {
                        warn!(signal, "already stopping, waiting for fuzzed files to be restored");
                    }
                    scope.cancel();
                }
                debug!("signal listener exited");
            })
            .context("spawn signal listener")?;

        Ok(Self {
            handle,
            listener: Some(listener),
            first,
        })
    }

    /// The first signal received, if any.
    pub fn received(&self) -> Option<i32> {
        match self.first.load(Ordering::SeqCst) {
            0 => None,
            signal => Some(signal),
        }
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(listener) = self.listener.take()
            && listener.join().is_err()
        {
            warn!("signal listener thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn signal_cancels_scope() {
        let scope = CancelScope::new();
        let watcher = SignalWatcher::install(scope.clone()).expect("install");
        assert_eq!(watcher.received(), None);

        signal_hook::low_level::raise(SIGHUP).expect("raise");

        let start = Instant::now();
        while !scope.is_done() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(scope.is_done());
        assert_eq!(watcher.received(), Some(SIGHUP));
    }
}
