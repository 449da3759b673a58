//! Keypress-driven cancellation for interactive training runs.
//!
//! The watcher owns its key source on a background thread and talks to the
//! training loop only through the shared [`CancelScope`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::io::cancel::CancelScope;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A keystroke that interrupts training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptKey {
    Enter,
    /// `\n`, usually typed as Ctrl-J.
    LineFeed,
    Esc,
}

impl InterruptKey {
    pub fn label(self) -> &'static str {
        match self {
            Self::Enter => "<Enter>",
            Self::LineFeed => "<Ctrl-J>",
            Self::Esc => "<Esc>",
        }
    }

    pub fn matches(self, key: &KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        match self {
            Self::Enter => key.code == KeyCode::Enter,
            Self::LineFeed => {
                key.code == KeyCode::Char('\n')
                    || (key.code == KeyCode::Char('j')
                        && key.modifiers.contains(KeyModifiers::CONTROL))
            }
            Self::Esc => key.code == KeyCode::Esc,
        }
    }
}

/// Human-readable list for the "type ... to interrupt" hint.
pub fn describe_keys(keys: &[InterruptKey]) -> String {
    let labels: Vec<&str> = keys.iter().map(|k| k.label()).collect();
    match labels.split_last() {
        None => String::new(),
        Some((last, [])) => (*last).to_string(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
    }
}

/// Source of key events for the watcher.
pub trait KeySource: Send {
    /// Wait up to `timeout` for the next key event.
    fn next_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>>;
}

/// Reads keys from the controlling terminal.
///
/// Raw mode is enabled for the lifetime of the value so single keystrokes
/// arrive without waiting for a newline.
pub struct TerminalKeys {
    _private: (),
}

impl TerminalKeys {
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode().context("enable terminal raw mode")?;
        Ok(Self { _private: () })
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>> {
        if !event::poll(timeout).context("poll terminal events")? {
            return Ok(None);
        }
        match event::read().context("read terminal event")? {
            Event::Key(key) => Ok(Some(key)),
            _ => Ok(None),
        }
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            warn!(err = %err, "failed to restore terminal mode");
        }
    }
}

/// Background thread that cancels a scope when an interrupt key is pressed.
///
/// Dropping the watcher stops and joins the thread.
pub struct InterruptWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl InterruptWatcher {
    pub fn spawn(
        mut source: Box<dyn KeySource>,
        keys: Vec<InterruptKey>,
        scope: CancelScope,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) && !scope.is_done() {
                match source.next_key(POLL_INTERVAL) {
                    Ok(Some(key)) if keys.iter().any(|k| k.matches(&key)) => {
                        info!(key = ?key.code, "interrupt key pressed");
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        // Without a readable terminal the run just can't be interrupted.
                        warn!(err = %err, "interrupt watcher stopped");
                        return;
                    }
                }
            }
            scope.cancel();
            debug!("interrupt watcher exited");
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for InterruptWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("interrupt watcher thread panicked");
        }
    }
}
