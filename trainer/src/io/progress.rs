//! User-facing progress for training runs.
//!
//! Progress is product output, separate from `tracing` diagnostics. The sink
//! is injected so concurrent runs (and tests) never share a global stream.

use std::io::Write;

use tracing::warn;

/// Receives status lines and per-batch progress.
pub trait Progress {
    /// A one-line status message.
    fn message(&mut self, text: &str);
    /// A batch of `total` commands is starting.
    fn start(&mut self, total: usize);
    /// `done` commands of the current batch have finished.
    fn set(&mut self, done: usize);
    /// The current batch ended (normally or early).
    fn finish(&mut self);
}

const BAR_WIDTH: usize = 30;

/// Renders a single-line bar to a writer (normally stderr).
///
/// Lines end in `\r\n` because the terminal may be in raw mode while the
/// interrupt watcher is listening.
pub struct BarProgress<W: Write> {
    out: W,
    total: usize,
}

impl<W: Write> BarProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out, total: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(err) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            warn!(err = %err, "failed to write progress");
        }
    }
}

/// `[=====     ] 1/2` style bar.
pub fn render_bar(done: usize, total: usize) -> String {
    let filled = if total == 0 {
        BAR_WIDTH
    } else {
        done.min(total) * BAR_WIDTH / total
    };
    format!(
        "[{}{}] {done}/{total}",
        "=".repeat(filled),
        " ".repeat(BAR_WIDTH - filled)
    )
}

impl<W: Write> Progress for BarProgress<W> {
    fn message(&mut self, text: &str) {
        self.emit(&format!("{text}\r\n"));
    }

    fn start(&mut self, total: usize) {
        self.total = total;
        self.emit(&format!("\r{}", render_bar(0, total)));
    }

    fn set(&mut self, done: usize) {
        let bar = render_bar(done, self.total);
        self.emit(&format!("\r{bar}"));
    }

    fn finish(&mut self) {
        self.emit("\r\n");
    }
}
