//! Development-time tracing for debugging the trainer.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to stderr.
//!   Not persisted, not part of trainer product output.
//!
//! - **Progress (`io/progress`)**: User-facing status while training runs.
//!   Always shown, unaffected by `RUST_LOG`.
//!
//! - **Command logs (`io/log_store`)**: Product artifacts in
//!   `.trainer/cmdlog.json`.

use std::io::{self, IsTerminal, Write};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=trainer=debug cargo run -- train
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(stderr_writer).compact())
        .init();
}

/// The interrupt watcher puts the terminal in raw mode, where a bare `\n`
/// doesn't return the cursor. On a terminal every line ends in `\r\n`.
fn stderr_writer() -> Box<dyn Write> {
    let stderr = io::stderr();
    if stderr.is_terminal() {
        Box::new(CrlfWriter(stderr))
    } else {
        Box::new(stderr)
    }
}

/// Rewrites `\n` as `\r\n`.
struct CrlfWriter<W>(W);

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.split_inclusive(|&b| b == b'\n') {
            match chunk.strip_suffix(b"\n") {
                Some(line) => {
                    self.0.write_all(line)?;
                    self.0.write_all(b"\r\n")?;
                }
                None => self.0.write_all(chunk)?,
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_writer_terminates_every_line() {
        let mut out = CrlfWriter(Vec::new());
        write!(out, "WARN first\nWARN second\npartial").expect("write");
        assert_eq!(out.0, b"WARN first\r\nWARN second\r\npartial");
    }
}
