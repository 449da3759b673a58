//! Scoped file mutation with guaranteed restoration.
//!
//! A [`RollbackGuard`] snapshots a file before it is touched and writes the
//! snapshot back when the guard goes out of scope, whether the mutation
//! finished, returned an error, or was cut short by cancellation.

use std::fs::{self, Permissions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error};

/// Owns the original bytes and permissions of a file under mutation.
///
/// Restoring rewrites the file, so its mtime moves forward. Build tools that
/// compiled the fuzzed contents see the source as newer and rebuild it.
#[derive(Debug)]
pub struct RollbackGuard {
    path: PathBuf,
    original: Vec<u8>,
    permissions: Permissions,
    restored: bool,
}

impl RollbackGuard {
    /// Snapshot `path`. Fails if the file can't be read.
    #[cfg(test)]
    pub fn capture(path: &Path) -> Result<Self> {
        let original = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Self::with_contents(path, original)
    }

    /// Snapshot `path` using contents the caller already read.
    pub fn with_contents(path: &Path, original: Vec<u8>) -> Result<Self> {
        let metadata = fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            original,
            permissions: metadata.permissions(),
            restored: false,
        })
    }

    /// Overwrite the file with mutated contents.
    pub fn write(&self, contents: &[u8]) -> Result<()> {
        fs::write(&self.path, contents)
            .with_context(|| format!("write fuzzed {}", self.path.display()))
    }

    /// Restore the snapshot now and report the outcome. Dropping afterwards
    /// does nothing, even if restoring failed.
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        self.write_back()
    }

    fn write_back(&self) -> Result<()> {
        fs::write(&self.path, &self.original)
            .with_context(|| format!("restore {}", self.path.display()))?;
        fs::set_permissions(&self.path, self.permissions.clone())
            .with_context(|| format!("restore permissions of {}", self.path.display()))?;
        debug!(path = %self.path.display(), "file restored");
        Ok(())
    }
}

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(err) = self.write_back() {
            error!(
                path = %self.path.display(),
                err = %format!("{err:#}"),
                "failed to restore fuzzed file"
            );
        }
    }
}
