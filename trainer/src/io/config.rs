//! Trainer configuration stored under `.trainer/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::interrupt::InterruptKey;

/// How far back a file's mtime may be for it to count as a recent edit.
pub const RECENCY_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Default freshness of persisted training data for callers that don't force
/// regeneration.
pub const TRAIN_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// Trainer configuration (TOML).
///
/// Missing fields fall back to defaults, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrainConfig {
    /// Window for labeling the newest file as a recent edit.
    pub recency_window_secs: u64,

    /// Per-command timeout. A command that exceeds it is recorded as failed.
    pub command_timeout_secs: u64,

    /// Wall-clock budget for one whole training run; `0` disables the deadline.
    pub train_timeout_secs: u64,

    /// Only files ending in one of these suffixes are fuzzed.
    pub fuzz_suffixes: Vec<String>,

    /// Keys that interrupt an interactive training run.
    pub interrupt_keys: Vec<InterruptKey>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            recency_window_secs: RECENCY_WINDOW.as_secs(),
            command_timeout_secs: 60,
            train_timeout_secs: 0,
            fuzz_suffixes: vec![".go".to_string(), ".js".to_string()],
            interrupt_keys: vec![
                InterruptKey::Enter,
                InterruptKey::LineFeed,
                InterruptKey::Esc,
            ],
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.recency_window_secs == 0 {
            return Err(anyhow!("recency_window_secs must be > 0"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        for suffix in &self.fuzz_suffixes {
            if suffix.len() < 2 || !suffix.starts_with('.') {
                return Err(anyhow!(
                    "fuzz_suffixes entries must look like \".ext\" (got {suffix:?})"
                ));
            }
        }
        if self.interrupt_keys.is_empty() {
            return Err(anyhow!("interrupt_keys must be a non-empty array"));
        }
        Ok(())
    }

    pub fn recency_window(&self) -> Duration {
        Duration::from_secs(self.recency_window_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn train_timeout(&self) -> Option<Duration> {
        (self.train_timeout_secs > 0).then(|| Duration::from_secs(self.train_timeout_secs))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `TrainConfig::default()`.
pub fn load_config(path: &Path) -> Result<TrainConfig> {
    if !path.exists() {
        let cfg = TrainConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: TrainConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, TrainConfig::default());
        assert_eq!(cfg.recency_window(), RECENCY_WINDOW);
        assert_eq!(cfg.train_timeout(), None);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "fuzz_suffixes = [\".rs\"]\ninterrupt_keys = [\"esc\"]\ntrain_timeout_secs = 90\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.fuzz_suffixes, vec![".rs".to_string()]);
        assert_eq!(cfg.interrupt_keys, vec![InterruptKey::Esc]);
        assert_eq!(cfg.train_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(cfg.command_timeout_secs, 60);
    }

    #[test]
    fn rejects_bad_suffix_and_empty_keys() {
        let cfg = TrainConfig {
            fuzz_suffixes: vec!["go".to_string()],
            ..TrainConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = TrainConfig {
            interrupt_keys: Vec::new(),
            ..TrainConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
