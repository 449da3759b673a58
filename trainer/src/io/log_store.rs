//! Persistence for generated training data (`.trainer/cmdlog.json`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::CommandLogGroup;

/// Load persisted log groups.
pub fn read_log_groups(path: &Path) -> Result<Vec<CommandLogGroup>> {
    debug!(path = %path.display(), "loading command logs");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read command logs {}", path.display()))?;
    let groups: Vec<CommandLogGroup> = serde_json::from_str(&contents)
        .with_context(|| format!("parse command logs {}", path.display()))?;
    debug!(groups = groups.len(), "command logs loaded");
    Ok(groups)
}

/// Atomically replace the persisted log groups (temp file + rename).
///
/// Empty groups carry no signal and are never written.
pub fn write_log_groups(path: &Path, groups: &[CommandLogGroup]) -> Result<()> {
    let kept: Vec<&CommandLogGroup> = groups.iter().filter(|g| !g.is_empty()).collect();
    debug!(path = %path.display(), groups = kept.len(), "writing command logs");
    let mut buf = serde_json::to_string_pretty(&kept).context("serialize command logs")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("command log path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp command logs {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replace command logs {}", path.display()))?;
    Ok(())
}
