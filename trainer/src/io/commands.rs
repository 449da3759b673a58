//! The command list run in every training batch.
//!
//! Commands come from `.trainer/commands.json` when present. Otherwise a
//! default list is guessed from well-known project files in the root.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::types::TrainCommand;

/// Project marker file and the test command it implies, in detection order.
const DETECTORS: &[(&str, &str, &str)] = &[
    ("go.mod", "go test ./...", "**/*.go"),
    ("package.json", "npm test", "**/*.js"),
    ("Cargo.toml", "cargo test", "**/*.rs"),
    ("Makefile", "make test", ""),
];

/// Load the command list for `root`.
pub fn load_commands(root: &Path, commands_path: &Path) -> Result<Vec<TrainCommand>> {
    if !commands_path.exists() {
        let detected = detect_commands(root);
        info!(count = detected.len(), "no command list, using detected commands");
        return Ok(detected);
    }
    let contents = fs::read_to_string(commands_path)
        .with_context(|| format!("read {}", commands_path.display()))?;
    let commands: Vec<TrainCommand> = serde_json::from_str(&contents)
        .with_context(|| format!("parse {}", commands_path.display()))?;
    debug!(count = commands.len(), "command list loaded");
    Ok(commands)
}

/// Guess commands from project marker files directly under `root`.
pub fn detect_commands(root: &Path) -> Vec<TrainCommand> {
    DETECTORS
        .iter()
        .filter(|(marker, _, _)| root.join(marker).is_file())
        .map(|(_, command, pattern)| TrainCommand {
            command: command.to_string(),
            file_pattern: (!pattern.is_empty()).then(|| pattern.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_list_wins_over_detection() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::write(root.join("go.mod"), "module x").expect("write");
        let path = root.join("commands.json");
        fs::write(
            &path,
            r#"[{"command": "go vet ./..."}, {"command": "make lint", "file_pattern": "*.go"}]"#,
        )
        .expect("write");

        let cmds = load_commands(root, &path).expect("load");
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], TrainCommand::new("go vet ./..."));
        assert_eq!(cmds[1].file_pattern.as_deref(), Some("*.go"));
    }

    #[test]
    fn detects_in_fixed_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::write(root.join("Makefile"), "test:").expect("write");
        fs::write(root.join("go.mod"), "module x").expect("write");

        let cmds = load_commands(root, &root.join("missing.json")).expect("load");
        let names: Vec<&str> = cmds.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(names, vec!["go test ./...", "make test"]);
        assert_eq!(cmds[1].file_pattern, None);
    }

    #[test]
    fn empty_root_detects_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(detect_commands(temp.path()).is_empty());
    }
}
