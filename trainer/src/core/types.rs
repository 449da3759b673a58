//! Training-log types shared between generation and downstream consumers.
//!
//! The serialized shape of these types is the on-disk artifact format
//! (`.trainer/cmdlog.json`), so field names must stay stable.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a log group came to exist.
///
/// Consumers match on this exhaustively; adding a variant is a format change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    /// An edit made by the user.
    User,
    /// A made-up log used to bootstrap training before the user has run anything.
    Bootstrap,
    /// An edit generated by the fuzzer.
    Fuzz,
    /// The initial run of every command against the untouched workspace.
    TrainInit,
}

/// Label attached to every log in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    /// Root-relative paths of files considered recently edited.
    ///
    /// "Recent" is deliberately fuzzy and may change.
    pub recent_edits: BTreeSet<String>,
    pub start_time: DateTime<Utc>,
    pub source: LogSource,
}

impl LogContext {
    /// Build a context stamped with the current time.
    pub fn now(source: LogSource, recent_edit: Option<&str>) -> Self {
        Self {
            recent_edits: recent_edit.map(str::to_string).into_iter().collect(),
            start_time: Utc::now(),
            source,
        }
    }
}

/// Observed outcome of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLog {
    /// The `command` field of the [`TrainCommand`] that ran.
    pub command: String,
    pub success: bool,
    pub duration: Duration,
}

/// All commands that ran against one fixed workspace state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLogGroup {
    pub logs: Vec<CommandLog>,
    pub context: LogContext,
}

impl CommandLogGroup {
    pub fn new(context: LogContext) -> Self {
        Self {
            logs: Vec::new(),
            context,
        }
    }

    pub fn add(&mut self, log: CommandLog) {
        self.logs.push(log);
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

/// One build/test command to run in every batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainCommand {
    /// Shell command line, also the stable identifier recorded in logs.
    pub command: String,
    /// Glob of files this command is believed to cover. Not interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
}

impl TrainCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            file_pattern: None,
        }
    }
}

/// A workspace file and its last modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Root-relative path with `/` separators, for labels and suffix checks.
    ///
    /// Lossy for non-UTF-8 names; use `path` to touch the file.
    pub name: String,
    pub path: PathBuf,
    pub mod_time: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_source_serializes_snake_case() {
        let json = serde_json::to_string(&LogSource::TrainInit).expect("serialize");
        assert_eq!(json, "\"train_init\"");
    }

    #[test]
    fn context_without_recent_edit_has_empty_set() {
        let ctx = LogContext::now(LogSource::TrainInit, None);
        assert!(ctx.recent_edits.is_empty());

        let ctx = LogContext::now(LogSource::Fuzz, Some("a.go"));
        assert_eq!(ctx.recent_edits.len(), 1);
        assert!(ctx.recent_edits.contains("a.go"));
    }

    #[test]
    fn train_command_omits_missing_file_pattern() {
        let json = serde_json::to_string(&TrainCommand::new("go test ./...")).expect("serialize");
        assert_eq!(json, "{\"command\":\"go test ./...\"}");
    }
}
