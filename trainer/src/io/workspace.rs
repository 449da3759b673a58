//! Workspace discovery, `.trainer/` layout, and file enumeration.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use ignore::WalkBuilder;
use tracing::{debug, info, instrument};

use crate::core::types::FileInfo;

pub const TRAINER_DIR: &str = ".trainer";
pub const CONFIG_FILE: &str = "config.toml";
pub const COMMANDS_FILE: &str = "commands.json";
pub const CMDLOG_FILE: &str = "cmdlog.json";

/// Directories never walked for fuzz candidates.
const SKIP_DIRS: &[&str] = &[TRAINER_DIR, ".git"];

/// All canonical paths within `.trainer/` for a workspace root.
#[derive(Debug, Clone)]
pub struct TrainerPaths {
    pub root: PathBuf,
    pub trainer_dir: PathBuf,
    pub config_path: PathBuf,
    pub commands_path: PathBuf,
    pub cmdlog_path: PathBuf,
}

impl TrainerPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let trainer_dir = root.join(TRAINER_DIR);
        Self {
            root,
            config_path: trainer_dir.join(CONFIG_FILE),
            commands_path: trainer_dir.join(COMMANDS_FILE),
            cmdlog_path: trainer_dir.join(CMDLOG_FILE),
            trainer_dir,
        }
    }
}

/// The directory tree under test.
#[derive(Debug, Clone)]
pub struct Workspace {
    paths: TrainerPaths,
}

impl Workspace {
    /// Open a workspace rooted at `root` without touching the filesystem.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            paths: TrainerPaths::new(root),
        }
    }

    /// Find the nearest ancestor of `start` containing `.trainer/`, or create
    /// `.trainer/` in `start` if there is none.
    pub fn find_or_init(start: &Path) -> Result<Self> {
        if let Some(root) = start
            .ancestors()
            .find(|dir| dir.join(TRAINER_DIR).is_dir())
        {
            debug!(root = %root.display(), "found existing workspace");
            return Ok(Self::at(root));
        }

        let ws = Self::at(start);
        fs::create_dir_all(&ws.paths.trainer_dir)
            .with_context(|| format!("create {}", ws.paths.trainer_dir.display()))?;
        info!(root = %start.display(), "initialized workspace");
        Ok(ws)
    }

    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    pub fn paths(&self) -> &TrainerPaths {
        &self.paths
    }

    /// Stat a root-relative path.
    pub fn stat(&self, rel: impl AsRef<Path>) -> io::Result<Metadata> {
        fs::metadata(self.paths.root.join(rel))
    }

    /// Every regular file under the root with its modification time.
    ///
    /// Respects ignore files and skips `.trainer/` and `.git/`. The result is
    /// in walk order; callers sort as needed.
    #[instrument(skip_all, fields(root = %self.paths.root.display()))]
    pub fn walk_root(&self) -> Result<Vec<FileInfo>> {
        let root = self.paths.root.clone();
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&root)
            .hidden(false)
            .require_git(false)
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                let name = entry.file_name().to_string_lossy();
                !(is_dir && SKIP_DIRS.contains(&name.as_ref()))
            })
            .build();

        for entry in walker {
            let entry = entry.context("walk workspace")?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            let metadata = entry
                .metadata()
                .with_context(|| format!("stat {}", path.display()))?;
            let mod_time = metadata
                .modified()
                .with_context(|| format!("read mtime of {}", path.display()))?;
            files.push(FileInfo {
                name: relative_name(&root, path)?,
                path: path.to_path_buf(),
                mod_time,
            });
        }

        debug!(count = files.len(), "walked workspace");
        Ok(files)
    }
}

/// `path` relative to `root`, joined with `/` regardless of platform.
fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| anyhow!("{} is outside {}", path.display(), root.display()))?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}
