//! Initialization helpers for `.pollbox/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use super::config::{PollboxConfig, write_config};
use super::snapshot_store::write_snapshot;
use super::storage::FileStorage;
use crate::seed::seed_snapshot;

const POLLBOX_GITIGNORE: &str = "state/*.tmp\n";

/// All canonical paths within `.pollbox/` for a project root.
#[derive(Debug, Clone)]
pub struct PollboxPaths {
    pub root: PathBuf,
    pub pollbox_dir: PathBuf,
    pub state_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub config_path: PathBuf,
}

impl PollboxPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let pollbox_dir = root.join(".pollbox");
        let state_dir = pollbox_dir.join("state");
        Self {
            root: root.clone(),
            pollbox_dir: pollbox_dir.clone(),
            state_dir,
            gitignore_path: pollbox_dir.join(".gitignore"),
            config_path: pollbox_dir.join("config.toml"),
        }
    }

    /// Slot storage rooted at the state directory.
    pub fn storage(&self) -> FileStorage {
        FileStorage::new(&self.state_dir)
    }
}

/// Options for `init_pollbox`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing config and state with defaults and seed data.
    pub force: bool,
}

/// Create `.pollbox/` scaffolding in `root` with default config and seed state.
///
/// Fails if `.pollbox/` already exists unless `options.force` is set.
pub fn init_pollbox(root: &Path, options: &InitOptions) -> Result<PollboxPaths> {
    let paths = PollboxPaths::new(root);
    if paths.pollbox_dir.exists() && !options.force {
        return Err(anyhow!(
            "pollbox init: .pollbox already exists (use --force to overwrite)"
        ));
    }
    if paths.pollbox_dir.exists() && !paths.pollbox_dir.is_dir() {
        return Err(anyhow!(
            "pollbox init: .pollbox exists but is not a directory"
        ));
    }

    create_dir(&paths.pollbox_dir)?;
    create_dir(&paths.state_dir)?;
    fs::write(&paths.gitignore_path, POLLBOX_GITIGNORE)
        .with_context(|| format!("write file {}", paths.gitignore_path.display()))?;
    write_config(&paths.config_path, &PollboxConfig::default())?;
    write_snapshot(&mut paths.storage(), &seed_snapshot())?;

    info!(root = %root.display(), "pollbox initialized");
    Ok(paths)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}
