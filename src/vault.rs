//! Vault layout
//!
//! A vault is a plain directory tree. Lifecycle stages are subdirectories
//! and the dashboard is a Markdown file at the root.
//!
//! # Directory Structure
//!
//! ```text
//! <vault>/
//!   .taskvault.toml             # Optional configuration
//!   .taskvault.lock             # Controller instance lock
//!   Dashboard.md                # Status document
//!   Inbox/                      # Reserved, never populated by the pipeline
//!   Needs_Action/               # Work queue
//!     Note_20261014_093000.md
//!     Plan_20261014_093000.md
//!   Done/                       # Terminal archive
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::VaultConfig;
use crate::error::Result;

/// Lifecycle stage of a task artifact
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Inbox,
    NeedsAction,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Inbox, Stage::NeedsAction, Stage::Done];

    /// Stable snake_case identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Inbox => "inbox",
            Stage::NeedsAction => "needs_action",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paths of one vault
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
    layout: VaultConfig,
}

impl Vault {
    pub fn new(root: impl Into<PathBuf>, layout: VaultConfig) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Vault with the default directory names
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        Self::new(root, VaultConfig::default())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        let name = match stage {
            Stage::Inbox => &self.layout.inbox_dir,
            Stage::NeedsAction => &self.layout.needs_action_dir,
            Stage::Done => &self.layout.done_dir,
        };
        self.root.join(name)
    }

    pub fn dashboard_file(&self) -> PathBuf {
        self.root.join(&self.layout.dashboard_file)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(crate::config::CONFIG_FILE)
    }

    /// Whether every stage directory exists
    pub fn is_initialized(&self) -> bool {
        Stage::ALL.iter().all(|stage| self.stage_dir(*stage).is_dir())
    }

    /// Create the stage directories. Returns the ones that were missing.
    pub fn ensure_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        for stage in Stage::ALL {
            let dir = self.stage_dir(stage);
            if !dir.is_dir() {
                fs::create_dir_all(&dir)?;
                tracing::debug!(dir = %dir.display(), "created stage directory");
                created.push(dir);
            }
        }
        Ok(created)
    }
}
