//! Directory-backed task store.
//!
//! The store is the only writer of the stage directories. An artifact's
//! stage is the directory its file lives in; moving between stages is a
//! rename. There is no index or cache: every count reads the directory.
//!
//! The store takes no locks and assumes a single active writer. Files
//! deleted behind its back surface as `ArtifactNotFound` on the next
//! operation that touches them.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::artifact::{self, ArtifactDraft, ArtifactKind};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::vault::{Stage, Vault};

/// Reference to an artifact at a specific stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactHandle {
    pub name: String,
    pub stage: Stage,
    pub path: PathBuf,
}

impl ArtifactHandle {
    /// Kind implied by the file name
    pub fn kind(&self) -> Option<ArtifactKind> {
        ArtifactKind::from_file_name(&self.name)
    }
}

/// Artifact counts for every stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub inbox: usize,
    pub needs_action: usize,
    pub done: usize,
}

impl StageCounts {
    pub fn total(&self) -> usize {
        self.inbox + self.needs_action + self.done
    }
}

#[derive(Clone)]
pub struct TaskStore {
    vault: Vault,
    pattern: glob::Pattern,
    max_disambiguator: u32,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("vault", &self.vault)
            .field("pattern", &self.pattern.as_str())
            .field("max_disambiguator", &self.max_disambiguator)
            .finish()
    }
}

impl TaskStore {
    pub fn new(vault: Vault, config: &StoreConfig) -> Result<Self> {
        Ok(Self {
            vault,
            pattern: config.artifact_pattern()?,
            max_disambiguator: config.max_disambiguator,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used for artifact names
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Write a new artifact into `Needs_Action`.
    ///
    /// The name is `{Kind}_{YYYYMMDD}_{HHMMSS}.md`; when that name is taken
    /// in any stage, `_1`, `_2`, ... are tried in order. Existing files are
    /// never overwritten.
    pub fn create_artifact(&self, draft: &ArtifactDraft) -> Result<ArtifactHandle> {
        let dir = self.vault.stage_dir(Stage::NeedsAction);
        fs::create_dir_all(&dir)?;

        let now = self.clock.now();
        let base = artifact::base_name(draft.kind, now);
        let content = draft.render(now);

        for disambiguator in 0..=self.max_disambiguator {
            let name = artifact::file_name(&base, disambiguator);
            if self.name_taken(&name) {
                continue;
            }

            let path = dir.join(&name);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };

            if let Err(err) = file.write_all(content.as_bytes()).and_then(|_| file.sync_all()) {
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(err.into());
            }

            tracing::debug!(name = %name, kind = %draft.kind, task_id = %draft.task_id, "artifact created");
            return Ok(ArtifactHandle {
                name,
                stage: Stage::NeedsAction,
                path,
            });
        }

        let attempts = self.max_disambiguator + 1;
        tracing::error!(base = %base, attempts, "artifact name space exhausted");
        Err(Error::NamingCollision { base, attempts })
    }

    /// Read an artifact's content
    pub fn read(&self, handle: &ArtifactHandle) -> Result<String> {
        let path = self.vault.stage_dir(handle.stage).join(&handle.name);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(Error::ArtifactNotFound(path)),
            Err(err) => Err(err.into()),
        }
    }

    /// Move an artifact from `Needs_Action` to `Done`.
    pub fn advance_to_terminal(&self, handle: &ArtifactHandle) -> Result<ArtifactHandle> {
        if handle.stage != Stage::NeedsAction {
            return Err(Error::InvalidTransition {
                name: handle.name.clone(),
                from: handle.stage.to_string(),
                to: Stage::Done.to_string(),
            });
        }

        let source = self.vault.stage_dir(Stage::NeedsAction).join(&handle.name);
        if !source.is_file() {
            return Err(Error::ArtifactNotFound(source));
        }

        let done_dir = self.vault.stage_dir(Stage::Done);
        fs::create_dir_all(&done_dir)?;
        let destination = done_dir.join(&handle.name);
        if destination.exists() {
            return Err(Error::DestinationConflict(destination));
        }

        match fs::rename(&source, &destination) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ArtifactNotFound(source));
            }
            Err(err) => return Err(err.into()),
        }

        tracing::debug!(name = %handle.name, "artifact moved to done");
        Ok(ArtifactHandle {
            name: handle.name.clone(),
            stage: Stage::Done,
            path: destination,
        })
    }

    /// Number of artifacts in a stage. A missing stage directory counts as
    /// empty; files not matching the artifact filter are ignored.
    pub fn count_by_stage(&self, stage: Stage) -> Result<usize> {
        Ok(self.artifact_names(stage)?.len())
    }

    pub fn counts(&self) -> Result<StageCounts> {
        Ok(StageCounts {
            inbox: self.count_by_stage(Stage::Inbox)?,
            needs_action: self.count_by_stage(Stage::NeedsAction)?,
            done: self.count_by_stage(Stage::Done)?,
        })
    }

    /// Artifacts in a stage, sorted by name
    pub fn list(&self, stage: Stage) -> Result<Vec<ArtifactHandle>> {
        let dir = self.vault.stage_dir(stage);
        Ok(self
            .artifact_names(stage)?
            .into_iter()
            .map(|name| ArtifactHandle {
                path: dir.join(&name),
                name,
                stage,
            })
            .collect())
    }

    /// Locate an artifact by file name in any stage
    pub fn find(&self, name: &str) -> Result<ArtifactHandle> {
        validate_name(name)?;
        for stage in Stage::ALL {
            let path = self.vault.stage_dir(stage).join(name);
            if path.is_file() {
                return Ok(ArtifactHandle {
                    name: name.to_string(),
                    stage,
                    path,
                });
            }
        }
        Err(Error::ArtifactNotFound(
            self.vault.stage_dir(Stage::NeedsAction).join(name),
        ))
    }

    fn name_taken(&self, name: &str) -> bool {
        Stage::ALL
            .iter()
            .any(|stage| self.vault.stage_dir(*stage).join(name).exists())
    }

    fn artifact_names(&self, stage: Stage) -> Result<Vec<String>> {
        let dir = self.vault.stage_dir(stage);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.pattern.matches(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || Path::new(name).components().count() != 1
        || name.contains(['/', '\\'])
        || name == "."
        || name == ".."
    {
        return Err(Error::InvalidArgument(format!(
            "artifact name must be a plain file name, got '{name}'"
        )));
    }
    Ok(())
}
