//! taskvault init command implementation
//!
//! Creates the stage directories, a starter dashboard and a default
//! `.taskvault.toml` in the vault root.

use std::path::{Path, PathBuf};

use crate::cli::VaultContext;
use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit, OutputOptions, Render, Summary};
use crate::vault::Stage;

pub struct InitOptions {
    pub vault: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct InitReport {
    vault: PathBuf,
    created: InitCreated,
    /// Display names of everything created, for the human summary
    #[serde(skip)]
    created_items: Vec<String>,
}

#[derive(serde::Serialize)]
struct InitCreated {
    stages: Vec<Stage>,
    dashboard: bool,
    config: bool,
}

impl Render for InitReport {
    fn summary(&self) -> Summary {
        let mut summary = Summary::new(if self.created_items.is_empty() {
            "taskvault init: nothing to do"
        } else {
            "taskvault init: initialized vault"
        });
        summary.field("vault", self.vault.display()).field(
            "created",
            if self.created_items.is_empty() {
                "none".to_string()
            } else {
                self.created_items.join(", ")
            },
        );
        summary
            .next_step("taskvault run --source demo")
            .next_step("taskvault status");
        summary
    }
}

pub fn run(options: InitOptions) -> Result<()> {
    let context = VaultContext::open(options.vault.as_deref(), options.config.as_deref())?;
    let root = context.vault.root().to_path_buf();

    let missing: Vec<Stage> = Stage::ALL
        .into_iter()
        .filter(|stage| !context.vault.stage_dir(*stage).is_dir())
        .collect();
    context.vault.ensure_dirs()?;
    let created_dashboard = context.dashboard.init_template()?;
    let created_config = match options.config {
        Some(_) => false,
        None => ensure_config(&context.vault.config_file(), &context.config)?,
    };

    let mut created_items: Vec<String> = missing
        .iter()
        .map(|stage| format!("{}/", display_name(&context.vault.stage_dir(*stage))))
        .collect();
    if created_dashboard {
        created_items.push(display_name(context.dashboard.path()));
    }
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }

    let report = InitReport {
        vault: root,
        created: InitCreated {
            stages: missing,
            dashboard: created_dashboard,
            config: created_config,
        },
        created_items,
    };
    emit(options.output, "init", &report)
}

fn ensure_config(path: &Path, config: &Config) -> Result<bool> {
    if path.exists() {
        if !path.is_file() {
            return Err(Error::InvalidConfig(format!(
                "{CONFIG_FILE} exists but is not a file: {}",
                path.display()
            )));
        }
        return Ok(false);
    }

    config.save(path)?;
    Ok(true)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
