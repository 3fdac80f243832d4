//! Command-line interface for taskvault
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is implemented in its own submodule.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::config::{Config, SourceKind};
use crate::dashboard::Dashboard;
use crate::error::{Error, Result};
use crate::events::{EventDestination, EventSink};
use crate::mail::{DemoMailSource, MailSource, SpoolMailSource};
use crate::output::OutputOptions;
use crate::store::TaskStore;
use crate::vault::{Stage, Vault};

mod advance;
mod init;
mod run;
mod status;
mod sync;

/// Vault directory used when neither `--vault` nor `TASKVAULT_VAULT` is set
pub const DEFAULT_VAULT_DIR: &str = "vault";

/// taskvault - mail-to-task pipeline
///
/// Turns recent messages into Note and Plan artifacts in a folder-backed
/// vault, moves them through Needs_Action to Done, and keeps the vault's
/// Markdown dashboard in sync.
#[derive(Parser, Debug)]
#[command(name = "taskvault")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Vault root directory
    #[arg(long, global = true, env = "TASKVAULT_VAULT")]
    pub vault: Option<PathBuf>,

    /// Configuration file (defaults to <vault>/.taskvault.toml)
    #[arg(long, global = true, env = "TASKVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSON-lines events to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create stage directories, a starter dashboard and default config
    Init,

    /// Run one fetch, plan, advance and sync cycle
    Run {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Run cycles continuously until interrupted
    Watch {
        #[command(flatten)]
        source: SourceArgs,

        /// Minutes between successful cycles
        #[arg(long)]
        interval_mins: Option<u64>,

        /// Minutes to wait after a failed cycle
        #[arg(long)]
        retry_mins: Option<u64>,

        /// Stop after this many cycles
        #[arg(long)]
        max_cycles: Option<u64>,
    },

    /// Show artifact counts per stage
    Status,

    /// Rewrite the dashboard status section from current counts
    Sync,

    /// List artifacts in a stage
    List {
        /// Stage to list
        #[arg(long, value_enum, default_value = "needs-action")]
        stage: Stage,
    },

    /// Move one artifact from Needs_Action to Done
    Advance {
        /// Artifact file name, e.g. Note_20261014_093000.md
        name: String,
    },
}

/// Mail source selection shared by `run` and `watch`
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Mail source (defaults to cycle.source in config)
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Spool file for the spool source
    #[arg(long)]
    pub spool: Option<PathBuf>,

    /// Messages fetched per cycle
    #[arg(long)]
    pub max: Option<usize>,
}

/// Resolved vault, config and core components for one command
pub struct VaultContext {
    pub vault: Vault,
    pub config: Config,
    pub store: TaskStore,
    pub dashboard: Dashboard,
}

impl VaultContext {
    pub fn open(vault: Option<&Path>, config: Option<&Path>) -> Result<Self> {
        let root = vault
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_VAULT_DIR));
        let config = Config::discover(&root, config)?;
        let vault = Vault::new(root, config.vault.clone());
        let store = TaskStore::new(vault.clone(), &config.store)?;
        let dashboard = Dashboard::new(vault.dashboard_file(), &config.dashboard);
        Ok(Self {
            vault,
            config,
            store,
            dashboard,
        })
    }

    /// Fail unless `init` has created the stage directories
    pub fn require_initialized(&self) -> Result<()> {
        if self.vault.is_initialized() {
            return Ok(());
        }
        Err(Error::InvalidArgument(format!(
            "vault not initialized at {} (run `taskvault init`)",
            self.vault.root().display()
        )))
    }

    /// Build the mail source from CLI overrides and config
    pub fn mail_source(&self, args: &SourceArgs) -> Result<Box<dyn MailSource>> {
        let kind = args.source.unwrap_or(self.config.cycle.source);
        match kind {
            SourceKind::Demo => Ok(Box::new(DemoMailSource::new())),
            SourceKind::Spool => {
                let path = args
                    .spool
                    .clone()
                    .or_else(|| self.config.cycle.spool.clone())
                    .ok_or_else(|| {
                        Error::InvalidArgument(
                            "spool source needs --spool or cycle.spool in config".to_string(),
                        )
                    })?;
                let path = if path.is_relative() && args.spool.is_none() {
                    self.vault.root().join(path)
                } else {
                    path
                };
                Ok(Box::new(SpoolMailSource::new(path)))
            }
        }
    }
}

fn open_events(raw: Option<&str>) -> Result<Option<EventSink>> {
    EventDestination::parse(raw)
        .map(|destination| destination.open())
        .transpose()
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let events_to_stdout = matches!(
            EventDestination::parse(self.events.as_deref()),
            Some(EventDestination::Stdout)
        );
        let output = OutputOptions {
            json: self.json && !events_to_stdout,
            quiet: self.quiet || events_to_stdout,
        };
        let vault = self.vault.as_deref();
        let config = self.config.as_deref();

        match self.command {
            Commands::Init => init::run(init::InitOptions {
                vault: vault.map(Path::to_path_buf),
                config: config.map(Path::to_path_buf),
                output,
            }),
            Commands::Run { source } => run::run_once(run::RunOptions {
                context: VaultContext::open(vault, config)?,
                source,
                events: open_events(self.events.as_deref())?,
                output,
            }),
            Commands::Watch {
                source,
                interval_mins,
                retry_mins,
                max_cycles,
            } => run::run_watch(run::WatchOptions {
                run: run::RunOptions {
                    context: VaultContext::open(vault, config)?,
                    source,
                    events: open_events(self.events.as_deref())?,
                    output,
                },
                interval_mins,
                retry_mins,
                max_cycles,
            }),
            Commands::Status => status::run_status(VaultContext::open(vault, config)?, output),
            Commands::List { stage } => {
                status::run_list(VaultContext::open(vault, config)?, stage, output)
            }
            Commands::Sync => sync::run(VaultContext::open(vault, config)?, output),
            Commands::Advance { name } => advance::run(advance::AdvanceOptions {
                context: VaultContext::open(vault, config)?,
                name,
                events: open_events(self.events.as_deref())?,
                output,
            }),
        }
    }
}
