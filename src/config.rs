//! Configuration loading and management
//!
//! Handles parsing of `.taskvault.toml` configuration files. Every section
//! is optional; missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the vault-local configuration file
pub const CONFIG_FILE: &str = ".taskvault.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Vault layout (stage directories, dashboard file)
    #[serde(default)]
    pub vault: VaultConfig,

    /// Task store behavior
    #[serde(default)]
    pub store: StoreConfig,

    /// Dashboard synchronization policy
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Cycle controller settings
    #[serde(default)]
    pub cycle: CycleConfig,
}

/// Directory and file names inside the vault root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_inbox_dir")]
    pub inbox_dir: String,

    #[serde(default = "default_needs_action_dir")]
    pub needs_action_dir: String,

    #[serde(default = "default_done_dir")]
    pub done_dir: String,

    #[serde(default = "default_dashboard_file")]
    pub dashboard_file: String,
}

fn default_inbox_dir() -> String {
    "Inbox".to_string()
}

fn default_needs_action_dir() -> String {
    "Needs_Action".to_string()
}

fn default_done_dir() -> String {
    "Done".to_string()
}

fn default_dashboard_file() -> String {
    "Dashboard.md".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            inbox_dir: default_inbox_dir(),
            needs_action_dir: default_needs_action_dir(),
            done_dir: default_done_dir(),
            dashboard_file: default_dashboard_file(),
        }
    }
}

/// Task store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Glob matched against file names when counting artifacts
    #[serde(default = "default_artifact_glob")]
    pub artifact_glob: String,

    /// Highest `_N` suffix tried before giving up on a name
    #[serde(default = "default_max_disambiguator")]
    pub max_disambiguator: u32,
}

fn default_artifact_glob() -> String {
    "*.md".to_string()
}

fn default_max_disambiguator() -> u32 {
    999
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            artifact_glob: default_artifact_glob(),
            max_disambiguator: default_max_disambiguator(),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Append a Status Overview section when the document has none.
    /// When false, such documents are left untouched.
    #[serde(default = "default_true")]
    pub append_missing_section: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            append_missing_section: true,
        }
    }
}

/// Which mail source feeds the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Built-in sample messages
    Demo,
    /// Pre-decoded messages read from a JSON or JSONL spool file
    Spool,
}

/// Cycle controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Messages fetched per cycle
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Minutes between successful cycles in watch mode
    #[serde(default = "default_interval_mins")]
    pub interval_mins: u64,

    /// Minutes to wait after a failed cycle in watch mode
    #[serde(default = "default_retry_mins")]
    pub retry_mins: u64,

    /// Mail source used when the CLI does not override it
    #[serde(default = "default_source")]
    pub source: SourceKind,

    /// Spool file for the `spool` source, relative to the vault root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spool: Option<PathBuf>,
}

fn default_max_results() -> usize {
    5
}

fn default_interval_mins() -> u64 {
    30
}

fn default_retry_mins() -> u64 {
    5
}

fn default_source() -> SourceKind {
    SourceKind::Demo
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            interval_mins: default_interval_mins(),
            retry_mins: default_retry_mins(),
            source: default_source(),
            spool: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration for a vault.
    ///
    /// Order: explicit file, `<vault>/.taskvault.toml`, the user config
    /// directory, then built-in defaults. An explicit file must exist.
    pub fn discover(vault_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::load(path);
        }

        let vault_file = vault_root.join(CONFIG_FILE);
        if vault_file.exists() {
            return Self::load(&vault_file);
        }

        if let Some(user_file) = user_config_path() {
            if user_file.exists() {
                tracing::debug!(path = %user_file.display(), "using user config");
                return Self::load(&user_file);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.vault.validate()?;
        self.store.validate()?;
        self.cycle.validate()?;
        Ok(())
    }
}

/// Per-user config file, e.g. `~/.config/taskvault/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "taskvault")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl VaultConfig {
    fn validate(&self) -> Result<()> {
        let entries = [
            ("vault.inbox_dir", &self.inbox_dir),
            ("vault.needs_action_dir", &self.needs_action_dir),
            ("vault.done_dir", &self.done_dir),
            ("vault.dashboard_file", &self.dashboard_file),
        ];

        let mut seen = std::collections::HashSet::new();
        for (field, value) in entries {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
            }
            if trimmed.contains(['/', '\\']) {
                return Err(Error::InvalidConfig(format!(
                    "{field} must be a plain name, got '{trimmed}'"
                )));
            }
            if !seen.insert(trimmed.to_string()) {
                return Err(Error::InvalidConfig(format!(
                    "{field} duplicates another vault entry '{trimmed}'"
                )));
            }
        }
        Ok(())
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        if self.artifact_glob.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "store.artifact_glob cannot be empty".to_string(),
            ));
        }
        glob::Pattern::new(&self.artifact_glob).map_err(|err| {
            Error::InvalidConfig(format!(
                "store.artifact_glob: invalid glob pattern '{}': {err}",
                self.artifact_glob
            ))
        })?;
        if self.max_disambiguator == 0 {
            return Err(Error::InvalidConfig(
                "store.max_disambiguator must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Compiled artifact filter
    pub fn artifact_pattern(&self) -> Result<glob::Pattern> {
        glob::Pattern::new(&self.artifact_glob).map_err(|err| {
            Error::InvalidConfig(format!("store.artifact_glob: {err}"))
        })
    }
}

impl CycleConfig {
    fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(Error::InvalidConfig(
                "cycle.max_results must be >= 1".to_string(),
            ));
        }
        if self.interval_mins == 0 {
            return Err(Error::InvalidConfig(
                "cycle.interval_mins must be >= 1".to_string(),
            ));
        }
        if self.retry_mins == 0 {
            return Err(Error::InvalidConfig(
                "cycle.retry_mins must be >= 1".to_string(),
            ));
        }
        for (field, mins) in [("interval_mins", self.interval_mins), ("retry_mins", self.retry_mins)] {
            if mins.checked_mul(60).is_none() {
                return Err(Error::InvalidConfig(format!(
                    "cycle.{field} is too large: {mins}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.vault.inbox_dir, "Inbox");
        assert_eq!(cfg.vault.needs_action_dir, "Needs_Action");
        assert_eq!(cfg.vault.done_dir, "Done");
        assert_eq!(cfg.vault.dashboard_file, "Dashboard.md");
        assert_eq!(cfg.store.artifact_glob, "*.md");
        assert_eq!(cfg.store.max_disambiguator, 999);
        assert!(cfg.dashboard.append_missing_section);
        assert_eq!(cfg.cycle.max_results, 5);
        assert_eq!(cfg.cycle.interval_mins, 30);
        assert_eq!(cfg.cycle.retry_mins, 5);
        assert_eq!(cfg.cycle.source, SourceKind::Demo);
        assert!(cfg.cycle.spool.is_none());
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[vault]
done_dir = "Archive"
dashboard_file = "Status.md"

[store]
artifact_glob = "*.markdown"
max_disambiguator = 9

[dashboard]
append_missing_section = false

[cycle]
max_results = 2
interval_mins = 10
retry_mins = 1
source = "spool"
spool = "mail.jsonl"
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.vault.inbox_dir, "Inbox");
        assert_eq!(cfg.vault.done_dir, "Archive");
        assert_eq!(cfg.vault.dashboard_file, "Status.md");
        assert_eq!(cfg.store.artifact_glob, "*.markdown");
        assert_eq!(cfg.store.max_disambiguator, 9);
        assert!(!cfg.dashboard.append_missing_section);
        assert_eq!(cfg.cycle.max_results, 2);
        assert_eq!(cfg.cycle.interval_mins, 10);
        assert_eq!(cfg.cycle.retry_mins, 1);
        assert_eq!(cfg.cycle.source, SourceKind::Spool);
        assert_eq!(cfg.cycle.spool, Some(PathBuf::from("mail.jsonl")));
    }

    #[test]
    fn duplicate_stage_dirs_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[vault]\ndone_dir = \"Needs_Action\"\n").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            Error::InvalidConfig(message) => assert!(message.contains("vault.done_dir")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_glob_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[store]\nartifact_glob = \"[\"\n").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn zero_max_results_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[cycle]\nmax_results = 0\n").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn interval_that_overflows_seconds_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[cycle]\ninterval_mins = 9223372036854775807\n").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("interval_mins")));
    }

    #[test]
    fn discover_reads_vault_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CONFIG_FILE), "[cycle]\nmax_results = 3\n")
            .expect("write config");

        let cfg = Config::discover(dir.path(), None).expect("discover");
        assert_eq!(cfg.cycle.max_results, 3);
    }

    #[test]
    fn discover_requires_explicit_file_to_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");

        let err = Config::discover(dir.path(), Some(&missing)).expect_err("missing config");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn save_writes_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.toml");
        let cfg = Config::default();
        cfg.save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("needs_action_dir = \"Needs_Action\""));
        assert!(written.contains("source = \"demo\""));
    }
}
