#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, TimeZone};
use taskvault::clock::ManualClock;
use taskvault::config::{DashboardConfig, StoreConfig};
use taskvault::dashboard::Dashboard;
use taskvault::store::TaskStore;
use taskvault::vault::Vault;
use tempfile::TempDir;

pub struct TestVault {
    dir: TempDir,
    pub vault: Vault,
    pub clock: Arc<ManualClock>,
}

impl TestVault {
    /// Initialized vault with a clock frozen at 2026-10-14 09:30:00 local
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let vault = Vault::with_defaults(dir.path());
        vault.ensure_dirs().expect("stage dirs");
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap(),
        ));
        Self { dir, vault, clock }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> TaskStore {
        TaskStore::new(self.vault.clone(), &StoreConfig::default())
            .expect("store")
            .with_clock(self.clock.clone())
    }

    pub fn dashboard(&self) -> Dashboard {
        self.dashboard_with(&DashboardConfig::default())
    }

    pub fn dashboard_with(&self, config: &DashboardConfig) -> Dashboard {
        Dashboard::new(self.vault.dashboard_file(), config).with_clock(self.clock.clone())
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_dashboard(&self) -> String {
        fs::read_to_string(self.vault.dashboard_file()).expect("read dashboard")
    }
}

/// Lines outside the status section, in order
pub fn unowned_lines(document: &str) -> Vec<String> {
    let mut kept = Vec::new();
    let mut in_section = false;
    for line in document.lines() {
        if line.trim() == "## Status Overview" {
            in_section = true;
            continue;
        }
        if in_section && line.starts_with('-') {
            continue;
        }
        if line.starts_with('#') {
            in_section = false;
        }
        kept.push(line.to_string());
    }
    kept
}
