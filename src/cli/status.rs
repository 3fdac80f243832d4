//! taskvault status / list command implementation

use std::path::PathBuf;

use crate::cli::VaultContext;
use crate::dashboard::{parse_status_counts, DashboardCounts};
use crate::error::Result;
use crate::output::{emit, OutputOptions, Render, Summary};
use crate::store::StageCounts;
use crate::vault::Stage;

#[derive(serde::Serialize)]
struct StatusReport {
    vault: PathBuf,
    initialized: bool,
    counts: StageCounts,
    /// Counts as last published in the dashboard
    #[serde(skip_serializing_if = "Option::is_none")]
    dashboard: Option<DashboardCounts>,
}

impl Render for StatusReport {
    fn summary(&self) -> Summary {
        let mut summary = Summary::new("taskvault status");
        summary
            .field("vault", self.vault.display())
            .field("inbox", self.counts.inbox)
            .field("needs action", self.counts.needs_action)
            .field("done", self.counts.done);

        if !self.initialized {
            summary.warn("vault is not initialized").next_step("taskvault init");
            return summary;
        }

        let current = DashboardCounts {
            active: self.counts.needs_action,
            completed: self.counts.done,
        };
        match self.dashboard {
            Some(seen) if seen != current => {
                summary
                    .warn(format!(
                        "dashboard shows {} active / {} completed",
                        seen.active, seen.completed
                    ))
                    .next_step("taskvault sync");
            }
            None => {
                summary
                    .warn("dashboard has no status section")
                    .next_step("taskvault sync");
            }
            _ => {}
        }
        summary
    }
}

pub fn run_status(context: VaultContext, output: OutputOptions) -> Result<()> {
    let dashboard = std::fs::read_to_string(context.dashboard.path())
        .ok()
        .and_then(|content| parse_status_counts(&content));

    let report = StatusReport {
        vault: context.vault.root().to_path_buf(),
        initialized: context.vault.is_initialized(),
        counts: context.store.counts()?,
        dashboard,
    };
    emit(output, "status", &report)
}

#[derive(serde::Serialize)]
struct ListReport {
    stage: Stage,
    artifacts: Vec<String>,
}

impl Render for ListReport {
    fn summary(&self) -> Summary {
        let mut summary = Summary::new(format!(
            "taskvault list: {} artifact(s) in {}",
            self.artifacts.len(),
            self.stage
        ));
        for name in &self.artifacts {
            summary.line(name.as_str());
        }
        summary
    }
}

pub fn run_list(context: VaultContext, stage: Stage, output: OutputOptions) -> Result<()> {
    let artifacts = context
        .store
        .list(stage)?
        .into_iter()
        .map(|handle| handle.name)
        .collect();

    emit(output, "list", &ListReport { stage, artifacts })
}
