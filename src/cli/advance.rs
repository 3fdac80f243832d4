//! taskvault advance command implementation
//!
//! Operator-driven move of a single artifact to `Done`, followed by a
//! dashboard sync so the counts stay current.

use crate::cli::VaultContext;
use crate::cycle::sync_dashboard;
use crate::dashboard::SyncReport;
use crate::error::Result;
use crate::events::{Event, EventKind, EventSink};
use crate::lock::VaultLock;
use crate::output::{emit, warn_on_missing_section, OutputOptions, Render, Summary};
use crate::store::ArtifactHandle;

pub struct AdvanceOptions {
    pub context: VaultContext,
    pub name: String,
    pub events: Option<EventSink>,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct AdvanceReport {
    artifact: ArtifactHandle,
    dashboard: SyncReport,
}

impl Render for AdvanceReport {
    fn summary(&self) -> Summary {
        let mut summary = Summary::new(format!(
            "taskvault advance: {} moved to {}",
            self.artifact.name, self.artifact.stage
        ));
        summary
            .field("path", self.artifact.path.display())
            .field("active", self.dashboard.counts.active)
            .field("completed", self.dashboard.counts.completed);
        warn_on_missing_section(&mut summary, &self.dashboard);
        summary
    }
}

pub fn run(options: AdvanceOptions) -> Result<()> {
    let AdvanceOptions {
        context,
        name,
        mut events,
        output,
    } = options;

    context.require_initialized()?;
    let _lock = VaultLock::acquire(context.vault.root())?;

    let handle = context.store.find(&name)?;
    let moved = context.store.advance_to_terminal(&handle)?;
    tracing::info!(name = %moved.name, "artifact advanced by operator");

    if let Some(sink) = events.as_mut() {
        let event = Event::new(EventKind::ArtifactAdvanced, None).with_data(serde_json::json!({
            "name": moved.name,
            "stage": moved.stage,
        }))?;
        sink.emit(&event)?;
    }

    let dashboard = sync_dashboard(&context.store, &context.dashboard)?;

    let report = AdvanceReport {
        artifact: moved,
        dashboard,
    };
    emit(output, "advance", &report)
}
