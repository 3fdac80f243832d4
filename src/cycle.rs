//! Cycle controller.
//!
//! One cycle: fetch messages, then for each message create a Note, plan
//! it, create the Plan, and move both to `Done`. The dashboard is
//! synchronized once at the end. A failing message is recorded in the
//! report and the cycle moves on to the next one.
//!
//! The controller is the single writer of the vault. Nothing here takes
//! a lock; callers that may race another controller hold a
//! [`VaultLock`](crate::lock::VaultLock) for the controller's lifetime.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use ulid::Ulid;
use uuid::Uuid;

use crate::artifact::{self, ArtifactDraft, ArtifactKind};
use crate::config::CycleConfig;
use crate::dashboard::{Dashboard, DashboardCounts, SyncReport};
use crate::error::{Error, Result};
use crate::events::{Event, EventKind, EventSink};
use crate::mail::{MailMessage, MailSource};
use crate::planner::{PlanRequest, Planner};
use crate::store::{ArtifactHandle, StageCounts, TaskStore};

const ACTION_REQUIRED: &str = "- [ ] Review and prioritize\n\
                               - [ ] Create action plan if needed\n\
                               - [ ] Process and move to Done";
const PRIORITY: &str = "- [ ] High\n- [ ] Medium\n- [ ] Low";

/// Step at which a message stopped being processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPhase {
    CreateNote,
    ReadNote,
    DeriveTitle,
    Plan,
    CreatePlan,
    AdvanceNote,
    AdvancePlan,
}

impl ItemPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemPhase::CreateNote => "create_note",
            ItemPhase::ReadNote => "read_note",
            ItemPhase::DeriveTitle => "derive_title",
            ItemPhase::Plan => "plan",
            ItemPhase::CreatePlan => "create_plan",
            ItemPhase::AdvanceNote => "advance_note",
            ItemPhase::AdvancePlan => "advance_plan",
        }
    }
}

/// What happened to one fetched message
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Completed {
        message_id: String,
        subject: String,
        task_id: String,
        note: String,
        plan: String,
    },
    Failed {
        message_id: String,
        subject: String,
        phase: ItemPhase,
        kind: &'static str,
        error: String,
    },
}

impl ItemOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ItemOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: String,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched: usize,
    pub items: Vec<ItemOutcome>,
    pub counts: StageCounts,
    pub dashboard: SyncReport,
}

impl CycleReport {
    pub fn completed(&self) -> usize {
        self.items.iter().filter(|item| item.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.completed()
    }
}

/// Timing of the continuous monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Sleep after a successful cycle
    pub interval: Duration,
    /// Sleep after a failed cycle
    pub retry_backoff: Duration,
    /// Stop after this many cycles
    pub max_cycles: Option<u64>,
}

impl Schedule {
    pub fn from_config(config: &CycleConfig) -> Result<Self> {
        let minutes = |field: &str, mins: u64| {
            duration_from_minutes(mins)
                .ok_or_else(|| Error::InvalidConfig(format!("cycle.{field} is too large: {mins}")))
        };
        Ok(Self {
            interval: minutes("interval_mins", config.interval_mins)?,
            retry_backoff: minutes("retry_mins", config.retry_mins)?,
            max_cycles: None,
        })
    }
}

/// `mins` as a `Duration`, or `None` if the seconds overflow `u64`
pub fn duration_from_minutes(mins: u64) -> Option<Duration> {
    mins.checked_mul(60).map(Duration::from_secs)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorReport {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub items_completed: usize,
    pub items_failed: usize,
    pub stopped_by_signal: bool,
}

struct ItemFailure {
    phase: ItemPhase,
    error: Error,
}

fn failed_at(phase: ItemPhase) -> impl FnOnce(Error) -> ItemFailure {
    move |error| ItemFailure { phase, error }
}

pub struct CycleController {
    store: TaskStore,
    dashboard: Dashboard,
    source: Box<dyn MailSource>,
    planner: Box<dyn Planner>,
    max_results: usize,
    events: Option<EventSink>,
}

impl CycleController {
    pub fn new(
        store: TaskStore,
        dashboard: Dashboard,
        source: Box<dyn MailSource>,
        planner: Box<dyn Planner>,
        config: &CycleConfig,
    ) -> Self {
        Self {
            store,
            dashboard,
            source,
            planner,
            max_results: config.max_results,
            events: None,
        }
    }

    pub fn with_events(mut self, sink: EventSink) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Run one full cycle.
    ///
    /// Only a source failure or a dashboard failure (after one retry)
    /// fails the cycle; per-message errors land in the report.
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        let cycle_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        tracing::info!(
            cycle_id = %cycle_id,
            source = self.source.name(),
            planner = self.planner.name(),
            "cycle started"
        );

        let messages = self.source.list_recent(self.max_results)?;
        tracing::info!(cycle_id = %cycle_id, count = messages.len(), "messages fetched");

        let mut items = Vec::with_capacity(messages.len());
        for message in &messages {
            let outcome = match self.process_message(&cycle_id, message) {
                Ok(outcome) => outcome,
                Err(failure) => self.record_failure(&cycle_id, message, failure),
            };
            items.push(outcome);
        }

        let dashboard = sync_dashboard(&self.store, &self.dashboard)?;
        self.emit(EventKind::DashboardSynced, &cycle_id, &dashboard);
        let counts = self.store.counts()?;

        let report = CycleReport {
            cycle_id: cycle_id.clone(),
            source: self.source.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            fetched: messages.len(),
            items,
            counts,
            dashboard,
        };
        tracing::info!(
            cycle_id = %cycle_id,
            completed = report.completed(),
            failed = report.failed(),
            active = counts.needs_action,
            done = counts.done,
            "cycle finished"
        );
        self.emit(
            EventKind::CycleCompleted,
            &cycle_id,
            serde_json::json!({
                "fetched": report.fetched,
                "completed": report.completed(),
                "failed": report.failed(),
            }),
        );
        Ok(report)
    }

    /// Run cycles until `shutdown` resolves or `max_cycles` is reached.
    ///
    /// Cycle work is synchronous; `shutdown` is only raced against the
    /// sleep between cycles, so no artifact write is ever cut short.
    pub async fn monitor<F>(&mut self, schedule: Schedule, shutdown: F) -> MonitorReport
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut report = MonitorReport::default();

        loop {
            let delay = match self.run_cycle() {
                Ok(cycle) => {
                    report.items_completed += cycle.completed();
                    report.items_failed += cycle.failed();
                    schedule.interval
                }
                Err(err) => {
                    report.failed_cycles += 1;
                    tracing::warn!(
                        error = %err,
                        retry_in_secs = schedule.retry_backoff.as_secs(),
                        "cycle failed"
                    );
                    schedule.retry_backoff
                }
            };
            report.cycles += 1;

            if schedule.max_cycles.is_some_and(|max| report.cycles >= max) {
                break;
            }

            tracing::debug!(sleep_secs = delay.as_secs(), "waiting for next cycle");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => {
                    tracing::info!(cycles = report.cycles, "monitor stopped");
                    report.stopped_by_signal = true;
                    break;
                }
            }
        }

        report
    }

    fn process_message(
        &mut self,
        cycle_id: &str,
        message: &MailMessage,
    ) -> std::result::Result<ItemOutcome, ItemFailure> {
        let task_id = Ulid::new().to_string();

        let note = self
            .store
            .create_artifact(&note_draft(&task_id, message))
            .map_err(failed_at(ItemPhase::CreateNote))?;
        self.emit_artifact(EventKind::ArtifactCreated, cycle_id, &task_id, &note);

        let content = self.store.read(&note).map_err(failed_at(ItemPhase::ReadNote))?;
        let title = artifact::derive_title(&content).map_err(failed_at(ItemPhase::DeriveTitle))?;

        let request = PlanRequest {
            task_id: task_id.clone(),
            title,
            source_text: content,
        };
        let document = self.planner.plan(&request).map_err(failed_at(ItemPhase::Plan))?;
        let plan_draft = ArtifactDraft::from_document(ArtifactKind::Plan, &task_id, &document)
            .map_err(failed_at(ItemPhase::Plan))?
            .with_source(&message.id);

        let plan = self
            .store
            .create_artifact(&plan_draft)
            .map_err(failed_at(ItemPhase::CreatePlan))?;
        self.emit_artifact(EventKind::ArtifactCreated, cycle_id, &task_id, &plan);

        let note = self
            .store
            .advance_to_terminal(&note)
            .map_err(failed_at(ItemPhase::AdvanceNote))?;
        self.emit_artifact(EventKind::ArtifactAdvanced, cycle_id, &task_id, &note);

        let plan = self
            .store
            .advance_to_terminal(&plan)
            .map_err(failed_at(ItemPhase::AdvancePlan))?;
        self.emit_artifact(EventKind::ArtifactAdvanced, cycle_id, &task_id, &plan);

        tracing::debug!(task_id = %task_id, note = %note.name, plan = %plan.name, "task completed");
        Ok(ItemOutcome::Completed {
            message_id: message.id.clone(),
            subject: message.subject.clone(),
            task_id,
            note: note.name,
            plan: plan.name,
        })
    }

    fn record_failure(
        &mut self,
        cycle_id: &str,
        message: &MailMessage,
        failure: ItemFailure,
    ) -> ItemOutcome {
        let ItemFailure { phase, error } = failure;
        if matches!(error, Error::NamingCollision { .. }) {
            tracing::error!(
                message_id = %message.id,
                phase = ?phase,
                error = %error,
                "artifact naming exhausted"
            );
        } else {
            tracing::warn!(
                message_id = %message.id,
                phase = ?phase,
                error = %error,
                "message skipped"
            );
        }

        let outcome = ItemOutcome::Failed {
            message_id: message.id.clone(),
            subject: message.subject.clone(),
            phase,
            kind: error.kind(),
            error: error.to_string(),
        };
        self.emit(EventKind::ItemFailed, cycle_id, &outcome);
        outcome
    }

    fn emit_artifact(
        &mut self,
        kind: EventKind,
        cycle_id: &str,
        task_id: &str,
        handle: &ArtifactHandle,
    ) {
        self.emit(
            kind,
            cycle_id,
            serde_json::json!({
                "task_id": task_id,
                "name": handle.name,
                "stage": handle.stage,
            }),
        );
    }

    fn emit<T: Serialize>(&mut self, kind: EventKind, cycle_id: &str, data: T) {
        let Some(sink) = self.events.as_mut() else {
            return;
        };
        let result = Event::new(kind, Some(cycle_id.to_string()))
            .with_data(data)
            .and_then(|event| sink.emit(&event));
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to emit event");
        }
    }
}

/// Synchronize the dashboard with the store's current counts.
///
/// A failed attempt is retried once, re-reading both the counts and the
/// document.
pub fn sync_dashboard(store: &TaskStore, dashboard: &Dashboard) -> Result<SyncReport> {
    retry_once(
        || sync_once(store, dashboard),
        |err| {
            tracing::warn!(
                error = %err,
                path = %dashboard.path().display(),
                "dashboard sync failed; retrying"
            );
        },
    )
}

/// Run `op`; if it fails, report the error to `on_retry` and run it once
/// more, returning the second result as is.
fn retry_once<T>(mut op: impl FnMut() -> Result<T>, on_retry: impl FnOnce(&Error)) -> Result<T> {
    match op() {
        Ok(value) => Ok(value),
        Err(err) => {
            on_retry(&err);
            op()
        }
    }
}

fn sync_once(store: &TaskStore, dashboard: &Dashboard) -> Result<SyncReport> {
    let counts = store.counts()?;
    dashboard.synchronize(DashboardCounts {
        active: counts.needs_action,
        completed: counts.done,
    })
}

/// Note artifact for a fetched message
pub fn note_draft(task_id: &str, message: &MailMessage) -> ArtifactDraft {
    let subject = message.subject.split_whitespace().collect::<Vec<_>>().join(" ");
    ArtifactDraft::new(ArtifactKind::Note, task_id, subject)
        .with_section("Sender", message.sender.trim())
        .with_section(
            "Date",
            message.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
        .with_section("Content", message.body.trim())
        .with_section("Action Required", ACTION_REQUIRED)
        .with_section("Priority", PRIORITY)
        .with_source(&message.id)
}
