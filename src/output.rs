//! Command output.
//!
//! Every command hands back a report that implements [`Render`]. In human
//! mode the report's [`Summary`] goes to stdout; with `--json` the report
//! itself is serialized under `data` in a `taskvault.v1` envelope, together
//! with the summary's warnings and next steps. Errors use the same envelope
//! with an `error` object instead of `data`.

use std::fmt;

use serde::Serialize;

use crate::cycle::{CycleReport, ItemOutcome, MonitorReport};
use crate::dashboard::{SyncOutcome, SyncReport};
use crate::error::{Error, JsonError, Result};

pub const SCHEMA_VERSION: &str = "taskvault.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// A command result with a human-readable view
pub trait Render: Serialize {
    fn summary(&self) -> Summary;
}

/// Human-readable view of a report: a header line, `key: value` fields,
/// free-form lines, then warnings and next steps.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    header: String,
    fields: Vec<(String, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl Summary {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    pub fn field(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    pub fn warn(&mut self, warning: impl Into<String>) -> &mut Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn next_step(&mut self, step: impl Into<String>) -> &mut Self {
        self.next_steps.push(step.into());
        self
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn next_steps(&self) -> &[String] {
        &self.next_steps
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;

        if !self.fields.is_empty() {
            let width = self.fields.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
            writeln!(f)?;
            for (key, value) in &self.fields {
                write!(f, "\n  {key:<width$}  {value}")?;
            }
        }
        write_block(f, None, &self.lines)?;
        write_block(f, Some("warning"), &self.warnings)?;
        write_block(f, Some("next"), &self.next_steps)
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, label: Option<&str>, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f)?;
    for item in items {
        match label {
            Some(label) => write!(f, "\n{label}: {item}")?,
            None => write!(f, "\n  {item}")?,
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

#[derive(Serialize)]
struct Envelope<'a, B: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: Status,
    #[serde(flatten)]
    body: B,
    #[serde(skip_serializing_if = "is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    next_steps: &'a [String],
}

fn is_empty(items: &&[String]) -> bool {
    items.is_empty()
}

#[derive(Serialize)]
struct Data<'a, T: Serialize> {
    data: &'a T,
}

#[derive(Serialize)]
struct Failure {
    error: JsonError,
}

/// JSON envelope for a successful command
pub fn success_json<R: Render>(command: &str, report: &R) -> Result<String> {
    let summary = report.summary();
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        status: Status::Success,
        body: Data { data: report },
        warnings: summary.warnings(),
        next_steps: summary.next_steps(),
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// JSON envelope for a failed command
pub fn error_json(command: &str, err: &Error) -> Result<String> {
    let next_steps: Vec<String> = error_hint(err).map(str::to_string).into_iter().collect();
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        status: Status::Error,
        body: Failure {
            error: JsonError::from(err),
        },
        warnings: &[],
        next_steps: &next_steps,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

pub fn emit<R: Render>(options: OutputOptions, command: &str, report: &R) -> Result<()> {
    if options.json {
        println!("{}", success_json(command, report)?);
    } else if !options.quiet {
        println!("{}", report.summary());
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    if json {
        println!("{}", error_json(command, err)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = error_hint(err) {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

fn error_hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::LockFailed(_) => Some("wait for the running controller to exit"),
        Error::InvalidConfig(_) => Some("fix .taskvault.toml then retry"),
        Error::SourceUnavailable(_) => Some("check the spool file or run with --source demo"),
        Error::ArtifactNotFound(_) => Some("taskvault list"),
        Error::DestinationConflict(_) => Some("rename or remove the conflicting file in Done"),
        Error::InvalidTransition { .. } => Some("taskvault list --stage needs-action"),
        _ => None,
    }
}

pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

/// First positional argument, skipping global flags and their values
pub fn command_name_from<I>(args: I) -> String
where
    I: IntoIterator<Item = String>,
{
    const VALUE_FLAGS: [&str; 3] = ["--vault", "--config", "--events"];

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "taskvault".to_string()
}

impl Render for CycleReport {
    fn summary(&self) -> Summary {
        let failed = self.failed();
        let mut summary = Summary::new(if failed == 0 {
            "taskvault run: cycle complete".to_string()
        } else {
            format!("taskvault run: cycle complete with {failed} failed item(s)")
        });
        summary
            .field("source", &self.source)
            .field("fetched", self.fetched)
            .field("completed", self.completed())
            .field("failed", failed)
            .field("active", self.counts.needs_action)
            .field("done", self.counts.done);

        for item in &self.items {
            match item {
                ItemOutcome::Completed {
                    subject, note, plan, ..
                } => {
                    summary.line(format!("{subject}: {note} + {plan}"));
                }
                ItemOutcome::Failed {
                    message_id,
                    phase,
                    error,
                    ..
                } => {
                    summary.warn(format!("{message_id} stopped at {}: {error}", phase.as_str()));
                }
            }
        }
        if failed > 0 {
            summary.next_step("taskvault list --stage needs-action");
        }
        warn_on_missing_section(&mut summary, &self.dashboard);
        summary
    }
}

impl Render for SyncReport {
    fn summary(&self) -> Summary {
        let header = match self.outcome {
            SyncOutcome::Updated => "taskvault sync: dashboard updated",
            SyncOutcome::Created => "taskvault sync: dashboard created",
            SyncOutcome::Appended => "taskvault sync: status section appended",
            SyncOutcome::SectionMissing => "taskvault sync: dashboard left unchanged",
        };
        let mut summary = Summary::new(header);
        summary
            .field("dashboard", self.path.display())
            .field("active", self.counts.active)
            .field("completed", self.counts.completed)
            .field("last updated", &self.last_updated);
        warn_on_missing_section(&mut summary, self);
        summary
    }
}

impl Render for MonitorReport {
    fn summary(&self) -> Summary {
        let mut summary = Summary::new(if self.stopped_by_signal {
            "taskvault watch: interrupted"
        } else {
            "taskvault watch: stopped"
        });
        summary
            .field("cycles", self.cycles)
            .field("failed cycles", self.failed_cycles)
            .field("items completed", self.items_completed)
            .field("items failed", self.items_failed);
        if self.failed_cycles > 0 {
            summary.next_step("RUST_LOG=taskvault=warn taskvault watch");
        }
        summary
    }
}

/// Warn when a sync could not place the status section
pub fn warn_on_missing_section(summary: &mut Summary, report: &SyncReport) {
    if report.outcome == SyncOutcome::SectionMissing {
        summary
            .warn(format!(
                "{} has no '## Status Overview' heading",
                report.path.display()
            ))
            .next_step("add the heading or set dashboard.append_missing_section = true");
    }
}
