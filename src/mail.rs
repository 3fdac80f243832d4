//! Mail sources feeding the cycle.
//!
//! A source hands back already-decoded messages; provider auth and MIME
//! decoding happen before anything reaches this crate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

/// One decoded message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub sender: String,
    /// Plain-text body
    #[serde(default)]
    pub body: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Anything that can list recent messages
pub trait MailSource: Send {
    /// Up to `max_results` recent messages, oldest first.
    ///
    /// Failures surface as `Error::SourceUnavailable`.
    fn list_recent(&mut self, max_results: usize) -> Result<Vec<MailMessage>>;

    /// Short label for logs and reports
    fn name(&self) -> &str;
}

/// Fixed sample messages for smoke runs
pub struct DemoMailSource {
    clock: Arc<dyn Clock>,
}

impl DemoMailSource {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for DemoMailSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MailSource for DemoMailSource {
    fn list_recent(&mut self, max_results: usize) -> Result<Vec<MailMessage>> {
        let timestamp = self.clock.now().with_timezone(&Utc);
        let samples = [
            (
                "demo-1",
                "Quarterly Budget Review Required",
                "boss@company.com",
                "Please review and approve the quarterly budget by end of week.",
            ),
            (
                "demo-2",
                "Team Meeting Tomorrow",
                "hr@company.com",
                "Reminder about the team meeting tomorrow at 10 AM in conference room.",
            ),
            (
                "demo-3",
                "Project Deadline Update",
                "manager@company.com",
                "The project deadline has been moved to next Friday. Please adjust your plans accordingly.",
            ),
        ];

        Ok(samples
            .into_iter()
            .take(max_results)
            .map(|(id, subject, sender, body)| MailMessage {
                id: id.to_string(),
                subject: subject.to_string(),
                sender: sender.to_string(),
                body: body.to_string(),
                timestamp,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "demo"
    }
}

/// Messages read from a spool file.
///
/// The file holds either a JSON array of messages or one message per line
/// (JSON Lines). It is re-read on every call.
#[derive(Debug, Clone)]
pub struct SpoolMailSource {
    path: PathBuf,
}

impl SpoolMailSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MailSource for SpoolMailSource {
    fn list_recent(&mut self, max_results: usize) -> Result<Vec<MailMessage>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::SourceUnavailable(format!(
                    "spool file not found: {}",
                    self.path.display()
                )));
            }
            Err(err) => {
                return Err(Error::SourceUnavailable(format!(
                    "cannot read spool {}: {err}",
                    self.path.display()
                )));
            }
        };

        let mut messages = parse_spool(&content).map_err(|err| {
            Error::SourceUnavailable(format!("invalid spool {}: {err}", self.path.display()))
        })?;
        messages.truncate(max_results);
        tracing::debug!(path = %self.path.display(), count = messages.len(), "spool read");
        Ok(messages)
    }

    fn name(&self) -> &str {
        "spool"
    }
}

fn parse_spool(content: &str) -> std::result::Result<Vec<MailMessage>, serde_json::Error> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed);
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str)
        .collect()
}
