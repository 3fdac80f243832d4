//! Task artifacts: kinds, Markdown rendering and parsing, file naming.
//!
//! An artifact is a Markdown document whose first line is a level-one
//! heading tagged with its kind:
//!
//! ```text
//! # Email Note: Quarterly Budget Review
//!
//! ## Sender
//! boss@company.com
//! ...
//! ## Metadata
//! - **Task ID**: 01JA0Q9Z6S3W4RZJ8M9K5T2V7X
//! - **Kind**: note
//! - **Created**: 2026-10-14T09:30:00.123+02:00
//! ```
//!
//! The task id links a Plan to the Note it was derived from.

use std::fmt;

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File extension of every artifact written by the store
pub const ARTIFACT_EXTENSION: &str = "md";

const NOTE_HEADING_TAG: &str = "Email Note:";
const PLAN_HEADING_TAG: &str = "Action Plan:";
const METADATA_HEADING: &str = "Metadata";
const TASK_ID_FIELD: &str = "- **Task ID**:";

/// Kind of task artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Note,
    Plan,
}

impl ArtifactKind {
    /// Leading component of the file name
    pub fn file_prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Note => "Note",
            ArtifactKind::Plan => "Plan",
        }
    }

    /// Tag that follows `# ` on the first line
    pub fn heading_tag(&self) -> &'static str {
        match self {
            ArtifactKind::Note => NOTE_HEADING_TAG,
            ArtifactKind::Plan => PLAN_HEADING_TAG,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Note => "note",
            ArtifactKind::Plan => "plan",
        }
    }

    /// Kind implied by an artifact file name, if any
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (prefix, _) = name.split_once('_')?;
        match prefix {
            "Note" => Some(ArtifactKind::Note),
            "Plan" => Some(ArtifactKind::Plan),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `## Heading` block of an artifact body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

impl Section {
    pub fn new(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: body.into(),
        }
    }
}

/// Content of an artifact before it has a name
#[derive(Debug, Clone)]
pub struct ArtifactDraft {
    pub kind: ArtifactKind,
    pub task_id: String,
    pub title: String,
    pub body: String,
    pub sections: Vec<Section>,
    pub source_id: Option<String>,
}

impl ArtifactDraft {
    pub fn new(kind: ArtifactKind, task_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: task_id.into(),
            title: title.into(),
            body: String::new(),
            sections: Vec::new(),
            source_id: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_section(mut self, heading: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push(Section::new(heading, body));
        self
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Build a draft from a complete rendered document (planner output).
    ///
    /// The first line must be a `# ` heading. A kind tag on it is dropped so
    /// the rendered artifact carries exactly one.
    pub fn from_document(
        kind: ArtifactKind,
        task_id: impl Into<String>,
        document: &str,
    ) -> Result<Self> {
        let mut lines = document.lines();
        let first = lines
            .next()
            .ok_or_else(|| Error::MalformedArtifact("document is empty".to_string()))?;
        let heading = first
            .trim_end()
            .strip_prefix("# ")
            .ok_or_else(|| {
                Error::MalformedArtifact(format!("first line is not a heading: '{first}'"))
            })?
            .trim();
        let title = heading
            .strip_prefix(kind.heading_tag())
            .unwrap_or(heading)
            .trim();
        if title.is_empty() {
            return Err(Error::MalformedArtifact("heading has no title".to_string()));
        }

        let body = lines.collect::<Vec<_>>().join("\n");
        Ok(Self::new(kind, task_id, title).with_body(body.trim()))
    }

    /// Render the full Markdown document.
    pub fn render(&self, created_at: DateTime<Local>) -> String {
        let mut out = format!("# {} {}\n\n", self.kind.heading_tag(), self.title.trim());

        let body = self.body.trim_end();
        if !body.is_empty() {
            out.push_str(body);
            out.push_str("\n\n");
        }

        for section in &self.sections {
            out.push_str("## ");
            out.push_str(section.heading.trim());
            out.push('\n');
            out.push_str(section.body.trim_end());
            out.push_str("\n\n");
        }

        out.push_str(&format!("## {METADATA_HEADING}\n"));
        out.push_str(&format!("{TASK_ID_FIELD} {}\n", self.task_id));
        out.push_str(&format!("- **Kind**: {}\n", self.kind));
        out.push_str(&format!(
            "- **Created**: {}\n",
            created_at.to_rfc3339_opts(SecondsFormat::Millis, false)
        ));
        if let Some(source) = &self.source_id {
            out.push_str(&format!("- **Source**: {source}\n"));
        }
        out
    }
}

/// Recover the task title from a Note's content.
///
/// The first line must read `# Email Note: <title>` with a non-empty title.
pub fn derive_title(content: &str) -> Result<String> {
    heading_title(ArtifactKind::Note, content)
}

/// Title on the first line of an artifact of the given kind
pub fn heading_title(kind: ArtifactKind, content: &str) -> Result<String> {
    let first = content
        .lines()
        .next()
        .ok_or_else(|| Error::MalformedArtifact("artifact is empty".to_string()))?;
    let first = first.trim_end();

    let rest = first
        .strip_prefix("# ")
        .and_then(|heading| heading.trim_start().strip_prefix(kind.heading_tag()))
        .ok_or_else(|| {
            Error::MalformedArtifact(format!(
                "expected '# {} <title>', found '{first}'",
                kind.heading_tag()
            ))
        })?;

    let title = rest.trim();
    if title.is_empty() {
        return Err(Error::MalformedArtifact(format!(
            "{} heading has no title",
            kind.as_str()
        )));
    }
    Ok(title.to_string())
}

/// Task id recorded in an artifact's metadata section.
///
/// Metadata is always rendered last, so only the final `## Metadata`
/// section is read. Lookalike lines in the body or in sections copied from
/// a message are ignored.
pub fn parse_task_id(content: &str) -> Option<String> {
    let heading = format!("## {METADATA_HEADING}");
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.iter().rposition(|line| line.trim() == heading)?;

    lines[start + 1..]
        .iter()
        .take_while(|line| !line.starts_with('#'))
        .filter_map(|line| line.trim().strip_prefix(TASK_ID_FIELD))
        .map(str::trim)
        .find(|id| !id.is_empty())
        .map(str::to_string)
}

/// `{Kind}_{YYYYMMDD}_{HHMMSS}` for a creation time
pub fn base_name(kind: ArtifactKind, at: DateTime<Local>) -> String {
    format!("{}_{}", kind.file_prefix(), at.format("%Y%m%d_%H%M%S"))
}

/// File name for a base and disambiguator; `0` means no suffix
pub fn file_name(base: &str, disambiguator: u32) -> String {
    if disambiguator == 0 {
        format!("{base}.{ARTIFACT_EXTENSION}")
    } else {
        format!("{base}_{disambiguator}.{ARTIFACT_EXTENSION}")
    }
}
