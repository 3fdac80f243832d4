//! Dashboard synchronization.
//!
//! The dashboard is an operator-edited Markdown file with one
//! machine-owned section:
//!
//! ```text
//! ## Status Overview
//! - **Active Tasks**: 0
//! - **Completed Tasks**: 6
//! - **System Status**: Active
//! - **Last Updated**: 2026-10-14 09:30:00
//! ```
//!
//! The section runs from the heading to the next line starting with `#`.
//! Inside it, list items are regenerated and anything else is kept.
//! Everything outside it is copied byte-for-byte, line endings included.
//!
//! Writes go through a temp file and a rename, so an interrupted sync
//! leaves the previous dashboard in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::lock::write_atomic_str;

/// Heading of the machine-owned section, matched after trimming
pub const STATUS_HEADING: &str = "## Status Overview";

const SYSTEM_STATUS: &str = "Active";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Counts published in the status section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub active: usize,
    pub completed: usize,
}

/// What a synchronization did to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// An existing status section was regenerated
    Updated,
    /// No document existed; one holding only the section was written
    Created,
    /// The document had no status section; one was appended
    Appended,
    /// The document had no status section and appending is disabled
    SectionMissing,
}

/// Result of one synchronization
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub path: PathBuf,
    pub outcome: SyncOutcome,
    pub counts: DashboardCounts,
    pub last_updated: String,
}

#[derive(Clone)]
pub struct Dashboard {
    path: PathBuf,
    append_missing_section: bool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("path", &self.path)
            .field("append_missing_section", &self.append_missing_section)
            .finish()
    }
}

impl Dashboard {
    pub fn new(path: impl Into<PathBuf>, config: &DashboardConfig) -> Self {
        Self {
            path: path.into(),
            append_missing_section: config.append_missing_section,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for the Last Updated field
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the status section with `counts` and the current time.
    pub fn synchronize(&self, counts: DashboardCounts) -> Result<SyncReport> {
        self.synchronize_at(counts, self.clock.now())
    }

    /// Rewrite the status section with `counts`, stamped with `now`.
    pub fn synchronize_at(&self, counts: DashboardCounts, now: DateTime<Local>) -> Result<SyncReport> {
        let last_updated = now.format(TIMESTAMP_FORMAT).to_string();
        let existing = match fs::read_to_string(&self.path) {
            Ok(content) => Some(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        let (content, outcome) = match existing {
            None => (render_section(counts, &last_updated, "\n"), SyncOutcome::Created),
            Some(document) => match rewrite_status_section(&document, counts, &last_updated) {
                Some(updated) => (updated, SyncOutcome::Updated),
                None if self.append_missing_section => (
                    append_section(&document, counts, &last_updated),
                    SyncOutcome::Appended,
                ),
                None => {
                    tracing::warn!(
                        path = %self.path.display(),
                        "dashboard has no status section; left untouched"
                    );
                    return Ok(SyncReport {
                        path: self.path.clone(),
                        outcome: SyncOutcome::SectionMissing,
                        counts,
                        last_updated,
                    });
                }
            },
        };

        write_atomic_str(&self.path, &content)?;
        tracing::debug!(
            path = %self.path.display(),
            active = counts.active,
            completed = counts.completed,
            outcome = ?outcome,
            "dashboard synchronized"
        );

        Ok(SyncReport {
            path: self.path.clone(),
            outcome,
            counts,
            last_updated,
        })
    }

    /// Write a starter dashboard if none exists. Returns whether one was
    /// written.
    pub fn init_template(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        let last_updated = self.clock.now().format(TIMESTAMP_FORMAT).to_string();
        let content = format!(
            "# Task Vault Dashboard\n\n{}\n## Recent Activity\n\n## Notes\n",
            render_section(DashboardCounts::default(), &last_updated, "\n")
        );
        write_atomic_str(&self.path, &content)?;
        Ok(true)
    }
}

/// Regenerate the status section of `document`.
///
/// Returns `None` when the document has no status heading.
pub fn rewrite_status_section(
    document: &str,
    counts: DashboardCounts,
    last_updated: &str,
) -> Option<String> {
    let mut out = String::with_capacity(document.len() + 128);
    let mut in_section = false;
    let mut found = false;

    for line in document.split_inclusive('\n') {
        let text = line.trim_end_matches(['\n', '\r']);

        if text.trim() == STATUS_HEADING {
            let eol = if line.ends_with("\r\n") { "\r\n" } else { "\n" };
            out.push_str(text);
            out.push_str(eol);
            out.push_str(&render_fields(counts, last_updated, eol));
            in_section = true;
            found = true;
        } else if in_section && text.starts_with('-') {
            continue;
        } else if in_section && text.starts_with('#') {
            out.push_str(line);
            in_section = false;
        } else {
            out.push_str(line);
        }
    }

    found.then_some(out)
}

fn append_section(document: &str, counts: DashboardCounts, last_updated: &str) -> String {
    let eol = if document.contains("\r\n") { "\r\n" } else { "\n" };
    let mut out = document.to_string();
    if !out.is_empty() {
        if !out.ends_with('\n') {
            out.push_str(eol);
        }
        out.push_str(eol);
    }
    out.push_str(&render_section(counts, last_updated, eol));
    out
}

fn render_section(counts: DashboardCounts, last_updated: &str, eol: &str) -> String {
    format!("{STATUS_HEADING}{eol}{}", render_fields(counts, last_updated, eol))
}

fn render_fields(counts: DashboardCounts, last_updated: &str, eol: &str) -> String {
    format!(
        "- **Active Tasks**: {}{eol}\
         - **Completed Tasks**: {}{eol}\
         - **System Status**: {SYSTEM_STATUS}{eol}\
         - **Last Updated**: {last_updated}{eol}",
        counts.active, counts.completed
    )
}

/// Counts read back from a rendered status section
pub fn parse_status_counts(document: &str) -> Option<DashboardCounts> {
    let mut lines = document.lines().skip_while(|line| line.trim() != STATUS_HEADING);
    lines.next()?;

    let mut active = None;
    let mut completed = None;
    for line in lines.take_while(|line| !line.starts_with('#')) {
        if let Some(value) = line.trim().strip_prefix("- **Active Tasks**:") {
            active = value.trim().parse().ok();
        } else if let Some(value) = line.trim().strip_prefix("- **Completed Tasks**:") {
            completed = value.trim().parse().ok();
        }
    }

    Some(DashboardCounts {
        active: active?,
        completed: completed?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const STAMP: &str = "2026-10-14 09:30:00";

    fn counts(active: usize, completed: usize) -> DashboardCounts {
        DashboardCounts { active, completed }
    }

    #[test]
    fn rewrite_replaces_stale_fields_only() {
        let doc = "# Dash\n\n## Status Overview\n- old 1\n- old 2\n- old 3\n## Notes\nkeep me\n";
        let out = rewrite_status_section(doc, counts(1, 2), STAMP).unwrap();
        assert_eq!(
            out,
            "# Dash\n\n## Status Overview\n\
             - **Active Tasks**: 1\n\
             - **Completed Tasks**: 2\n\
             - **System Status**: Active\n\
             - **Last Updated**: 2026-10-14 09:30:00\n\
             ## Notes\nkeep me\n"
        );
    }

    #[test]
    fn rewrite_keeps_list_items_after_section() {
        let doc = "## Status Overview\n- stale\n\n### Details\n- operator item\n";
        let out = rewrite_status_section(doc, counts(0, 0), STAMP).unwrap();
        assert!(out.ends_with("\n\n### Details\n- operator item\n"));
        assert!(!out.contains("- stale"));
    }

    #[test]
    fn rewrite_matches_trimmed_heading() {
        let doc = "  ## Status Overview  \n- stale\n";
        let out = rewrite_status_section(doc, counts(3, 4), STAMP).unwrap();
        assert!(out.starts_with("  ## Status Overview  \n- **Active Tasks**: 3\n"));
    }

    #[test]
    fn rewrite_without_heading_is_none() {
        assert!(rewrite_status_section("# Dash\n## Notes\n", counts(0, 0), STAMP).is_none());
        assert!(rewrite_status_section("", counts(0, 0), STAMP).is_none());
    }

    #[test]
    fn rewrite_preserves_crlf() {
        let doc = "# Dash\r\n## Status Overview\r\n- stale\r\n## Notes\r\ntext\r\n";
        let out = rewrite_status_section(doc, counts(1, 1), STAMP).unwrap();
        assert!(out.starts_with("# Dash\r\n## Status Overview\r\n- **Active Tasks**: 1\r\n"));
        assert!(out.ends_with("## Notes\r\ntext\r\n"));
    }

    #[test]
    fn rewrite_handles_heading_without_trailing_newline() {
        let out = rewrite_status_section("# Dash\n## Status Overview", counts(1, 0), STAMP)
            .unwrap();
        assert!(out.starts_with("# Dash\n## Status Overview\n- **Active Tasks**: 1\n"));
    }

    #[test]
    fn append_separates_with_blank_line() {
        let out = append_section("# Dash\nprose", counts(2, 5), STAMP);
        assert!(out.starts_with("# Dash\nprose\n\n## Status Overview\n"));
        assert_eq!(parse_status_counts(&out), Some(counts(2, 5)));
    }

    #[test]
    fn parse_reads_rendered_section() {
        let rendered = render_section(counts(7, 9), STAMP, "\n");
        assert_eq!(parse_status_counts(&rendered), Some(counts(7, 9)));
        assert_eq!(parse_status_counts("# nothing here\n"), None);
    }

    #[test]
    fn init_template_is_written_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Dashboard.md");
        let clock = Arc::new(crate::clock::ManualClock::new(
            Local.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap(),
        ));
        let dashboard = Dashboard::new(&path, &DashboardConfig::default()).with_clock(clock);

        assert!(dashboard.init_template().unwrap());
        let first = fs::read_to_string(&path).unwrap();
        assert!(first.contains("- **Last Updated**: 2026-10-14 09:30:00\n"));
        assert_eq!(parse_status_counts(&first), Some(counts(0, 0)));

        fs::write(&path, "operator rewrite\n").unwrap();
        assert!(!dashboard.init_template().unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "operator rewrite\n");
    }
}
