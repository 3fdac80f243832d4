mod support;

use std::fs;

use chrono::{Local, TimeZone};
use support::{unowned_lines, TestVault};
use taskvault::config::DashboardConfig;
use taskvault::dashboard::{parse_status_counts, DashboardCounts, SyncOutcome};

fn counts(active: usize, completed: usize) -> DashboardCounts {
    DashboardCounts { active, completed }
}

const OPERATOR_DOC: &str = "# Dashboard\n\
intro paragraph\n\
\n\
## Status Overview\n\
- **Active Tasks**: 9\n\
- **Completed Tasks**: 9\n\
- **System Status**: Idle\n\
## Notes\n\
- remember the milk\n\
free text\n";

#[test]
fn stale_lines_replaced_by_exactly_four_fields() {
    let vault = TestVault::init();
    let path = vault.write_file("Dashboard.md", OPERATOR_DOC).unwrap();

    let report = vault.dashboard().synchronize(counts(1, 4)).unwrap();
    assert_eq!(report.outcome, SyncOutcome::Updated);

    let updated = fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = updated.lines().collect();
    let heading = lines
        .iter()
        .position(|line| *line == "## Status Overview")
        .unwrap();
    assert_eq!(
        &lines[heading + 1..heading + 6],
        &[
            "- **Active Tasks**: 1",
            "- **Completed Tasks**: 4",
            "- **System Status**: Active",
            "- **Last Updated**: 2026-10-14 09:30:00",
            "## Notes",
        ]
    );
    assert!(updated.ends_with("## Notes\n- remember the milk\nfree text\n"));
    assert!(updated.starts_with("# Dashboard\nintro paragraph\n\n## Status Overview\n"));
}

#[test]
fn repeated_sync_preserves_operator_content() {
    let vault = TestVault::init();
    vault.write_file("Dashboard.md", OPERATOR_DOC).unwrap();
    let dashboard = vault.dashboard();

    dashboard.synchronize(counts(2, 3)).unwrap();
    let once = vault.read_dashboard();
    dashboard.synchronize(counts(2, 3)).unwrap();
    let twice = vault.read_dashboard();

    assert_eq!(unowned_lines(&once), unowned_lines(OPERATOR_DOC));
    assert_eq!(unowned_lines(&twice), unowned_lines(OPERATOR_DOC));
    assert_eq!(once, twice);
}

#[test]
fn repeated_sync_differs_only_in_timestamp() {
    let vault = TestVault::init();
    vault.write_file("Dashboard.md", OPERATOR_DOC).unwrap();
    let dashboard = vault.dashboard();

    dashboard.synchronize(counts(0, 6)).unwrap();
    let first = vault.read_dashboard();
    vault
        .clock
        .set(Local.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap());
    dashboard.synchronize(counts(0, 6)).unwrap();
    let second = vault.read_dashboard();

    let differing: Vec<(&str, &str)> = first
        .lines()
        .zip(second.lines())
        .filter(|(a, b)| a != b)
        .collect();
    assert_eq!(
        differing,
        vec![(
            "- **Last Updated**: 2026-10-14 09:30:00",
            "- **Last Updated**: 2026-10-14 10:00:00"
        )]
    );
}

#[test]
fn missing_document_is_created_with_section() {
    let vault = TestVault::init();

    let report = vault.dashboard().synchronize(counts(3, 7)).unwrap();
    assert_eq!(report.outcome, SyncOutcome::Created);

    let created = vault.read_dashboard();
    assert!(created.starts_with("## Status Overview\n"));
    assert_eq!(created.lines().count(), 5);
    assert_eq!(parse_status_counts(&created), Some(counts(3, 7)));
}

#[test]
fn document_without_heading_gets_section_appended() {
    let vault = TestVault::init();
    vault
        .write_file("Dashboard.md", "# Dashboard\n## Notes\nkeep\n")
        .unwrap();

    let report = vault.dashboard().synchronize(counts(1, 1)).unwrap();
    assert_eq!(report.outcome, SyncOutcome::Appended);

    let updated = vault.read_dashboard();
    assert!(updated.starts_with("# Dashboard\n## Notes\nkeep\n\n## Status Overview\n"));
    assert_eq!(parse_status_counts(&updated), Some(counts(1, 1)));

    let report = vault.dashboard().synchronize(counts(1, 1)).unwrap();
    assert_eq!(report.outcome, SyncOutcome::Updated);
    assert_eq!(vault.read_dashboard(), updated);
}

#[test]
fn document_without_heading_untouched_when_append_disabled() {
    let vault = TestVault::init();
    let original = "# Dashboard\n## Notes\nkeep";
    vault.write_file("Dashboard.md", original).unwrap();

    let dashboard = vault.dashboard_with(&DashboardConfig {
        append_missing_section: false,
    });
    let report = dashboard.synchronize(counts(5, 5)).unwrap();

    assert_eq!(report.outcome, SyncOutcome::SectionMissing);
    assert_eq!(vault.read_dashboard(), original);
}

#[test]
fn crlf_document_keeps_line_endings() {
    let vault = TestVault::init();
    let original = "# Dashboard\r\n## Status Overview\r\n- stale\r\n## Notes\r\nkeep\r\n";
    vault.write_file("Dashboard.md", original).unwrap();

    vault.dashboard().synchronize(counts(0, 1)).unwrap();
    let updated = vault.read_dashboard();

    assert!(updated.contains("- **Completed Tasks**: 1\r\n"));
    assert!(updated.ends_with("## Notes\r\nkeep\r\n"));
    assert!(!updated.replace("\r\n", "").contains('\n'));
}

#[test]
fn sync_leaves_no_temp_files_behind() {
    let vault = TestVault::init();
    vault.write_file("Dashboard.md", OPERATOR_DOC).unwrap();
    vault.dashboard().synchronize(counts(0, 0)).unwrap();

    let stray: Vec<String> = fs::read_dir(vault.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(stray.is_empty(), "{stray:?}");
}
