use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use serde_json::Value;
use taskvault::cycle::{CycleReport, ItemOutcome, ItemPhase};
use taskvault::dashboard::{DashboardCounts, SyncOutcome, SyncReport};
use taskvault::error::Error;
use taskvault::output::{command_name_from, error_json, success_json, Render, Summary};
use taskvault::store::StageCounts;

fn sync_report(outcome: SyncOutcome) -> SyncReport {
    SyncReport {
        path: PathBuf::from("vault/Dashboard.md"),
        outcome,
        counts: DashboardCounts {
            active: 1,
            completed: 2,
        },
        last_updated: "2026-10-14 09:30:00".to_string(),
    }
}

fn cycle_report() -> CycleReport {
    let at = Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap();
    CycleReport {
        cycle_id: "cycle-1".to_string(),
        source: "demo".to_string(),
        started_at: at,
        finished_at: at,
        fetched: 2,
        items: vec![
            ItemOutcome::Completed {
                message_id: "m1".to_string(),
                subject: "Budget Review".to_string(),
                task_id: "01A".to_string(),
                note: "Note_20261014_093000.md".to_string(),
                plan: "Plan_20261014_093000.md".to_string(),
            },
            ItemOutcome::Failed {
                message_id: "m2".to_string(),
                subject: "Offsite".to_string(),
                phase: ItemPhase::Plan,
                kind: "planner_failed",
                error: "planner failed: timeout".to_string(),
            },
        ],
        counts: StageCounts {
            inbox: 0,
            needs_action: 1,
            done: 2,
        },
        dashboard: sync_report(SyncOutcome::Updated),
    }
}

#[test]
fn summary_lists_fields_lines_and_hints() {
    let mut summary = Summary::new("taskvault list: 2 artifact(s) in done");
    summary
        .field("stage", "done")
        .line("Note_20261014_093000.md")
        .warn("dashboard is stale")
        .next_step("taskvault sync");

    let rendered = summary.to_string();
    assert!(rendered.starts_with("taskvault list: 2 artifact(s) in done\n"));
    assert!(rendered.contains("\n  stage  done"));
    assert!(rendered.contains("\n  Note_20261014_093000.md"));
    assert!(rendered.contains("\nwarning: dashboard is stale"));
    assert!(rendered.contains("\nnext: taskvault sync"));
}

#[test]
fn summary_with_only_header_is_one_line() {
    assert_eq!(
        Summary::new("taskvault init: nothing to do").to_string(),
        "taskvault init: nothing to do"
    );
}

#[test]
fn cycle_summary_reports_each_item() {
    let rendered = cycle_report().summary().to_string();

    assert!(rendered.starts_with("taskvault run: cycle complete with 1 failed item(s)"));
    assert!(rendered.contains("Budget Review: Note_20261014_093000.md + Plan_20261014_093000.md"));
    assert!(rendered.contains("warning: m2 stopped at plan: planner failed: timeout"));
    assert!(rendered.contains("next: taskvault list --stage needs-action"));
}

#[test]
fn success_envelope_carries_report_and_hints() {
    let json: Value = serde_json::from_str(&success_json("run", &cycle_report()).unwrap()).unwrap();

    assert_eq!(json["schema_version"], "taskvault.v1");
    assert_eq!(json["command"], "run");
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["fetched"], 2);
    assert_eq!(json["data"]["items"][1]["phase"], "plan");
    assert_eq!(json["warnings"].as_array().unwrap().len(), 1);
    assert!(json.get("error").is_none());
}

#[test]
fn section_missing_sync_warns_in_both_modes() {
    let report = sync_report(SyncOutcome::SectionMissing);
    let rendered = report.summary().to_string();
    assert!(rendered.starts_with("taskvault sync: dashboard left unchanged"));
    assert!(rendered.contains("warning: vault/Dashboard.md has no '## Status Overview' heading"));

    let json: Value = serde_json::from_str(&success_json("sync", &report).unwrap()).unwrap();
    assert_eq!(json["data"]["outcome"], "section_missing");
    assert_eq!(
        json["next_steps"][0],
        "add the heading or set dashboard.append_missing_section = true"
    );
}

#[test]
fn updated_sync_has_no_hints() {
    let json: Value =
        serde_json::from_str(&success_json("sync", &sync_report(SyncOutcome::Updated)).unwrap())
            .unwrap();
    assert!(json.get("warnings").is_none());
    assert!(json.get("next_steps").is_none());
}

#[test]
fn error_envelope_uses_message_kind_and_hint() {
    let err = Error::LockFailed(PathBuf::from("vault/.taskvault.lock"));
    let json: Value = serde_json::from_str(&error_json("sync", &err).unwrap()).unwrap();

    assert_eq!(json["status"], "error");
    assert_eq!(json["command"], "sync");
    assert_eq!(json["error"]["kind"], "lock_failed");
    assert_eq!(json["error"]["code"], 3);
    assert!(json["error"]["message"].as_str().unwrap().contains(".taskvault.lock"));
    assert_eq!(json["next_steps"][0], "wait for the running controller to exit");
    assert!(json.get("data").is_none());
}

#[test]
fn command_name_skips_global_flags() {
    let args = |raw: &[&str]| raw.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    assert_eq!(command_name_from(args(&["--json", "status"])), "status");
    assert_eq!(command_name_from(args(&["--vault", "run", "sync"])), "sync");
    assert_eq!(command_name_from(args(&["--events", "-", "run"])), "run");
    assert_eq!(command_name_from(args(&["-q"])), "taskvault");
}
