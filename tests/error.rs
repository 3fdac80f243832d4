use std::path::PathBuf;

use serde_json::Value;
use taskvault::error::{exit_codes, Error, JsonError};

#[test]
fn exit_code_user_error() {
    let err = Error::InvalidArgument("bad input".to_string());
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
}

#[test]
fn exit_code_blocked() {
    let err = Error::LockFailed(PathBuf::from("vault/.taskvault.lock"));
    assert_eq!(err.exit_code(), exit_codes::BLOCKED);
}

#[test]
fn store_violations_are_operation_failures() {
    for err in [
        Error::ArtifactNotFound(PathBuf::from("Needs_Action/Note_1.md")),
        Error::DestinationConflict(PathBuf::from("Done/Note_1.md")),
        Error::NamingCollision {
            base: "Note_20261014_093000".to_string(),
            attempts: 1000,
        },
        Error::MalformedArtifact("empty".to_string()),
        Error::SourceUnavailable("down".to_string()),
    ] {
        assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED, "{err}");
    }
}

#[test]
fn details_include_collision_fields() {
    let err = Error::NamingCollision {
        base: "Plan_20261014_093000".to_string(),
        attempts: 3,
    };
    let details = err.details().expect("details");
    assert_eq!(details["base"], Value::String("Plan_20261014_093000".to_string()));
    assert_eq!(details["attempts"], Value::from(3));
    assert_eq!(err.kind(), "naming_collision");
}

#[test]
fn json_error_includes_kind_and_details() {
    let err = Error::DestinationConflict(PathBuf::from("Done/Note_1.md"));
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::OPERATION_FAILED);
    assert_eq!(json.kind, "destination_conflict");
    let details = json.details.expect("details");
    assert_eq!(details["path"], Value::String("Done/Note_1.md".to_string()));
}

#[test]
fn json_error_without_details() {
    let err = Error::InvalidConfig("bad config".to_string());
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    assert!(json.details.is_none());
    assert!(json.error.contains("bad config"));
}
