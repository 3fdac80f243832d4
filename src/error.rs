//! Error types for taskvault
//!
//! Exit codes:
//! - 0: Success (including cycles with per-item failures)
//! - 2: User error (bad args, invalid config, unknown artifact)
//! - 3: Blocked (another controller holds the vault lock)
//! - 4: Operation failed (I/O, store invariant violation, source down)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskvault CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskvault operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Artifact {name} cannot move from {from} to {to}")]
    InvalidTransition {
        name: String,
        from: String,
        to: String,
    },

    // Blocked (exit code 3)
    #[error("Vault is locked by another controller: {0}")]
    LockFailed(PathBuf),

    // Operation failures (exit code 4)
    #[error("Mail source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Malformed artifact: {0}")]
    MalformedArtifact(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("Destination already holds an artifact: {0}")]
    DestinationConflict(PathBuf),

    #[error("No free artifact name for {base} after {attempts} attempts")]
    NamingCollision { base: String, attempts: u32 },

    #[error("Planner failed: {0}")]
    PlannerFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::InvalidTransition { .. } => exit_codes::USER_ERROR,

            Error::LockFailed(_) => exit_codes::BLOCKED,

            Error::SourceUnavailable(_)
            | Error::MalformedArtifact(_)
            | Error::ArtifactNotFound(_)
            | Error::DestinationConflict(_)
            | Error::NamingCollision { .. }
            | Error::PlannerFailed(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Stable machine-readable kind, used in JSON output and cycle reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "invalid_config",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::LockFailed(_) => "lock_failed",
            Error::SourceUnavailable(_) => "source_unavailable",
            Error::MalformedArtifact(_) => "malformed_artifact",
            Error::ArtifactNotFound(_) => "artifact_not_found",
            Error::DestinationConflict(_) => "destination_conflict",
            Error::NamingCollision { .. } => "naming_collision",
            Error::PlannerFailed(_) => "planner_failed",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::TomlParse(_) => "toml_parse",
            Error::TomlSerialize(_) => "toml_serialize",
        }
    }

    /// Structured details for JSON output, where the variant carries fields
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::InvalidTransition { name, from, to } => Some(serde_json::json!({
                "name": name,
                "from": from,
                "to": to,
            })),
            Error::NamingCollision { base, attempts } => Some(serde_json::json!({
                "base": base,
                "attempts": attempts,
            })),
            Error::ArtifactNotFound(path)
            | Error::DestinationConflict(path)
            | Error::LockFailed(path) => Some(serde_json::json!({
                "path": path.to_string_lossy(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for taskvault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    #[serde(rename = "message")]
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
