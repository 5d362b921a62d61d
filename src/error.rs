//! Error types for host resolution, remote execution and database access.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the fleet error type.
pub type Result<T> = std::result::Result<T, FleetError>;

#[derive(Error, Debug)]
pub enum FleetError {
    /// Inventory file does not exist
    #[error("host inventory file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Inventory file exists but could not be read
    #[error("failed to read host inventory {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A token that is not a usable `user@host` pair
    #[error("malformed target '{token}': {reason}")]
    MalformedTarget { token: String, reason: String },

    /// The SQL client ran but the query failed
    #[error("query failed (exit status {}): {stderr}", display_status(.status))]
    QueryExecution { status: Option<i32>, stderr: String },

    /// Resolution succeeded but produced nothing to run against
    #[error("no hosts found")]
    NoTargets,

    /// Could not reach or authenticate to a target. `output` keeps whatever
    /// ssh printed before giving up.
    #[error("connection to {target} failed: {message}")]
    Connection {
        target: String,
        message: String,
        output: String,
    },

    /// The remote command ran and exited non-zero
    #[error("remote command on {target} exited with status {exit_status}")]
    RemoteExecution { target: String, exit_status: i32 },

    /// Database login or connectivity check failed
    #[error("database credentials rejected or server unreachable: {0}")]
    Credential(String),

    /// A non-query SQL statement failed
    #[error("statement failed (exit status {}): {stderr}", display_status(.status))]
    Execution { status: Option<i32>, stderr: String },

    #[error("invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Shutdown signal arrived before the operation finished
    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FleetError {
    /// True for errors that stop a run before any target is attempted.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            FleetError::SourceNotFound(_)
                | FleetError::SourceUnreadable { .. }
                | FleetError::QueryExecution { .. }
                | FleetError::NoTargets
                | FleetError::Credential(_)
        )
    }
}

fn display_status(status: &Option<i32>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
