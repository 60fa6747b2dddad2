//! Error types for borg-verifier

use std::path::PathBuf;
use thiserror::Error;

/// Error raised by an invocation of the external borg tool
#[derive(Debug, Error)]
pub enum ToolError {
    /// borg ran and reported a failure (non-zero exit)
    #[error("borg {verb} failed for '{target}' ({})", describe_exit(.code))]
    Execution {
        target: String,
        verb: String,
        code: Option<i32>,
    },

    /// borg could not be started at all
    #[error("Failed to invoke borg for '{target}': {message}")]
    Invocation { target: String, message: String },

    /// borg succeeded but its structured output is not valid JSON
    #[error("Malformed output from borg {verb} for '{target}': {source}")]
    MalformedOutput {
        target: String,
        verb: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ToolError {
    /// True when the tool itself reported a failed verification
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, ToolError::Execution { .. })
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Error thrown when the run configuration is unusable
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Both of auth username and password must be specified")]
    PartialCredentials,

    #[error("At least one repository must be specified")]
    NoRepositories,

    #[error("Parallelism must be at least 1")]
    InvalidParallelism,

    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
