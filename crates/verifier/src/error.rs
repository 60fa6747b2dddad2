//! Error types for verification runs

use metrics::MetricsError;
use shared::{CheckOutcome, ToolError};
use thiserror::Error;

/// Why a repository did not finish verification cleanly
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// borg produced JSON, but not in the shape we read
    #[error("Unexpected borg {verb} document for '{target}': {source}")]
    MalformedDocument {
        target: String,
        verb: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot '{snapshot}' of '{target}' has unparseable start time '{value}': {source}")]
    Timestamp {
        target: String,
        snapshot: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl VerifyError {
    /// BAD when borg itself reported failure, INTERNAL for everything else
    pub fn outcome(&self) -> CheckOutcome {
        match self {
            VerifyError::Tool(err) if err.is_execution_failure() => CheckOutcome::Bad,
            _ => CheckOutcome::Internal,
        }
    }
}

/// Run-level failure; per-repository failures never end up here
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to set up metrics: {0}")]
    Setup(#[source] MetricsError),

    #[error("Failed to deliver metrics: {0}")]
    Delivery(#[source] MetricsError),

    #[error("Metrics delivery task failed: {0}")]
    Join(String),
}
