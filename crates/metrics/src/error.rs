//! Metrics errors

use thiserror::Error;

/// Errors that can occur while recording or delivering metrics
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Failed to register a gauge with the registry
    #[error("failed to register metric: {0}")]
    Registration(#[source] prometheus::Error),

    /// Failed to encode metrics output
    #[error("failed to encode metrics: {0}")]
    Encoding(String),

    /// The Pushgateway rejected or never received the push
    #[error("failed to push metrics to {gateway}: {source}")]
    Push {
        gateway: String,
        #[source]
        source: prometheus::Error,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;
