//! # borg-verifier Metrics
//!
//! Run-scoped Prometheus gauges and their delivery to a Pushgateway.

mod error;
mod push;
mod sink;

pub use error::{MetricsError, MetricsResult};
pub use push::{MetricsPusher, PushgatewayPusher};
pub use sink::{
    MetricSink, LAST_VERIFY_METRIC, REPOSITORY_SIZE_METRIC, SNAPSHOT_CREATION_METRIC,
};

pub use prometheus::proto::MetricFamily;
