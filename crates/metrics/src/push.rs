//! Pushgateway delivery

use prometheus::proto::MetricFamily;
use prometheus::BasicAuthentication;
use shared::Credentials;
use std::collections::HashMap;

use crate::error::{MetricsError, MetricsResult};

/// Destination for a finished run's metrics
///
/// Implementations block; async callers should run them on a blocking thread.
pub trait MetricsPusher: Send + Sync {
    fn push(
        &self,
        job: &str,
        grouping: &HashMap<String, String>,
        families: Vec<MetricFamily>,
    ) -> MetricsResult<()>;
}

/// Pushes to a Prometheus Pushgateway with HTTP PUT
#[derive(Debug, Clone)]
pub struct PushgatewayPusher {
    address: String,
    credentials: Option<Credentials>,
}

impl PushgatewayPusher {
    /// `address` may omit the scheme, in which case `http://` is used
    pub fn new(address: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            address: address.into(),
            credentials,
        }
    }
}

impl MetricsPusher for PushgatewayPusher {
    fn push(
        &self,
        job: &str,
        grouping: &HashMap<String, String>,
        families: Vec<MetricFamily>,
    ) -> MetricsResult<()> {
        let basic_auth = self.credentials.as_ref().map(|c| BasicAuthentication {
            username: c.username.clone(),
            password: c.password.clone(),
        });

        prometheus::push_metrics(job, grouping.clone(), &self.address, families, basic_auth)
            .map_err(|source| MetricsError::Push {
                gateway: self.address.clone(),
                source,
            })
    }
}
