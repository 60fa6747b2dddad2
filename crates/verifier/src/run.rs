//! One complete run: verify everything, then push once

use metrics::{MetricSink, MetricsPusher};
use runner::CheckRunner;
use shared::{RunConfig, JOB_NAME};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::RunError;
use crate::orchestrator::{Orchestrator, RunSummary};

/// Verifies every configured repository and delivers the metrics.
///
/// Per-repository failures only show up in the summary and the metrics.
/// Delivery happens exactly once, after every verifier has finished, and a
/// delivery failure fails the whole run.
pub async fn run(
    config: &RunConfig,
    runner: Arc<dyn CheckRunner>,
    pusher: Arc<dyn MetricsPusher>,
) -> Result<RunSummary, RunError> {
    let sink = MetricSink::new().map_err(RunError::Setup)?;

    let mut orchestrator = Orchestrator::new(runner, sink.clone());
    if let Some(max_parallel) = config.max_parallel {
        orchestrator = orchestrator.with_max_parallel(max_parallel);
    }

    let summary = orchestrator.run(&config.targets).await;
    info!(
        ok = summary.ok,
        bad = summary.bad,
        internal = summary.internal,
        "Verification finished"
    );

    match sink.encode_text() {
        Ok(text) => debug!("Collected metrics:\n{}", text),
        Err(err) => debug!(error = %err, "Could not render collected metrics"),
    }

    info!("Pushing metrics to {}", config.gateway);
    let grouping = config.grouping_key();
    let families = sink.gather();
    tokio::task::spawn_blocking(move || pusher.push(JOB_NAME, &grouping, families))
        .await
        .map_err(|e| RunError::Join(e.to_string()))?
        .map_err(RunError::Delivery)?;

    Ok(summary)
}
