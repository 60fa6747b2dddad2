//! Orchestrator - Verify every repository concurrently

use chrono::Utc;
use metrics::MetricSink;
use runner::CheckRunner;
use shared::{CheckOutcome, RepositoryTarget};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::repository::RepositoryVerifier;

/// Upper bound for the default parallelism
const MAX_DEFAULT_PARALLEL: usize = 32;

/// Outcome counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ok: usize,
    pub bad: usize,
    pub internal: usize,
}

impl RunSummary {
    pub fn add(&mut self, outcome: CheckOutcome) {
        match outcome {
            CheckOutcome::Ok => self.ok += 1,
            CheckOutcome::Bad => self.bad += 1,
            CheckOutcome::Internal => self.internal += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ok + self.bad + self.internal
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} OK, {} BAD, {} INTERNAL",
            self.ok, self.bad, self.internal
        )
    }
}

/// Runs one [`RepositoryVerifier`] per target and waits for all of them
pub struct Orchestrator {
    runner: Arc<dyn CheckRunner>,
    sink: MetricSink,
    max_parallel: usize,
}

impl Orchestrator {
    pub fn new(runner: Arc<dyn CheckRunner>, sink: MetricSink) -> Self {
        Self {
            runner,
            sink,
            max_parallel: default_parallelism(),
        }
    }

    /// Limit how many repositories are verified at once (minimum 1)
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Verifies every target and returns once all of them have finished.
    ///
    /// A failing or panicking verifier is logged and counted as INTERNAL;
    /// it never stops the others.
    pub async fn run(&self, targets: &[RepositoryTarget]) -> RunSummary {
        let permits = Arc::new(Semaphore::new(self.max_parallel));

        let handles: Vec<_> = targets
            .iter()
            .map(|target| {
                debug!(repo = %target, "Run verifier");
                let verifier =
                    RepositoryVerifier::new(target.clone(), self.runner.clone(), self.sink.clone());
                let permits = permits.clone();

                let handle = tokio::spawn(async move {
                    // The semaphore is never closed
                    let _permit = permits.acquire_owned().await;
                    verifier.verify_and_export().await
                });
                (target.clone(), handle)
            })
            .collect();

        let mut summary = RunSummary::default();
        for (target, handle) in handles {
            match handle.await {
                Ok(Ok(outcome)) => summary.add(outcome),
                Ok(Err(err)) => {
                    error!(repo = %target, error = %err, "Caught error from verifier");
                    summary.add(CheckOutcome::Internal);
                }
                Err(join_err) => {
                    error!(repo = %target, error = %join_err, "Verifier task did not complete");
                    self.sink.record_outcome(&target, CheckOutcome::Internal, Utc::now());
                    summary.add(CheckOutcome::Internal);
                }
            }
        }

        summary
    }
}

fn default_parallelism() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus + 4).min(MAX_DEFAULT_PARALLEL)
}
