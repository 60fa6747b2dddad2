//! # borg-verifier Verifier
//!
//! Verification workflow for one repository, and the fan-out that runs it
//! for every configured repository before delivering the metrics.

mod error;
mod orchestrator;
mod repository;
mod run;

#[cfg(test)]
mod testing;

pub use error::{RunError, VerifyError};
pub use orchestrator::{Orchestrator, RunSummary};
pub use repository::{
    parse_snapshot_time, size_observations, snapshot_observations, ArchiveEntry, CacheInfo,
    CacheStats, InfoDocument, ListDocument, RepositoryVerifier,
};
pub use run::run;
