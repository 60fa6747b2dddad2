//! RepositoryVerifier - check, size and list one repository
//!
//! ```text
//! Checking ──ok──▶ Sizing ──ok──▶ Enumerating ──ok──▶ OK
//!    │                │                │
//!    └── borg exit != 0 at any step ───┴──────────▶ BAD
//!    └── anything else ───────────────────────────▶ INTERNAL (error returned)
//! ```
//!
//! Exactly one `borg_last_verify` series is written per repository, before
//! any error is handed back to the caller.

use chrono::{NaiveDateTime, Utc};
use metrics::MetricSink;
use runner::CheckRunner;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use shared::{CheckOutcome, RepositoryTarget, SizeKind, SizeObservation, SnapshotObservation};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::VerifyError;

/// borg writes archive start times in UTC without a zone suffix
const SNAPSHOT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// `borg info --json`
#[derive(Debug, Clone, Deserialize)]
pub struct InfoDocument {
    /// Absent for repositories without cache stats; `null` is malformed
    #[serde(default, deserialize_with = "present_cache")]
    pub cache: Option<CacheInfo>,
}

fn present_cache<'de, D>(deserializer: D) -> Result<Option<CacheInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    CacheInfo::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheInfo {
    pub stats: CacheStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheStats {
    #[serde(deserialize_with = "byte_count")]
    pub total_size: u64,
    #[serde(deserialize_with = "byte_count")]
    pub total_csize: u64,
    #[serde(deserialize_with = "byte_count")]
    pub unique_size: u64,
    #[serde(deserialize_with = "byte_count")]
    pub unique_csize: u64,
}

/// Integer byte count; a non-negative float is truncated
fn byte_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Integer(u64),
        Float(f64),
    }

    match Number::deserialize(deserializer)? {
        Number::Integer(bytes) => Ok(bytes),
        Number::Float(bytes) if bytes.is_finite() && bytes >= 0.0 => Ok(bytes.trunc() as u64),
        Number::Float(bytes) => Err(D::Error::custom(format!("invalid byte count {bytes}"))),
    }
}

impl CacheStats {
    pub fn bytes(&self, kind: SizeKind) -> u64 {
        match kind {
            SizeKind::Raw => self.total_size,
            SizeKind::CompressedRaw => self.total_csize,
            SizeKind::Unique => self.unique_size,
            SizeKind::CompressedUnique => self.unique_csize,
        }
    }
}

/// `borg list --json`
#[derive(Debug, Clone, Deserialize)]
pub struct ListDocument {
    pub archives: Vec<ArchiveEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveEntry {
    pub id: String,
    pub start: String,
}

/// Seconds since the epoch for a borg archive start time.
///
/// Fractional seconds are dropped.
pub fn parse_snapshot_time(value: &str) -> Result<i64, chrono::ParseError> {
    let start = NaiveDateTime::parse_from_str(value, SNAPSHOT_TIME_FORMAT)?;
    Ok(start.and_utc().timestamp())
}

/// One observation per size kind, or none when the cache section is missing.
pub fn size_observations(target: &RepositoryTarget, info: &InfoDocument) -> Vec<SizeObservation> {
    let Some(cache) = &info.cache else {
        return Vec::new();
    };

    SizeKind::ALL
        .iter()
        .map(|&kind| SizeObservation {
            target: target.clone(),
            kind,
            bytes: cache.stats.bytes(kind),
        })
        .collect()
}

pub fn snapshot_observations(
    target: &RepositoryTarget,
    list: &ListDocument,
) -> Result<Vec<SnapshotObservation>, VerifyError> {
    list.archives
        .iter()
        .map(|archive| {
            let created_at =
                parse_snapshot_time(&archive.start).map_err(|source| VerifyError::Timestamp {
                    target: target.to_string(),
                    snapshot: archive.id.clone(),
                    value: archive.start.clone(),
                    source,
                })?;

            Ok(SnapshotObservation {
                target: target.clone(),
                snapshot_id: archive.id.clone(),
                created_at,
            })
        })
        .collect()
}

/// Verifies one repository and records what it finds
pub struct RepositoryVerifier {
    target: RepositoryTarget,
    runner: Arc<dyn CheckRunner>,
    sink: MetricSink,
}

impl RepositoryVerifier {
    pub fn new(target: RepositoryTarget, runner: Arc<dyn CheckRunner>, sink: MetricSink) -> Self {
        Self {
            target,
            runner,
            sink,
        }
    }

    /// Runs the whole workflow and records the terminal outcome.
    ///
    /// BAD is an expected result and comes back as `Ok`. INTERNAL is
    /// recorded and then returned as the error that caused it.
    pub async fn verify_and_export(&self) -> Result<CheckOutcome, VerifyError> {
        let err = match self.collect().await {
            Ok(()) => {
                info!(repo = %self.target, "OK");
                self.complete(CheckOutcome::Ok);
                return Ok(CheckOutcome::Ok);
            }
            Err(err) => err,
        };

        match err.outcome() {
            CheckOutcome::Bad => {
                error!(repo = %self.target, error = %err, "BAD");
                self.complete(CheckOutcome::Bad);
                Ok(CheckOutcome::Bad)
            }
            outcome => {
                error!(repo = %self.target, error = ?err, "INTERNAL");
                self.complete(outcome);
                Err(err)
            }
        }
    }

    async fn collect(&self) -> Result<(), VerifyError> {
        info!(repo = %self.target, "Begin check");
        self.runner.invoke(&self.target, &["check"]).await?;
        info!(repo = %self.target, "Completed check");

        info!(repo = %self.target, "Get info");
        let info: InfoDocument = self.structured("info").await?;
        let sizes = size_observations(&self.target, &info);
        if sizes.is_empty() {
            debug!(repo = %self.target, "No cache stats reported");
        }
        for size in &sizes {
            info!(repo = %self.target, "{} size: {}", size.kind, size.bytes);
            self.sink.record_size_observation(size);
        }

        info!(repo = %self.target, "Get snapshot creation times");
        let list: ListDocument = self.structured("list").await?;
        for snapshot in snapshot_observations(&self.target, &list)? {
            info!(repo = %self.target, "{} created {}", snapshot.snapshot_id, snapshot.created_at);
            self.sink.record_snapshot_observation(&snapshot);
        }

        Ok(())
    }

    async fn structured<T: DeserializeOwned>(&self, verb: &str) -> Result<T, VerifyError> {
        let value = self.runner.invoke_structured(&self.target, &[verb]).await?;
        serde_json::from_value(value).map_err(|source| VerifyError::MalformedDocument {
            target: self.target.to_string(),
            verb: verb.to_string(),
            source,
        })
    }

    fn complete(&self, outcome: CheckOutcome) {
        self.sink.record_outcome(&self.target, outcome, Utc::now());
    }
}
