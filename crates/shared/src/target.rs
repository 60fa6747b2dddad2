//! Repository targets, outcomes and observations

use serde::{Deserialize, Serialize};
use std::fmt;

/// A configured borg repository location (local path or remote URI)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryTarget(String);

impl RepositoryTarget {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepositoryTarget {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RepositoryTarget {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Terminal classification of one repository's verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckOutcome {
    /// Check and metric collection succeeded
    Ok,
    /// borg reported a verification failure
    Bad,
    /// Anything else went wrong (parsing, missing data, spawn failure)
    Internal,
}

impl CheckOutcome {
    /// Value of the `result` label on `borg_last_verify`
    pub fn as_label(&self) -> &'static str {
        match self {
            CheckOutcome::Ok => "OK",
            CheckOutcome::Bad => "BAD",
            CheckOutcome::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Size breakdown reported in borg's cache stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeKind {
    Raw,
    CompressedRaw,
    Unique,
    CompressedUnique,
}

impl SizeKind {
    pub const ALL: [SizeKind; 4] = [
        SizeKind::Raw,
        SizeKind::CompressedRaw,
        SizeKind::Unique,
        SizeKind::CompressedUnique,
    ];

    /// Value of the `kind` label on `borg_repository_size`
    pub fn as_label(&self) -> &'static str {
        match self {
            SizeKind::Raw => "raw",
            SizeKind::CompressedRaw => "compressed_raw",
            SizeKind::Unique => "unique",
            SizeKind::CompressedUnique => "compressed_unique",
        }
    }

    /// Key of this kind inside `cache.stats` of `borg info --json`
    pub fn stats_key(&self) -> &'static str {
        match self {
            SizeKind::Raw => "total_size",
            SizeKind::CompressedRaw => "total_csize",
            SizeKind::Unique => "unique_size",
            SizeKind::CompressedUnique => "unique_csize",
        }
    }
}

impl fmt::Display for SizeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// One size measurement for a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeObservation {
    pub target: RepositoryTarget,
    pub kind: SizeKind,
    pub bytes: u64,
}

/// Creation time of one archive in a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotObservation {
    pub target: RepositoryTarget,
    pub snapshot_id: String,
    /// Seconds since the Unix epoch
    pub created_at: i64,
}
