//! Configuration types for borg-verifier

use crate::error::{ConfigError, Result};
use crate::target::RepositoryTarget;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Default `--lock-wait` passed to borg, in seconds
pub const DEFAULT_LOCK_WAIT_SECS: u64 = 900;

/// Job name the metrics are pushed under
pub const JOB_NAME: &str = "borg_verifier";

/// How to run the borg executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    /// Command to execute
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments placed before borg's own arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Seconds borg waits for a repository lock before giving up
    #[serde(default = "default_lock_wait")]
    pub lock_wait_secs: u64,
}

fn default_command() -> String {
    "borg".to_string()
}

fn default_lock_wait() -> u64 {
    DEFAULT_LOCK_WAIT_SECS
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            env: HashMap::new(),
            lock_wait_secs: DEFAULT_LOCK_WAIT_SECS,
        }
    }
}

impl ToolConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Basic-auth credentials for the Pushgateway
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Both-or-neither: a lone username or password is rejected.
    ///
    /// An empty string counts as not given.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Result<Option<Self>> {
        let username = username.filter(|value| !value.is_empty());
        let password = password.filter(|value| !value.is_empty());
        match (username, password) {
            (Some(username), Some(password)) => Ok(Some(Self { username, password })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::PartialCredentials),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything one verification run needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Pushgateway address
    pub gateway: String,
    pub targets: Vec<RepositoryTarget>,
    pub credentials: Option<Credentials>,
    /// Grouping key `instance` value
    pub instance: String,
    /// Upper bound on concurrently verified repositories
    pub max_parallel: Option<usize>,
}

impl RunConfig {
    pub fn new(
        gateway: impl Into<String>,
        targets: Vec<RepositoryTarget>,
        instance: impl Into<String>,
    ) -> Result<Self> {
        if targets.is_empty() {
            return Err(ConfigError::NoRepositories);
        }

        Ok(Self {
            gateway: gateway.into(),
            targets,
            credentials: None,
            instance: instance.into(),
            max_parallel: None,
        })
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: Option<usize>) -> Result<Self> {
        if max_parallel == Some(0) {
            return Err(ConfigError::InvalidParallelism);
        }
        self.max_parallel = max_parallel;
        Ok(self)
    }

    /// Grouping key attached to the pushed metrics
    pub fn grouping_key(&self) -> HashMap<String, String> {
        HashMap::from([("instance".to_string(), self.instance.clone())])
    }
}
