//! BorgRunner - Subprocess invocation of borg

use async_trait::async_trait;
use shared::{RepositoryTarget, ToolConfig, ToolError};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Environment every borg invocation gets, on top of the inherited one.
///
/// Verification is read-only and runs against operator-chosen stores, so
/// borg must not stop to ask about unencrypted or moved repositories.
const POLICY_ENV: [(&str, &str); 2] = [
    ("BORG_UNKNOWN_UNENCRYPTED_REPO_ACCESS_IS_OK", "yes"),
    ("BORG_RELOCATED_REPO_ACCESS_IS_OK", "yes"),
];

/// Runs borg subcommands against a repository
#[async_trait]
pub trait CheckRunner: Send + Sync {
    /// Run `borg <args>` against `target` and return its stdout
    async fn invoke(&self, target: &RepositoryTarget, args: &[&str]) -> Result<Vec<u8>, ToolError>;

    /// Run `borg <args> --json` and parse the output
    async fn invoke_structured(
        &self,
        target: &RepositoryTarget,
        args: &[&str],
    ) -> Result<serde_json::Value, ToolError> {
        let mut json_args = args.to_vec();
        json_args.push("--json");

        let stdout = self.invoke(target, &json_args).await?;
        serde_json::from_slice(&stdout).map_err(|source| ToolError::MalformedOutput {
            target: target.to_string(),
            verb: verb_of(args),
            source,
        })
    }
}

fn verb_of(args: &[&str]) -> String {
    args.first().copied().unwrap_or_default().to_string()
}

/// Production runner that spawns the configured borg executable
#[derive(Debug, Clone, Default)]
pub struct BorgRunner {
    config: ToolConfig,
}

impl BorgRunner {
    /// Create a new BorgRunner
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn command(&self, target: &RepositoryTarget, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .arg("--lock-wait")
            .arg(self.config.lock_wait_secs.to_string())
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }
        cmd.env("BORG_REPO", target.as_str());
        for (key, value) in POLICY_ENV {
            cmd.env(key, value);
        }

        cmd
    }
}

#[async_trait]
impl CheckRunner for BorgRunner {
    async fn invoke(&self, target: &RepositoryTarget, args: &[&str]) -> Result<Vec<u8>, ToolError> {
        debug!(repo = %target, ?args, "Invoking borg");

        let output = self.command(target, args).output().await.map_err(|e| {
            ToolError::Invocation {
                target: target.to_string(),
                message: format!("failed to start '{}': {}", self.config.command, e),
            }
        })?;

        if !output.status.success() {
            return Err(ToolError::Execution {
                target: target.to_string(),
                verb: verb_of(args),
                code: output.status.code(),
            });
        }

        Ok(output.stdout)
    }
}
