//! borg-verifier verify command

use anyhow::{anyhow, Context};
use clap::Parser;
use metrics::PushgatewayPusher;
use runner::BorgRunner;
use shared::{Credentials, RepositoryTarget, RunConfig, ToolConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "borg-verifier")]
#[command(about = "Verifies Borg backups and exports Prometheus metrics")]
#[command(version)]
pub struct VerifyCommand {
    /// Pushgateway address (host:port or URL)
    pub pushgateway: String,

    /// Repositories to verify
    #[arg(required = true)]
    pub repos: Vec<String>,

    /// Basic-auth username for the Pushgateway
    #[arg(long, alias = "auth_username")]
    pub auth_username: Option<String>,

    /// Basic-auth password for the Pushgateway
    #[arg(
        long,
        alias = "auth_password",
        env = "BORG_VERIFIER_AUTH_PASSWORD",
        hide_env_values = true
    )]
    pub auth_password: Option<String>,

    /// Log debug output
    #[arg(long)]
    pub debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "debug")]
    pub quiet: bool,

    /// JSON file describing how to run borg
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum number of repositories verified at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Value of the `instance` grouping label (defaults to the hostname)
    #[arg(long)]
    pub instance: Option<String>,
}

impl VerifyCommand {
    pub async fn run(&self) -> anyhow::Result<()> {
        // Reject bad configuration before touching any repository
        let run_config = self.run_config()?;
        let tool_config = self.tool_config()?;

        let runner = Arc::new(BorgRunner::new(tool_config));
        let pusher = Arc::new(PushgatewayPusher::new(
            run_config.gateway.clone(),
            run_config.credentials.clone(),
        ));

        let summary = verifier::run(&run_config, runner, pusher).await?;
        info!("Verified {} repositories: {}", summary.total(), summary);
        Ok(())
    }

    fn run_config(&self) -> anyhow::Result<RunConfig> {
        let credentials =
            Credentials::from_parts(self.auth_username.clone(), self.auth_password.clone())?;
        let instance = match &self.instance {
            Some(instance) => instance.clone(),
            None => local_hostname()?,
        };
        let targets = self
            .repos
            .iter()
            .map(|repo| RepositoryTarget::new(repo.as_str()))
            .collect();

        let config = RunConfig::new(&self.pushgateway, targets, instance)?
            .with_credentials(credentials)
            .with_max_parallel(self.jobs)?;
        Ok(config)
    }

    fn tool_config(&self) -> anyhow::Result<ToolConfig> {
        match &self.config {
            Some(path) => Ok(ToolConfig::from_file(path)?),
            None => Ok(ToolConfig::default()),
        }
    }
}

fn local_hostname() -> anyhow::Result<String> {
    nix::unistd::gethostname()
        .context("Failed to read hostname")?
        .into_string()
        .map_err(|raw| anyhow!("Hostname {:?} is not valid UTF-8", raw))
}
