//! borg-verifier - Verify Borg repositories and push the results
//!
//! Usage:
//!   borg-verifier <pushgateway> <repo>...                 - Verify and push
//!   borg-verifier --auth-username u --auth-password p ... - Push with basic auth
//!   borg-verifier --debug ...                             - Verbose logging

mod commands;

use clap::Parser;
use commands::VerifyCommand;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = VerifyCommand::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.debug, cli.quiet))
        .with_writer(std::io::stderr)
        .init();

    cli.run().await
}

/// `RUST_LOG` wins; otherwise the verbosity flags pick the level
fn log_filter(debug: bool, quiet: bool) -> EnvFilter {
    let level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
