//! # borg-verifier Runner
//!
//! Runs borg subcommands against one repository and captures their output.

mod borg_runner;

pub use borg_runner::{BorgRunner, CheckRunner};
