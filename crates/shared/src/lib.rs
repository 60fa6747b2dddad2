//! # borg-verifier Shared
//!
//! Common types and interfaces used across all borg-verifier packages.

pub mod error;
pub mod target;
pub mod config;

// Re-exports
pub use error::*;
pub use target::*;
pub use config::*;
