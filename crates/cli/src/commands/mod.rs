//! CLI Commands

pub mod verify;

pub use verify::VerifyCommand;
