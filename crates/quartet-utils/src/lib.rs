//! Foundation utilities for quartet
//!
//! Shared by every crate in the workspace: the closed [`types::Mode`] and
//! [`types::ProviderRole`] enums, the error taxonomy, process exit codes,
//! tracing setup and secret redaction for anything that leaves the process.

pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod redaction;
pub mod types;
