//! Core building blocks shared by capture and probing
//!
//! This module contains the error type, structured error logging and the
//! probe configuration.

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used items
pub use config::ProbeConfig;
pub use error::{ProbeError, ProbeResult};
pub use logging::{ErrorContext, ErrorLogLevel, ErrorLogger};
