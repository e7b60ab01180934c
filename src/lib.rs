// Copyright (c) 2025 MCP Rust Contributors
// SPDX-License-Identifier: MIT

//! # OAuth Probe
//!
//! Passive capture and active probing of OAuth 2.0 / OpenID Connect
//! authorization endpoints.
// !
//! ## Features
//!
//! - **Passive capture**: keeps every distinct authorization request seen by
//!   an interception hook, persisted through a pluggable key/value store
//! - **Redirect-URI probing**: ten crafted `redirect_uri` variants compared
//!   against the unmodified request
//! - **Parameter acceptance**: non-default `response_mode`, `prompt` and
//!   `response_type` values
//! - **CSRF state check**: does the server proceed without `state`
//! - **Discovery**: OpenID configuration and WebFinger presence
// !
//! ## Quick Start
//!
//! ```rust,no_run
//! use oauth_probe::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> ProbeResult<()> {
//!     let store = CaptureStore::in_memory(CapturePolicy::default());
//!     store
//!         .observe(&ObservedRequest::from_tab(
//!             "https://idp.example/authorize?client_id=x&redirect_uri=https://app.example/cb",
//!             1,
//!         ))
//!         .await?;
//!
//!     let analyzer = Analyzer::new(ProbeConfig::default())?;
//!     for endpoint in store.snapshot().await.endpoints {
//!         let report = analyzer.analyze_endpoint(&endpoint).await?;
//!         println!("{}", serde_json::to_string_pretty(&report)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Probe requests never carry credentials and never follow redirects; every
//! redirect answer is reduced to the opaque [`StatusSignal::OpaqueRedirect`].
//!
//! ## Module Organization
//!
//! - [`capture`]: Capture store, capture policy and persistence backends
//! - [`core`]: Errors, structured error logging and configuration
//! - [`probe`]: Mutation catalog, probe runner, state and discovery probes, analyzer
//! - [`utils`]: URL helpers

pub mod capture;
pub mod core;
pub mod probe;
pub mod utils;

// Re-export commonly used types for convenience
pub use capture::{CaptureStore, CapturedEndpoint, ObservedRequest};
pub use core::config::ProbeConfig;
pub use core::error::{ProbeError, ProbeResult};
pub use probe::{AnalysisReport, Analyzer, StatusSignal};

/// Prelude module for convenient imports
///
/// Use `use oauth_probe::prelude::*;` to import everything you need.
pub mod prelude {
    // Core types
    pub use crate::core::{
        config::ProbeConfig,
        error::{ProbeError, ProbeResult},
    };

    // Capture
    pub use crate::capture::{
        CaptureSnapshot, CaptureStore, CapturedEndpoint, CapturePolicy, JsonFileStore,
        KeyValueStore, MemoryStore, ObservedRequest, RecordOutcome,
    };

    // Probing
    pub use crate::probe::{
        AnalysisReport, Analyzer, DiscoveryResult, FamilyReport, ProbeFamily, ProbeOutcome,
        StateFinding, StatusSignal,
    };

    // Essential external types
    pub use async_trait::async_trait;
    pub use serde_json::{Value, json};
}
