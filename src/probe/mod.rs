//! Active probing of authorization endpoints
//!
//! This module derives mutated variants of a captured authorization URL,
//! dispatches them without credentials and without following redirects,
//! and classifies every answer against the family baseline.

pub mod analyzer;
pub mod catalog;
pub mod discovery;
pub mod mutator;
pub mod report;
pub mod runner;
pub mod state;
pub mod types;

pub use analyzer::Analyzer;
pub use catalog::{
    BASELINE, Mutation, PARAMETER_ACCEPTANCE_CASES, ProbeTestCase, REDIRECT_URI_CASES,
    RedirectMutation,
};
pub use discovery::{DiscoveryFetcher, DiscoveryKind, DiscoveryResult, ProviderEndpoints};
pub use mutator::{derive_variant, mutate_redirect_uri};
pub use report::AnalysisReport;
pub use runner::{HttpProbeRunner, build_probe_client};
pub use state::{StateFinding, StateProbeReport, probe_state};
pub use types::{FamilyReport, ProbeFamily, ProbeOutcome, StatusSignal};
