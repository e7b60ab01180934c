// ! Analysis report
// !
// ! Module defines the aggregate produced for one analyzed authorization URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::probe::discovery::DiscoveryResult;
use crate::probe::state::StateProbeReport;
use crate::probe::types::{FamilyReport, ProbeOutcome};

/// Everything learned about one authorization URL in one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Identifier of the run
    pub run_id: Uuid,
    /// Analyzed authorization URL
    pub url: String,
    /// Origin the discovery documents were fetched from
    pub origin: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
    /// Redirect-URI manipulation family
    pub redirect_uri: FamilyReport,
    /// Parameter-acceptance family
    pub parameter_acceptance: FamilyReport,
    /// CSRF state probe
    pub state: StateProbeReport,
    /// `/.well-known/openid-configuration`
    pub openid_configuration: DiscoveryResult,
    /// `/.well-known/webfinger`
    pub webfinger: DiscoveryResult,
}

impl AnalysisReport {
    /// Redirect-URI variants answered like the baseline
    pub fn open_redirect_candidates(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.redirect_uri.matching()
    }

    /// Parameter variants answered like the baseline
    pub fn accepted_parameters(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.parameter_acceptance.matching()
    }

    /// Whether any probe produced a finding worth a closer look
    pub fn has_findings(&self) -> bool {
        self.open_redirect_candidates().next().is_some()
            || self.state.finding.is_csrf_candidate()
    }
}
