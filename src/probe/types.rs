// ! Probe result types
// !
// ! Module defines the uniform status signal every probe request is reduced to,
// ! the per-test-case outcome and the per-family result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Textual form of the opaque-redirect sentinel
pub const OPAQUE_REDIRECT: &str = "3XX";

/// Status codes reported as [`StatusSignal::OpaqueRedirect`]
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Normalized observation for a single probe request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StatusSignal {
    /// Non-redirect HTTP status code
    Status(u16),
    /// Redirect response; the exact code is deliberately not relied upon
    OpaqueRedirect,
    /// Transport failure or a variant that could not be built
    Error(String),
}

impl StatusSignal {
    /// Classify a raw HTTP status code
    ///
    /// Only the redirect statuses a manual-redirect fetch hides become the
    /// sentinel; 300, 304 and 305 stay numeric.
    pub fn from_status(code: u16) -> Self {
        if REDIRECT_STATUSES.contains(&code) {
            StatusSignal::OpaqueRedirect
        } else {
            StatusSignal::Status(code)
        }
    }

    /// Whether this signal counts as equal to `baseline`
    ///
    /// Errors never match, on either side.
    pub fn matches(&self, baseline: &StatusSignal) -> bool {
        match (self, baseline) {
            (StatusSignal::Status(a), StatusSignal::Status(b)) => a == b,
            (StatusSignal::OpaqueRedirect, StatusSignal::OpaqueRedirect) => true,
            _ => false,
        }
    }

    /// Numeric status, if one was observed
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StatusSignal::Status(code) => Some(*code),
            _ => None,
        }
    }

    /// Whether the request failed instead of producing a response
    pub fn is_error(&self) -> bool {
        matches!(self, StatusSignal::Error(_))
    }
}

impl fmt::Display for StatusSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusSignal::Status(code) => write!(f, "{code}"),
            StatusSignal::OpaqueRedirect => f.write_str(OPAQUE_REDIRECT),
            StatusSignal::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// The probe families driven by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFamily {
    /// `redirect_uri` manipulation
    RedirectUri,
    /// Non-standard `response_mode` / `prompt` / `response_type` values
    ParameterAcceptance,
}

impl ProbeFamily {
    /// Stable identifier used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeFamily::RedirectUri => "redirect_uri",
            ProbeFamily::ParameterAcceptance => "parameter_acceptance",
        }
    }
}

/// Result of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Test-case name, unique within its family
    pub name: String,
    /// Human-readable description of the mutation
    pub description: String,
    /// Request URL actually sent; absent when the variant could not be built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    /// Observed signal
    pub signal: StatusSignal,
    /// Comparison against the family baseline; absent for the baseline itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches_baseline: Option<bool>,
}

impl ProbeOutcome {
    /// Whether this is the comparison target of its family
    pub fn is_baseline(&self) -> bool {
        self.matches_baseline.is_none()
    }
}

/// Ordered outcomes of one family, baseline first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyReport {
    /// Which family produced the outcomes
    pub family: ProbeFamily,
    /// Outcomes in catalog order
    pub outcomes: Vec<ProbeOutcome>,
}

impl FamilyReport {
    /// Baseline outcome, if the family ran at all
    pub fn baseline(&self) -> Option<&ProbeOutcome> {
        self.outcomes.first()
    }

    /// Every outcome after the baseline
    pub fn variants(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.outcomes.iter().skip(1)
    }

    /// Variants whose signal matched the baseline
    pub fn matching(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.variants()
            .filter(|outcome| outcome.matches_baseline == Some(true))
    }

    /// Look up an outcome by test-case name
    pub fn outcome(&self, name: &str) -> Option<&ProbeOutcome> {
        self.outcomes.iter().find(|outcome| outcome.name == name)
    }
}
