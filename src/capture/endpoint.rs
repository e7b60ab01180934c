// ! Captured endpoint
// !
// ! Module defines the unit of deduplication, the exact authorization URL as
// ! observed, and a compact summary for hand-off to a presentation layer.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capture::policy::OAUTH_PARAMS;
use crate::core::error::ProbeResult;
use crate::utils::uri::{origin_of, parse_absolute};

/// An observed authorization URL, compared by exact string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedEndpoint(String);

impl CapturedEndpoint {
    /// Wrap an already validated URL
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The URL exactly as captured
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Origin and path plus the OAuth parameters the URL carries
    pub fn summary(&self) -> ProbeResult<EndpointSummary> {
        let url = parse_absolute(&self.0)?;
        let params = url
            .query_pairs()
            .filter(|(key, _)| OAUTH_PARAMS.iter().any(|param| key == param))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Ok(EndpointSummary {
            endpoint: format!("{}{}", origin_of(&url), url.path()),
            params,
        })
    }
}

impl fmt::Display for CapturedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CapturedEndpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compact description of a captured endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSummary {
    /// `origin + path`, without the query
    pub endpoint: String,
    /// OAuth-related query parameters, in URL order
    pub params: Vec<(String, String)>,
}
