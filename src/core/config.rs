// ! Probe configuration
// !
// ! Module defines the knobs shared by the probe engine: network timeouts,
// ! the destinations used by redirect-URI mutations and the family concurrency cap.

use std::time::Duration;

use url::Url;

use crate::core::error::{ProbeError, ProbeResult};

/// Default destination for the "Different Domain" test case
pub const DEFAULT_DIFFERENT_DOMAIN: &str = "https://example.com";

/// Default attacker-controlled domain used by the crafted redirect URIs
pub const DEFAULT_ATTACKER_DOMAIN: &str = "attacker.com";

/// Default WebFinger resource; only endpoint existence matters
pub const DEFAULT_WEBFINGER_RESOURCE: &str = "acct:admin";

/// Configuration for the probe engine
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// User-Agent sent with every probe request
    pub user_agent: String,
    /// Unrelated origin substituted by the "Different Domain" test case
    pub different_domain: String,
    /// Domain the crafted redirect URIs point at
    pub attacker_domain: String,
    /// Resource queried on the WebFinger endpoint
    pub webfinger_resource: String,
    /// How many probe families may run at the same time
    pub max_concurrent_families: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("oauth-probe/{}", env!("CARGO_PKG_VERSION")),
            different_domain: DEFAULT_DIFFERENT_DOMAIN.to_string(),
            attacker_domain: DEFAULT_ATTACKER_DOMAIN.to_string(),
            webfinger_resource: DEFAULT_WEBFINGER_RESOURCE.to_string(),
            max_concurrent_families: 2,
        }
    }
}

impl ProbeConfig {
    /// Create a new probe configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the User-Agent header value
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the "Different Domain" destination
    pub fn with_different_domain(mut self, origin: impl Into<String>) -> Self {
        self.different_domain = origin.into();
        self
    }

    /// Set the attacker domain
    pub fn with_attacker_domain(mut self, domain: impl Into<String>) -> Self {
        self.attacker_domain = domain.into();
        self
    }

    /// Set the WebFinger resource
    pub fn with_webfinger_resource(mut self, resource: impl Into<String>) -> Self {
        self.webfinger_resource = resource.into();
        self
    }

    /// Set the family concurrency cap
    pub fn with_max_concurrent_families(mut self, max: usize) -> Self {
        self.max_concurrent_families = max;
        self
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> ProbeResult<()> {
        if self.max_concurrent_families == 0 {
            return Err(ProbeError::config(
                "max_concurrent_families must be at least 1",
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ProbeError::config("request_timeout must be non-zero"));
        }

        Url::parse(&self.different_domain).map_err(|e| {
            ProbeError::config(format!(
                "different_domain '{}' is not an absolute URL: {e}",
                self.different_domain
            ))
        })?;

        let domain = self.attacker_domain.as_str();
        if domain.is_empty() || domain.contains(['/', '?', '#', '@', ' ']) {
            return Err(ProbeError::config(format!(
                "attacker_domain '{domain}' must be a bare host name"
            )));
        }

        Ok(())
    }
}
