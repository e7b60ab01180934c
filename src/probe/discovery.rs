// ! Discovery document fetchers
// !
// ! Module probes the two well-known discovery resources of an authorization
// ! server origin: the OpenID Connect configuration and WebFinger. Both are
// ! tolerant of failure; absence is a result, not an error.

use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::core::error::{ProbeError, ProbeResult};
use crate::core::logging::ErrorContext;

/// Path of the OpenID Connect discovery document
pub const OPENID_CONFIGURATION_PATH: &str = "/.well-known/openid-configuration";

/// Path of the WebFinger endpoint
pub const WEBFINGER_PATH: &str = "/.well-known/webfinger";

/// Keys lifted from an OpenID configuration into the summary
pub const CANONICAL_KEYS: &[&str] = &[
    "authorization_endpoint",
    "token_endpoint",
    "userinfo_endpoint",
    "jwks_uri",
    "registration_endpoint",
];

/// Which discovery resource a result describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryKind {
    /// `/.well-known/openid-configuration`
    OpenIdConfiguration,
    /// `/.well-known/webfinger`
    WebFinger,
}

/// Canonical endpoints advertised by an OpenID configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
    /// URL of the authorization endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,

    /// URL of the token endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    /// URL of the userinfo endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// URL of the JWKS endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// URL of the dynamic registration endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,
}

impl ProviderEndpoints {
    /// Pick the canonical keys out of a document; non-string values are ignored
    pub fn from_document(document: &Value) -> Self {
        let field = |key: &str| {
            document
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Self {
            authorization_endpoint: field("authorization_endpoint"),
            token_endpoint: field("token_endpoint"),
            userinfo_endpoint: field("userinfo_endpoint"),
            jwks_uri: field("jwks_uri"),
            registration_endpoint: field("registration_endpoint"),
        }
    }

    /// Present keys with their values, in canonical order
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let values = [
            &self.authorization_endpoint,
            &self.token_endpoint,
            &self.userinfo_endpoint,
            &self.jwks_uri,
            &self.registration_endpoint,
        ];
        CANONICAL_KEYS
            .iter()
            .zip(values)
            .filter_map(|(key, value)| value.as_deref().map(|v| (*key, v)))
            .collect()
    }

    /// Whether none of the canonical keys were found
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Outcome of one discovery fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Which resource was fetched
    pub kind: DiscoveryKind,
    /// Requested URL
    pub url: String,
    /// 2xx with a parseable JSON body
    pub exists: bool,
    /// HTTP status, when a response arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Transport or parse failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Parsed body, kept only when the document exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    /// Canonical endpoints, OpenID configuration only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<ProviderEndpoints>,
}

impl DiscoveryResult {
    fn absent(kind: DiscoveryKind, url: &Url, status: Option<u16>, error: Option<String>) -> Self {
        Self {
            kind,
            url: url.to_string(),
            exists: false,
            status,
            error,
            document: None,
            endpoints: None,
        }
    }
}

/// Fetcher for the well-known discovery documents of an origin
#[derive(Debug, Clone)]
pub struct DiscoveryFetcher {
    http_client: Client,
    webfinger_resource: String,
}

impl DiscoveryFetcher {
    /// Create a fetcher on top of an existing probe client
    pub fn with_client(client: Client, webfinger_resource: impl Into<String>) -> Self {
        Self {
            http_client: client,
            webfinger_resource: webfinger_resource.into(),
        }
    }

    /// Fetch `{origin}/.well-known/openid-configuration`
    pub async fn fetch_openid_configuration(&self, origin: &str) -> DiscoveryResult {
        let kind = DiscoveryKind::OpenIdConfiguration;
        let url = match build_well_known_url(origin, OPENID_CONFIGURATION_PATH) {
            Ok(url) => url,
            Err(e) => return invalid_origin(kind, origin, e),
        };

        let mut result = self.fetch(kind, url, "application/json").await;
        if let Some(document) = &result.document {
            let endpoints = ProviderEndpoints::from_document(document);
            debug!(found = endpoints.entries().len(), "openid configuration summary");
            result.endpoints = Some(endpoints);
        }
        result
    }

    /// Fetch `{origin}/.well-known/webfinger?resource=...`
    pub async fn fetch_webfinger(&self, origin: &str) -> DiscoveryResult {
        let kind = DiscoveryKind::WebFinger;
        let mut url = match build_well_known_url(origin, WEBFINGER_PATH) {
            Ok(url) => url,
            Err(e) => return invalid_origin(kind, origin, e),
        };
        url.query_pairs_mut()
            .append_pair("resource", &self.webfinger_resource);

        self.fetch(kind, url, "application/jrd+json, application/json")
            .await
    }

    async fn fetch(&self, kind: DiscoveryKind, url: Url, accept: &str) -> DiscoveryResult {
        let response = match self
            .http_client
            .get(url.as_str())
            .header(ACCEPT, accept)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let error = ProbeError::from(e);
                error.log_with_context(
                    &ErrorContext::new("discovery")
                        .with_component("discovery")
                        .with_target(url.as_str()),
                );
                return DiscoveryResult::absent(kind, &url, None, Some(error.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            info!(url = %url, status = status.as_u16(), "discovery document absent");
            return DiscoveryResult::absent(kind, &url, Some(status.as_u16()), None);
        }

        match response.json::<Value>().await {
            Ok(document) => {
                info!(url = %url, status = status.as_u16(), "discovery document found");
                DiscoveryResult {
                    kind,
                    url: url.to_string(),
                    exists: true,
                    status: Some(status.as_u16()),
                    error: None,
                    document: Some(document),
                    endpoints: None,
                }
            }
            Err(e) => DiscoveryResult::absent(
                kind,
                &url,
                Some(status.as_u16()),
                Some(format!("Invalid discovery JSON: {e}")),
            ),
        }
    }
}

/// Resolve a well-known path against the origin of `origin`
pub fn build_well_known_url(origin: &str, well_known_path: &str) -> ProbeResult<Url> {
    let base = Url::parse(origin)
        .map_err(|e| ProbeError::malformed(format!("Invalid origin '{origin}': {e}")))?;

    base.join(well_known_path)
        .map_err(|e| ProbeError::malformed(format!("Failed to build discovery URL: {e}")))
}

fn invalid_origin(kind: DiscoveryKind, origin: &str, error: ProbeError) -> DiscoveryResult {
    DiscoveryResult {
        kind,
        url: origin.to_string(),
        exists: false,
        status: None,
        error: Some(error.to_string()),
        document: None,
        endpoints: None,
    }
}
