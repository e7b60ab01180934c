// ! URL mutation rules
// !
// ! Pure functions deriving test-case variants from an original authorization
// ! URL. No I/O happens here; a variant that cannot be derived is reported as
// ! an error so the runner can record it without sending anything.

use url::Url;

use crate::core::config::ProbeConfig;
use crate::core::error::{ProbeError, ProbeResult};
use crate::probe::catalog::{Mutation, RedirectMutation};
use crate::utils::uri::{host_with_port, query_param, with_query_param};

/// Character inserted in place of the escaped dot
pub const DOT_ESCAPE_MARKER: char = 'X';

/// Parameter rewritten by the redirect-URI family
pub const REDIRECT_URI_PARAM: &str = "redirect_uri";

/// Apply `mutation` to a copy of `original`
pub fn derive_variant(
    original: &Url,
    mutation: &Mutation,
    config: &ProbeConfig,
) -> ProbeResult<Url> {
    match mutation {
        Mutation::Unchanged => Ok(original.clone()),
        Mutation::SetParam { name, value } => Ok(with_query_param(original, name, value)),
        Mutation::RedirectUri(rule) => {
            let redirect_uri = query_param(original, REDIRECT_URI_PARAM).ok_or_else(|| {
                ProbeError::malformed("authorization URL has no redirect_uri parameter")
            })?;
            let mutated = mutate_redirect_uri(*rule, &redirect_uri, config)?;
            Ok(with_query_param(original, REDIRECT_URI_PARAM, &mutated))
        }
    }
}

/// Derive the replacement `redirect_uri` value for `rule`
pub fn mutate_redirect_uri(
    rule: RedirectMutation,
    redirect_uri: &str,
    config: &ProbeConfig,
) -> ProbeResult<String> {
    let attacker = config.attacker_domain.as_str();
    let target = || RedirectTarget::parse(redirect_uri);

    let mutated = match rule {
        // raw-string rewrites, usable even when the value does not parse
        RedirectMutation::DifferentDomain => config.different_domain.clone(),
        RedirectMutation::HttpDowngrade => redirect_uri.replacen("https://", "http://", 1),
        RedirectMutation::QueryAppend => format!("{redirect_uri}?"),

        RedirectMutation::SubdomainAttack => {
            format!("https://{}.{attacker}", target()?.hostname)
        }
        RedirectMutation::ProtocolRelative => format!("//{attacker}{}", target()?.path),
        RedirectMutation::UrlParsingTrick => {
            let t = target()?;
            format!("https://{attacker}\\@{}{}", t.host, t.path)
        }
        RedirectMutation::ParameterTrick => {
            let t = target()?;
            format!("https://{attacker}?@{}{}", t.host, t.path)
        }
        RedirectMutation::CrlfInjection => {
            let t = target()?;
            format!("https://{attacker}%0d%0a{}{}", t.host, t.path)
        }
        RedirectMutation::RelativePath => {
            let t = target()?;
            format!("{}://{}{}/../redirect", t.scheme, t.host, t.path)
        }
        RedirectMutation::DotEscaping => {
            let t = target()?;
            t.with_hostname(&escape_host_dot(&t.hostname)?)
        }
    };

    Ok(mutated)
}

/// Merge the second-to-last host label into its left neighbour
///
/// `auth.target.com` becomes `authXtarget.com`. A two-label host has no such
/// neighbour, so its single dot is replaced instead.
pub fn escape_host_dot(hostname: &str) -> ProbeResult<String> {
    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(ProbeError::malformed(format!(
            "host '{hostname}' has no dot to escape"
        )));
    }

    let escaped_dot = labels.len().saturating_sub(3);
    let mut merged = String::with_capacity(hostname.len());
    for (idx, label) in labels.iter().enumerate() {
        if idx > 0 {
            merged.push(if idx - 1 == escaped_dot {
                DOT_ESCAPE_MARKER
            } else {
                '.'
            });
        }
        merged.push_str(label);
    }

    Ok(merged)
}

/// Components of the registered redirect URI the templates interpolate
#[derive(Debug, Clone)]
struct RedirectTarget {
    scheme: String,
    hostname: String,
    /// Hostname plus explicit port
    host: String,
    path: String,
    port: Option<u16>,
    query: Option<String>,
    fragment: Option<String>,
}

impl RedirectTarget {
    fn parse(raw: &str) -> ProbeResult<Self> {
        let url = Url::parse(raw)
            .map_err(|e| ProbeError::malformed(format!("Invalid redirect_uri '{raw}': {e}")))?;
        let hostname = url
            .host_str()
            .ok_or_else(|| ProbeError::malformed(format!("redirect_uri '{raw}' has no host")))?
            .to_string();
        let host = host_with_port(&url).unwrap_or_else(|| hostname.clone());

        Ok(Self {
            scheme: url.scheme().to_string(),
            hostname,
            host,
            path: url.path().to_string(),
            port: url.port(),
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        })
    }

    /// Same URI with the hostname swapped
    fn with_hostname(&self, hostname: &str) -> String {
        let mut uri = format!("{}://{}", self.scheme, hostname);
        if let Some(port) = self.port {
            uri.push_str(&format!(":{port}"));
        }
        uri.push_str(&self.path);
        if let Some(query) = &self.query {
            uri.push('?');
            uri.push_str(query);
        }
        if let Some(fragment) = &self.fragment {
            uri.push('#');
            uri.push_str(fragment);
        }
        uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::catalog::REDIRECT_URI_CASES;
    use pretty_assertions::assert_eq;

    const REGISTERED: &str = "https://auth.example.com/cb";

    fn mutate(rule: RedirectMutation, uri: &str) -> String {
        mutate_redirect_uri(rule, uri, &ProbeConfig::default()).unwrap()
    }

    #[test]
    fn test_redirect_uri_templates() {
        use RedirectMutation::*;

        assert_eq!(mutate(DifferentDomain, REGISTERED), "https://example.com");
        assert_eq!(
            mutate(SubdomainAttack, REGISTERED),
            "https://auth.example.com.attacker.com"
        );
        assert_eq!(mutate(ProtocolRelative, REGISTERED), "//attacker.com/cb");
        assert_eq!(
            mutate(UrlParsingTrick, REGISTERED),
            "https://attacker.com\\@auth.example.com/cb"
        );
        assert_eq!(
            mutate(ParameterTrick, REGISTERED),
            "https://attacker.com?@auth.example.com/cb"
        );
        assert_eq!(mutate(HttpDowngrade, REGISTERED), "http://auth.example.com/cb");
        assert_eq!(
            mutate(CrlfInjection, REGISTERED),
            "https://attacker.com%0d%0aauth.example.com/cb"
        );
        assert_eq!(
            mutate(RelativePath, REGISTERED),
            "https://auth.example.com/cb/../redirect"
        );
        assert_eq!(mutate(QueryAppend, REGISTERED), "https://auth.example.com/cb?");
        assert_eq!(mutate(DotEscaping, REGISTERED), "https://authXexample.com/cb");
    }

    #[test]
    fn test_http_downgrade_without_https_is_unchanged() {
        assert_eq!(
            mutate(RedirectMutation::HttpDowngrade, "http://app.example/cb"),
            "http://app.example/cb"
        );
        assert_eq!(
            mutate(RedirectMutation::HttpDowngrade, "com.example.app:/cb"),
            "com.example.app:/cb"
        );
    }

    #[test]
    fn test_port_is_kept_where_host_is_interpolated() {
        let uri = "https://app.example:8443/oauth/cb";
        assert_eq!(
            mutate(RedirectMutation::ProtocolRelative, uri),
            "//attacker.com/oauth/cb"
        );
        assert_eq!(
            mutate(RedirectMutation::SubdomainAttack, uri),
            "https://app.example.attacker.com"
        );
        assert_eq!(
            mutate(RedirectMutation::RelativePath, uri),
            "https://app.example:8443/oauth/cb/../redirect"
        );
    }

    #[test]
    fn test_escape_host_dot() {
        assert_eq!(escape_host_dot("auth.target.com").unwrap(), "authXtarget.com");
        assert_eq!(
            escape_host_dot("www.oauth.target.com").unwrap(),
            "www.oauthXtarget.com"
        );
        assert_eq!(escape_host_dot("target.com").unwrap(), "targetXcom");
        assert!(escape_host_dot("localhost").is_err());
    }

    #[test]
    fn test_dot_escaping_keeps_rest_of_uri() {
        assert_eq!(
            mutate(
                RedirectMutation::DotEscaping,
                "https://www.oauth.target.com:8443/cb?x=1#frag"
            ),
            "https://www.oauthXtarget.com:8443/cb?x=1#frag"
        );
    }

    #[test]
    fn test_configurable_destinations() {
        let config = ProbeConfig::default()
            .with_different_domain("https://unrelated.test")
            .with_attacker_domain("evil.test");

        assert_eq!(
            mutate_redirect_uri(RedirectMutation::DifferentDomain, REGISTERED, &config).unwrap(),
            "https://unrelated.test"
        );
        assert_eq!(
            mutate_redirect_uri(RedirectMutation::ProtocolRelative, REGISTERED, &config).unwrap(),
            "//evil.test/cb"
        );
    }

    #[test]
    fn test_unparseable_redirect_uri() {
        let config = ProbeConfig::default();
        assert!(
            mutate_redirect_uri(RedirectMutation::SubdomainAttack, "/relative/cb", &config)
                .is_err()
        );
        // raw-string rules still apply
        assert_eq!(
            mutate_redirect_uri(RedirectMutation::QueryAppend, "/relative/cb", &config).unwrap(),
            "/relative/cb?"
        );
    }

    #[test]
    fn test_derive_variant_substitutes_into_full_url() {
        let original = Url::parse(
            "https://idp.example/authorize?client_id=x&redirect_uri=https%3A%2F%2Fapp.example%2Fcb&state=s1",
        )
        .unwrap();
        let config = ProbeConfig::default();

        for test_case in REDIRECT_URI_CASES {
            let variant = derive_variant(&original, &test_case.mutation, &config).unwrap();
            assert_eq!(variant.path(), "/authorize");
            assert_eq!(query_param(&variant, "client_id").as_deref(), Some("x"));
            assert_eq!(query_param(&variant, "state").as_deref(), Some("s1"));
        }

        let protocol_relative = derive_variant(
            &original,
            &Mutation::RedirectUri(RedirectMutation::ProtocolRelative),
            &config,
        )
        .unwrap();
        assert_eq!(
            query_param(&protocol_relative, REDIRECT_URI_PARAM).as_deref(),
            Some("//attacker.com/cb")
        );
    }

    #[test]
    fn test_derive_variant_set_param() {
        let original = Url::parse("https://idp.example/authorize?response_type=code").unwrap();
        let variant = derive_variant(
            &original,
            &Mutation::SetParam {
                name: "response_type",
                value: "code id_token",
            },
            &ProbeConfig::default(),
        )
        .unwrap();
        assert_eq!(variant.query(), Some("response_type=code+id_token"));
    }

    #[test]
    fn test_missing_redirect_uri() {
        let original = Url::parse("https://idp.example/authorize?client_id=x").unwrap();
        let result = derive_variant(
            &original,
            &Mutation::RedirectUri(RedirectMutation::SubdomainAttack),
            &ProbeConfig::default(),
        );
        assert!(matches!(result, Err(ProbeError::MalformedInput(_))));
    }
}
