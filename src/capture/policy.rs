// ! Capture qualification policy
// !
// ! Module decides whether an observed request URL is an authorization request
// ! worth recording.

use serde::{Deserialize, Serialize};

use crate::utils::uri::{has_query_param, parse_absolute};

/// Query parameters that mark a request as part of an OAuth/OpenID flow
pub const OAUTH_PARAMS: &[&str] = &[
    "client_id",
    "redirect_uri",
    "response_type",
    "response_mode",
    "scope",
    "state",
    "connection",
];

/// Predicate applied to every URL the capture feed delivers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePolicy {
    /// Qualify only when `redirect_uri` is present
    #[default]
    RedirectUriOnly,
    /// Qualify when any of [`OAUTH_PARAMS`] is present; noticeably noisier
    AnyOAuthParam,
}

impl CapturePolicy {
    /// Whether `url` qualifies for capture
    ///
    /// Unparseable input never qualifies.
    pub fn should_capture(&self, url: &str) -> bool {
        let Ok(parsed) = parse_absolute(url) else {
            return false;
        };

        match self {
            CapturePolicy::RedirectUriOnly => has_query_param(&parsed, "redirect_uri"),
            CapturePolicy::AnyOAuthParam => OAUTH_PARAMS
                .iter()
                .any(|param| has_query_param(&parsed, param)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_uri_only() {
        let policy = CapturePolicy::default();
        assert_eq!(policy, CapturePolicy::RedirectUriOnly);
        assert!(policy.should_capture(
            "https://idp.example/authorize?client_id=x&redirect_uri=https://app.example/cb"
        ));
        assert!(policy.should_capture("https://idp.example/authorize?redirect_uri="));
        assert!(!policy.should_capture("https://idp.example/authorize?client_id=x&state=s"));
        assert!(!policy.should_capture("https://idp.example/cb#redirect_uri=x"));
    }

    #[test]
    fn test_any_oauth_param() {
        let policy = CapturePolicy::AnyOAuthParam;
        assert!(policy.should_capture("https://idp.example/authorize?scope=openid"));
        assert!(policy.should_capture("https://login.example/?connection=google"));
        assert!(!policy.should_capture("https://cdn.example/app.js?v=3"));
    }

    #[test]
    fn test_malformed_never_qualifies() {
        for policy in [CapturePolicy::RedirectUriOnly, CapturePolicy::AnyOAuthParam] {
            assert!(!policy.should_capture("redirect_uri=https://app.example/cb"));
            assert!(!policy.should_capture(""));
            assert!(!policy.should_capture("http://"));
        }
    }
}
