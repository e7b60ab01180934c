// ! CSRF state probe
// !
// ! Single-shot check of whether the authorization server still proceeds when
// ! the `state` parameter is stripped from the request.

use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::probe::runner::HttpProbeRunner;
use crate::probe::types::StatusSignal;
use crate::utils::uri::{has_query_param, without_query_param};

/// Parameter the probe strips
pub const STATE_PARAM: &str = "state";

/// Classification of the state-stripped request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum StateFinding {
    /// The original request had no `state`; likely CSRF weakness, nothing sent
    NotPresent,
    /// The server answered 200 without `state`
    NotValidated {
        /// Observed signal
        signal: StatusSignal,
    },
    /// Any other answer, including redirects and transport errors
    Validated {
        /// Observed signal
        signal: StatusSignal,
    },
}

impl StateFinding {
    /// Whether the finding points at a possible CSRF weakness
    pub fn is_csrf_candidate(&self) -> bool {
        matches!(
            self,
            StateFinding::NotPresent | StateFinding::NotValidated { .. }
        )
    }
}

/// Result of the state probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProbeReport {
    /// Classification
    #[serde(flatten)]
    pub finding: StateFinding,
    /// URL sent without `state`; absent when nothing was sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
}

/// Run the state probe against `original`
pub async fn probe_state(runner: &HttpProbeRunner, original: &Url) -> StateProbeReport {
    if !has_query_param(original, STATE_PARAM) {
        info!(url = %original, "authorization request carries no state parameter");
        return StateProbeReport {
            finding: StateFinding::NotPresent,
            request_url: None,
        };
    }

    let stripped = without_query_param(original, STATE_PARAM);
    let signal = runner.dispatch(&stripped).await;
    let finding = match signal {
        StatusSignal::Status(200) => StateFinding::NotValidated { signal },
        signal => StateFinding::Validated { signal },
    };

    info!(url = %original, ?finding, "state probe finished");
    StateProbeReport {
        finding,
        request_url: Some(stripped.to_string()),
    }
}

#[cfg(test)]
#[cfg(not(coverage))]
mod tests {
    use super::*;
    use crate::core::config::ProbeConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn runner() -> HttpProbeRunner {
        HttpProbeRunner::new(ProbeConfig::default()).unwrap()
    }

    async fn server_answering(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/authorize"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_missing_state_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let original = Url::parse(&format!(
            "{}/authorize?client_id=x&redirect_uri=https://app.example/cb",
            server.uri()
        ))
        .unwrap();
        let report = probe_state(&runner(), &original).await;

        assert_eq!(report.finding, StateFinding::NotPresent);
        assert_eq!(report.request_url, None);
        assert!(report.finding.is_csrf_candidate());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ok_without_state_is_not_validated() {
        let server = server_answering(200).await;
        let original = Url::parse(&format!("{}/authorize?client_id=x&state=abc", server.uri())).unwrap();

        let report = probe_state(&runner(), &original).await;
        assert_eq!(
            report.finding,
            StateFinding::NotValidated {
                signal: StatusSignal::Status(200)
            }
        );
        assert!(report.finding.is_csrf_candidate());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.query(), Some("client_id=x"));
    }

    #[tokio::test]
    async fn test_forbidden_without_state_is_validated() {
        let server = server_answering(403).await;
        let original = Url::parse(&format!("{}/authorize?state=abc", server.uri())).unwrap();

        let report = probe_state(&runner(), &original).await;
        assert_eq!(
            report.finding,
            StateFinding::Validated {
                signal: StatusSignal::Status(403)
            }
        );
        assert!(!report.finding.is_csrf_candidate());
    }

    #[tokio::test]
    async fn test_redirect_and_error_count_as_validated() {
        let server = server_answering(302).await;
        let original = Url::parse(&format!("{}/authorize?state=abc", server.uri())).unwrap();
        let report = probe_state(&runner(), &original).await;
        assert_eq!(
            report.finding,
            StateFinding::Validated {
                signal: StatusSignal::OpaqueRedirect
            }
        );

        let unreachable = Url::parse("http://127.0.0.1:1/authorize?state=abc").unwrap();
        let report = probe_state(&runner(), &unreachable).await;
        assert!(matches!(
            report.finding,
            StateFinding::Validated {
                signal: StatusSignal::Error(_)
            }
        ));
    }

    #[test]
    fn test_report_serialization() {
        let report = StateProbeReport {
            finding: StateFinding::NotValidated {
                signal: StatusSignal::Status(200),
            },
            request_url: Some("https://idp.example/authorize".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "finding": "not_validated",
                "signal": {"kind": "status", "value": 200},
                "request_url": "https://idp.example/authorize"
            })
        );
    }
}
