// ! HTTP probe runner
// !
// ! Module dispatches the baseline and variant requests of a probe family and
// ! classifies every variant against the baseline.
// !
// ! Requests carry no credentials and never follow redirects.

use reqwest::{Client, redirect};
use tracing::{debug, info};
use url::Url;

use crate::core::config::ProbeConfig;
use crate::core::error::{ProbeError, ProbeResult};
use crate::core::logging::ErrorContext;
use crate::probe::catalog::{self, ProbeTestCase};
use crate::probe::mutator::derive_variant;
use crate::probe::types::{FamilyReport, ProbeFamily, ProbeOutcome, StatusSignal};

/// Build the HTTP client every probe request goes through
///
/// No cookie store, no default auth headers, no redirect following.
pub fn build_probe_client(config: &ProbeConfig) -> ProbeResult<Client> {
    Client::builder()
        .redirect(redirect::Policy::none())
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| ProbeError::Http(format!("Failed to create HTTP client: {e}")))
}

/// Sequential dispatcher for one probe family at a time
#[derive(Debug, Clone)]
pub struct HttpProbeRunner {
    client: Client,
    config: ProbeConfig,
}

impl HttpProbeRunner {
    /// Create a runner with its own client
    pub fn new(config: ProbeConfig) -> ProbeResult<Self> {
        let client = build_probe_client(&config)?;
        Ok(Self { client, config })
    }

    /// Underlying client, shared with the other probes of a run
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Configuration the runner derives variants with
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Send one GET and reduce the result to a status signal
    ///
    /// Never fails: transport problems become [`StatusSignal::Error`].
    pub async fn dispatch(&self, url: &Url) -> StatusSignal {
        match self.client.get(url.as_str()).send().await {
            Ok(response) => {
                let signal = StatusSignal::from_status(response.status().as_u16());
                debug!(url = %url, status = response.status().as_u16(), %signal, "probe response");
                signal
            }
            Err(e) => {
                let error = ProbeError::from(e);
                error.log_with_context(
                    &ErrorContext::new("dispatch")
                        .with_component("runner")
                        .with_target(url.as_str()),
                );
                StatusSignal::Error(error.to_string())
            }
        }
    }

    /// Run the catalog of `family` against `original`
    pub async fn run_family(&self, original: &Url, family: ProbeFamily) -> FamilyReport {
        self.run_cases(original, family, catalog::cases(family)).await
    }

    /// Run `cases` in order; the first case is the baseline
    ///
    /// Each request completes before the next one starts. A variant that
    /// cannot be derived is recorded as an error without sending anything.
    pub async fn run_cases(
        &self,
        original: &Url,
        family: ProbeFamily,
        cases: &[ProbeTestCase],
    ) -> FamilyReport {
        let mut outcomes = Vec::with_capacity(cases.len());
        let mut baseline: Option<StatusSignal> = None;

        for test_case in cases {
            let (request_url, signal) =
                match derive_variant(original, &test_case.mutation, &self.config) {
                    Ok(variant) => {
                        let signal = self.dispatch(&variant).await;
                        (Some(variant.to_string()), signal)
                    }
                    Err(e) => {
                        debug!(case = test_case.name, "variant not derived: {e}");
                        (None, StatusSignal::Error(e.to_string()))
                    }
                };

            let matches_baseline = match &baseline {
                Some(reference) => Some(signal.matches(reference)),
                None => {
                    baseline = Some(signal.clone());
                    None
                }
            };

            outcomes.push(ProbeOutcome {
                name: test_case.name.to_string(),
                description: test_case.description.to_string(),
                request_url,
                signal,
                matches_baseline,
            });
        }

        let report = FamilyReport { family, outcomes };
        info!(
            family = family.as_str(),
            cases = report.outcomes.len(),
            matching = report.matching().count(),
            "probe family finished"
        );
        report
    }
}

#[cfg(test)]
#[cfg(not(coverage))]
mod tests {
    use super::*;
    use crate::probe::catalog::{BASELINE, Mutation, REDIRECT_URI_CASES};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn authorize_url(base: &str) -> Url {
        Url::parse(&format!(
            "{base}/authorize?client_id=x&redirect_uri=https%3A%2F%2Fapp.example%2Fcb&state=s1"
        ))
        .unwrap()
    }

    fn runner() -> HttpProbeRunner {
        HttpProbeRunner::new(ProbeConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_is_opaque_and_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/authorize"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", "https://app.example/cb?code=1"),
            )
            .mount(&server)
            .await;

        let signal = runner().dispatch(&authorize_url(&server.uri())).await;
        assert_eq!(signal, StatusSignal::OpaqueRedirect);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_credentials_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).insert_header("Set-Cookie", "sid=abc; Path=/"))
            .mount(&server)
            .await;

        let runner = runner();
        let url = authorize_url(&server.uri());
        runner.dispatch(&url).await;
        runner.dispatch(&url).await;

        for request in server.received_requests().await.unwrap() {
            assert!(request.headers.get("cookie").is_none());
            assert!(request.headers.get("authorization").is_none());
        }
    }

    #[tokio::test]
    async fn test_strict_server_only_baseline_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/authorize"))
            .and(query_param("redirect_uri", "https://app.example/cb"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "https://app.example/cb"))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/authorize"))
            .respond_with(ResponseTemplate::new(400))
            .with_priority(10)
            .mount(&server)
            .await;

        let report = runner()
            .run_family(&authorize_url(&server.uri()), ProbeFamily::RedirectUri)
            .await;

        assert_eq!(report.outcomes.len(), 11);
        let baseline = report.baseline().unwrap();
        assert_eq!(baseline.name, BASELINE);
        assert_eq!(baseline.signal, StatusSignal::OpaqueRedirect);
        assert_eq!(baseline.matches_baseline, None);

        for outcome in report.variants() {
            assert_eq!(outcome.signal, StatusSignal::Status(400), "{}", outcome.name);
            assert_eq!(outcome.matches_baseline, Some(false));
        }
        assert_eq!(report.matching().count(), 0);

        // catalog order is kept
        let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
        let expected: Vec<&str> = REDIRECT_URI_CASES.iter().map(|c| c.name).collect();
        assert_eq!(names, expected);
        assert_eq!(server.received_requests().await.unwrap().len(), 11);
    }

    #[tokio::test]
    async fn test_permissive_server_matches_everything() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let report = runner()
            .run_family(
                &authorize_url(&server.uri()),
                ProbeFamily::ParameterAcceptance,
            )
            .await;

        assert_eq!(report.outcomes.len(), 10);
        assert_eq!(report.matching().count(), 9);

        let requests = server.received_requests().await.unwrap();
        assert!(
            requests
                .iter()
                .any(|r| r.url.query().unwrap_or("").contains("response_type=code+id_token"))
        );
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_abort_family() {
        // nothing listens on port 1
        let original = authorize_url("http://127.0.0.1:1");
        let report = runner().run_family(&original, ProbeFamily::RedirectUri).await;

        assert_eq!(report.outcomes.len(), 11);
        for outcome in &report.outcomes {
            assert!(outcome.signal.is_error(), "{}", outcome.name);
        }
        // an error baseline never matches anything
        assert_eq!(report.matching().count(), 0);
    }

    #[tokio::test]
    async fn test_underivable_variant_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let original = Url::parse(&format!("{}/authorize?client_id=x", server.uri())).unwrap();
        let report = runner().run_family(&original, ProbeFamily::RedirectUri).await;

        assert_eq!(report.baseline().unwrap().signal, StatusSignal::Status(200));
        for outcome in report.variants() {
            assert!(outcome.signal.is_error());
            assert_eq!(outcome.request_url, None);
            assert_eq!(outcome.matches_baseline, Some(false));
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_cases_classification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("prompt", "none"))
            .respond_with(ResponseTemplate::new(404))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(303))
            .with_priority(10)
            .mount(&server)
            .await;

        let cases = [
            ProbeTestCase {
                name: BASELINE,
                mutation: Mutation::Unchanged,
                description: "",
            },
            ProbeTestCase {
                name: "prompt=none",
                mutation: Mutation::SetParam {
                    name: "prompt",
                    value: "none",
                },
                description: "",
            },
            ProbeTestCase {
                name: "prompt=login",
                mutation: Mutation::SetParam {
                    name: "prompt",
                    value: "login",
                },
                description: "",
            },
        ];

        let report = runner()
            .run_cases(
                &authorize_url(&server.uri()),
                ProbeFamily::ParameterAcceptance,
                &cases,
            )
            .await;

        assert_eq!(report.outcomes[0].signal, StatusSignal::OpaqueRedirect);
        assert_eq!(report.outcomes[1].signal, StatusSignal::Status(404));
        assert_eq!(report.outcomes[1].matches_baseline, Some(false));
        assert_eq!(report.outcomes[2].matches_baseline, Some(true));
    }
}
