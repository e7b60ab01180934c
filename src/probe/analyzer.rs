// ! Analysis orchestration
// !
// ! Module composes the probe families for one authorization URL into an
// ! [`AnalysisReport`]. Families run concurrently under a small permit pool;
// ! requests inside a family stay sequential.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{Instrument, info, warn};
use uuid::Uuid;

use crate::capture::CapturedEndpoint;
use crate::core::config::ProbeConfig;
use crate::core::error::{ProbeError, ProbeResult};
use crate::core::logging::{ErrorContext, ErrorLogger};
use crate::probe::discovery::DiscoveryFetcher;
use crate::probe::report::AnalysisReport;
use crate::probe::runner::HttpProbeRunner;
use crate::probe::state::probe_state;
use crate::probe::types::ProbeFamily;
use crate::utils::uri::{origin_of, parse_absolute};

/// Runs every probe against an authorization URL
#[derive(Debug)]
pub struct Analyzer {
    runner: HttpProbeRunner,
    discovery: DiscoveryFetcher,
    limiter: Arc<Semaphore>,
    in_flight: Mutex<HashSet<String>>,
}

/// Removes a URL from the in-flight set when the run ends
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    url: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut set = self
            .set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.url);
    }
}

impl Analyzer {
    /// Create an analyzer; fails on invalid configuration
    pub fn new(config: ProbeConfig) -> ProbeResult<Self> {
        config.validate()?;
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_families));
        let runner = HttpProbeRunner::new(config)?;
        let discovery = DiscoveryFetcher::with_client(
            runner.client().clone(),
            runner.config().webfinger_resource.clone(),
        );

        Ok(Self {
            runner,
            discovery,
            limiter,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ProbeConfig {
        self.runner.config()
    }

    /// Analyze a captured endpoint
    pub async fn analyze_endpoint(&self, endpoint: &CapturedEndpoint) -> ProbeResult<AnalysisReport> {
        self.analyze(endpoint.as_str()).await
    }

    /// Analyze every endpoint of a capture snapshot
    ///
    /// Runs share the family permit pool, so the total number of families in
    /// flight stays capped. Results keep the order of `endpoints`.
    pub async fn analyze_all(&self, endpoints: &[CapturedEndpoint]) -> Vec<ProbeResult<AnalysisReport>> {
        join_all(endpoints.iter().map(|endpoint| self.analyze_endpoint(endpoint))).await
    }

    /// Run all probes against `url` and assemble the report
    ///
    /// Only input problems fail the call: every network failure is recorded
    /// inside the report. A second call for a URL whose run has not finished
    /// yet returns [`ProbeError::AnalysisInProgress`].
    pub async fn analyze(&self, url: &str) -> ProbeResult<AnalysisReport> {
        let original = parse_absolute(url).inspect_err(|e| {
            e.log_with_context(&ErrorContext::new("analyze").with_component("analyzer"));
        })?;
        let _guard = self.claim(url)?;

        let run_id = Uuid::new_v4();
        let origin = origin_of(&original);
        let span = ErrorLogger::create_run_span(&run_id.to_string(), url);

        async move {
            let started_at = Utc::now();
            let clock = Instant::now();
            info!(%origin, "analysis started");

            let (redirect_uri, parameter_acceptance, state, openid_configuration, webfinger) = tokio::join!(
                self.limited(self.runner.run_family(&original, ProbeFamily::RedirectUri)),
                self.limited(self.runner.run_family(&original, ProbeFamily::ParameterAcceptance)),
                self.limited(probe_state(&self.runner, &original)),
                self.limited(self.discovery.fetch_openid_configuration(&origin)),
                self.limited(self.discovery.fetch_webfinger(&origin)),
            );

            let report = AnalysisReport {
                run_id,
                url: url.to_string(),
                origin: origin.clone(),
                started_at,
                elapsed_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
                redirect_uri: redirect_uri?,
                parameter_acceptance: parameter_acceptance?,
                state: state?,
                openid_configuration: openid_configuration?,
                webfinger: webfinger?,
            };

            info!(
                elapsed_ms = report.elapsed_ms,
                open_redirect_candidates = report.open_redirect_candidates().count(),
                accepted_parameters = report.accepted_parameters().count(),
                csrf_candidate = report.state.finding.is_csrf_candidate(),
                "analysis finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    fn claim(&self, url: &str) -> ProbeResult<InFlightGuard<'_>> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !set.insert(url.to_string()) {
            warn!(url, "analysis already running");
            return Err(ProbeError::AnalysisInProgress(url.to_string()));
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            url: url.to_string(),
        })
    }

    async fn limited<F: Future>(&self, family: F) -> ProbeResult<F::Output> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| ProbeError::internal(format!("Family limiter closed: {e}")))?;
        Ok(family.await)
    }
}
