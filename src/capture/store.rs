// ! Capture store
// !
// ! Module implements the deduplicating, counted collection of observed
// ! authorization URLs. Every mutation runs check-then-update-then-persist
// ! under a single lock, and the in-memory state only changes once the
// ! backend write has succeeded.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use futures::FutureExt;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::capture::endpoint::CapturedEndpoint;
use crate::capture::persistence::{
    CAPTURE_RECORD_KEY, CaptureRecord, KeyValueStore, MemoryStore,
};
use crate::capture::policy::CapturePolicy;
use crate::core::error::{ProbeError, ProbeResult};
use crate::core::logging::ErrorContext;
use crate::utils::uri::parse_absolute;

/// One request reported by the interception hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedRequest {
    /// Absolute request URL
    pub url: String,
    /// Browsing context that issued the request; `None` for background traffic
    pub tab_id: Option<i64>,
}

impl ObservedRequest {
    /// Request issued from a browsing context
    pub fn from_tab(url: impl Into<String>, tab_id: i64) -> Self {
        Self {
            url: url.into(),
            tab_id: Some(tab_id),
        }
    }

    /// Request not attributed to any browsing context
    pub fn background(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tab_id: None,
        }
    }
}

/// What `record` did with a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Appended; carries the new counter value
    Added {
        /// Counter after the append
        counter: u64,
    },
    /// Already present, nothing changed
    Duplicate,
    /// Malformed or not qualifying, nothing changed
    Rejected,
}

/// Read-only view of the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSnapshot {
    /// Unique endpoints in discovery order
    pub endpoints: Vec<CapturedEndpoint>,
    /// Number of unique captures
    pub counter: u64,
}

/// Observations spawned by a capture feed that have not been reaped yet
#[derive(Default)]
struct FeedTasks {
    tasks: JoinSet<ProbeResult<RecordOutcome>>,
    added: usize,
}

impl FeedTasks {
    fn spawn(&mut self, store: Arc<CaptureStore>, request: ObservedRequest) {
        self.tasks.spawn(async move { store.observe(&request).await });
    }

    fn settle(&mut self, joined: Result<ProbeResult<RecordOutcome>, JoinError>) {
        match joined {
            Ok(Ok(RecordOutcome::Added { .. })) => self.added += 1,
            Ok(Ok(_)) => {}
            // already logged by `record`
            Ok(Err(_)) => {}
            Err(e) => warn!("capture task failed: {e}"),
        }
    }

    /// Settle every observation that has already finished, without waiting
    fn reap_ready(&mut self) {
        while let Some(Some(joined)) = self.tasks.join_next().now_or_never() {
            self.settle(joined);
        }
    }

    fn pending(&self) -> usize {
        self.tasks.len()
    }

    async fn finish(mut self) -> usize {
        while let Some(joined) = self.tasks.join_next().await {
            self.settle(joined);
        }
        self.added
    }
}

/// Deduplicating store of captured authorization URLs
pub struct CaptureStore {
    policy: CapturePolicy,
    backend: Arc<dyn KeyValueStore>,
    state: Mutex<CaptureRecord>,
    counter_tx: watch::Sender<u64>,
}

impl CaptureStore {
    /// Load the persisted record, writing the empty default when none exists
    pub async fn load(backend: Arc<dyn KeyValueStore>, policy: CapturePolicy) -> ProbeResult<Self> {
        let record = match backend.get(CAPTURE_RECORD_KEY).await? {
            Some(value) => {
                let record: CaptureRecord = serde_json::from_value(value).map_err(|e| {
                    ProbeError::persistence(format!("Stored capture record is invalid: {e}"))
                })?;
                if record.is_consistent() {
                    record
                } else {
                    let repaired = record.repaired();
                    warn!(
                        counter = repaired.counter,
                        "repaired inconsistent capture record"
                    );
                    backend
                        .set(CAPTURE_RECORD_KEY, serde_json::to_value(&repaired)?)
                        .await?;
                    repaired
                }
            }
            None => {
                let record = CaptureRecord::default();
                backend
                    .set(CAPTURE_RECORD_KEY, serde_json::to_value(&record)?)
                    .await?;
                record
            }
        };

        info!(
            endpoints = record.counter,
            policy = ?policy,
            "capture store loaded"
        );

        let (counter_tx, _) = watch::channel(record.counter);
        Ok(Self {
            policy,
            backend,
            state: Mutex::new(record),
            counter_tx,
        })
    }

    /// Empty store backed by a [`MemoryStore`]
    pub fn in_memory(policy: CapturePolicy) -> Self {
        let (counter_tx, _) = watch::channel(0);
        Self {
            policy,
            backend: Arc::new(MemoryStore::new()),
            state: Mutex::new(CaptureRecord::default()),
            counter_tx,
        }
    }

    /// Active qualification policy
    pub fn policy(&self) -> CapturePolicy {
        self.policy
    }

    /// Whether `url` qualifies under the active policy
    pub fn should_capture(&self, url: &str) -> bool {
        self.policy.should_capture(url)
    }

    /// Append `url` unless the exact string is already present
    ///
    /// A malformed URL is `Rejected`. A failed backend write returns the
    /// persistence error and leaves the store unchanged.
    pub async fn record(&self, url: &str) -> ProbeResult<RecordOutcome> {
        if parse_absolute(url).is_err() {
            debug!(url, "rejected malformed capture candidate");
            return Ok(RecordOutcome::Rejected);
        }

        let mut state = self.state.lock().await;
        if state.endpoints.iter().any(|known| known == url) {
            return Ok(RecordOutcome::Duplicate);
        }

        let mut next = state.clone();
        next.endpoints.push(url.to_string());
        next.counter += 1;

        if let Err(e) = self.persist(&next).await {
            e.log_with_context(
                &ErrorContext::new("record")
                    .with_component("capture")
                    .with_target(url),
            );
            return Err(e);
        }

        let counter = next.counter;
        *state = next;
        self.counter_tx.send_replace(counter);
        info!(url, counter, "captured authorization endpoint");

        Ok(RecordOutcome::Added { counter })
    }

    /// Apply the feed filters, then record
    ///
    /// Background requests and URLs that fail the policy are `Rejected`.
    pub async fn observe(&self, request: &ObservedRequest) -> ProbeResult<RecordOutcome> {
        if request.tab_id.is_none() || !self.should_capture(&request.url) {
            return Ok(RecordOutcome::Rejected);
        }
        self.record(&request.url).await
    }

    /// Reset to `{[], 0}`
    pub async fn clear(&self) -> ProbeResult<()> {
        let mut state = self.state.lock().await;
        let empty = CaptureRecord::default();

        if let Err(e) = self.persist(&empty).await {
            e.log_with_context(&ErrorContext::new("clear").with_component("capture"));
            return Err(e);
        }

        *state = empty;
        self.counter_tx.send_replace(0);
        info!("capture store cleared");
        Ok(())
    }

    /// Current endpoints and counter
    pub async fn snapshot(&self) -> CaptureSnapshot {
        let state = self.state.lock().await;
        CaptureSnapshot {
            endpoints: state
                .endpoints
                .iter()
                .map(|url| CapturedEndpoint::new(url.as_str()))
                .collect(),
            counter: state.counter,
        }
    }

    /// Receiver that sees the counter after every change
    ///
    /// Presentation layers use it to know when their badge is stale.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.counter_tx.subscribe()
    }

    /// Drain a capture feed, observing every request concurrently
    ///
    /// Finished observations are reaped while the feed stays open. Returns the
    /// number of newly added endpoints once the sender side closes.
    /// Individual failures are logged and do not stop the feed.
    pub async fn consume_feed(self: Arc<Self>, mut feed: mpsc::Receiver<ObservedRequest>) -> usize {
        let mut pending = FeedTasks::default();

        loop {
            tokio::select! {
                Some(joined) = pending.tasks.join_next(), if !pending.tasks.is_empty() => {
                    pending.settle(joined);
                }
                request = feed.recv() => match request {
                    Some(request) => {
                        pending.reap_ready();
                        pending.spawn(Arc::clone(&self), request);
                        debug!(pending = pending.pending(), "capture observation queued");
                    }
                    None => break,
                },
            }
        }

        pending.finish().await
    }

    async fn persist(&self, record: &CaptureRecord) -> ProbeResult<()> {
        let value = serde_json::to_value(record)?;
        self.backend.set(CAPTURE_RECORD_KEY, value).await
    }
}
