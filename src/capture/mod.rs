//! Capture of observed authorization requests
//!
//! The interception hook of the host application reports every request it
//! sees; the store keeps the distinct authorization URLs among them and
//! persists them through a [`KeyValueStore`].

pub mod endpoint;
pub mod persistence;
pub mod policy;
pub mod store;

pub use endpoint::{CapturedEndpoint, EndpointSummary};
pub use persistence::{CAPTURE_RECORD_KEY, CaptureRecord, JsonFileStore, KeyValueStore, MemoryStore};
pub use policy::{CapturePolicy, OAUTH_PARAMS};
pub use store::{CaptureSnapshot, CaptureStore, ObservedRequest, RecordOutcome};
