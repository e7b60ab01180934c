// ! Persistence backends for the capture record
// !
// ! Module defines the key/value seam the capture store persists through, the
// ! shape of the persisted record, and two backends: an in-memory map and a
// ! single JSON file on disk.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::core::error::{ProbeError, ProbeResult};

/// Key the capture record is stored under
pub const CAPTURE_RECORD_KEY: &str = "capture_record";

/// Persisted form of the capture store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Unique URLs in discovery order
    pub endpoints: Vec<String>,
    /// Number of unique captures
    pub counter: u64,
}

impl CaptureRecord {
    /// Whether `counter == endpoints.len()` and entries are unique
    pub fn is_consistent(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.endpoints.len());
        self.counter == self.endpoints.len() as u64
            && self.endpoints.iter().all(|url| seen.insert(url.as_str()))
    }

    /// Drop duplicate entries (first occurrence wins) and resync the counter
    pub fn repaired(self) -> Self {
        let mut seen = std::collections::HashSet::with_capacity(self.endpoints.len());
        let endpoints: Vec<String> = self
            .endpoints
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();
        let counter = endpoints.len() as u64;
        Self { endpoints, counter }
    }
}

/// Get/set interface of the host's persisted key/value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> ProbeResult<Option<Value>>;

    /// Replace the value stored under `key`
    async fn set(&self, key: &str, value: Value) -> ProbeResult<()>;
}

/// Process-local store; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> ProbeResult<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> ProbeResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by one JSON object in a file
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a failed write leaves the previous contents in place.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// File name used under the platform data directory
    pub const DEFAULT_FILE_NAME: &'static str = "capture.json";

    /// Store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store under the platform data directory (`<data_dir>/oauth-probe/capture.json`)
    #[cfg(feature = "file-store")]
    pub fn in_data_dir() -> ProbeResult<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| ProbeError::persistence("No platform data directory available"))?;
        Ok(Self::new(
            base.join("oauth-probe").join(Self::DEFAULT_FILE_NAME),
        ))
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> ProbeResult<Map<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(ProbeError::persistence(format!(
                    "{} does not contain a JSON object",
                    self.path.display()
                ))),
                Err(e) => Err(ProbeError::persistence(format!(
                    "Failed to parse {}: {e}",
                    self.path.display()
                ))),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(ProbeError::persistence(format!(
                "Failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> ProbeResult<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> ProbeResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut map = self.read_all().await?;
        map.insert(key.to_string(), value);
        let bytes = serde_json::to_vec_pretty(&Value::Object(map))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ProbeError::persistence(format!(
                        "Failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &bytes).await.map_err(|e| {
            ProbeError::persistence(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            ProbeError::persistence(format!(
                "Failed to replace {}: {e}",
                self.path.display()
            ))
        })?;

        debug!(path = %self.path.display(), key, "persisted value");
        Ok(())
    }
}
