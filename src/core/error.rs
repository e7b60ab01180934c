// ! Error types for the OAuth probe
// !
// ! Module defines all error types that can occur within the crate,
// ! providing structured error handling with detailed context.

use thiserror::Error;

/// The main error type for capture and probing operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Unparseable or non-qualifying URL presented at a boundary
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Transport-level failures (DNS, TLS, refused connection, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Connection-related errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// HTTP-related errors that are not transport failures
    #[error("HTTP error: {0}")]
    Http(String),

    /// Reading or writing the persisted capture record failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid probe or capture configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// An analysis run for the same endpoint has not finished yet
    #[error("Analysis already in progress for {0}")]
    AnalysisInProgress(String),

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {0}")]
    Internal(String),
}

// Manual From implementations for types that don't implement Clone
impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        ProbeError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::timeout(format!("HTTP request timeout: {err}"))
        } else if err.is_connect() {
            ProbeError::connection(format!("HTTP connection failed: {err}"))
        } else if err.is_request() || err.is_body() || err.is_decode() {
            ProbeError::transport(format!("HTTP request failed: {err}"))
        } else {
            ProbeError::Http(err.to_string())
        }
    }
}

/// Result type alias for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

impl ProbeError {
    /// Create a new malformed input error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedInput(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence(message.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is recoverable
    ///
    /// Nothing in the crate retries; the flag tells a caller whether repeating
    /// the same operation later could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ProbeError::MalformedInput(_) => false,
            ProbeError::Transport(_) => true,
            ProbeError::Connection(_) => true,
            ProbeError::Timeout(_) => true,
            ProbeError::Http(_) => true,
            ProbeError::Persistence(_) => true,
            ProbeError::Serialization(_) => false,
            ProbeError::Config(_) => false,
            ProbeError::AnalysisInProgress(_) => true,
            ProbeError::Internal(_) => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ProbeError::MalformedInput(_) => "validation",
            ProbeError::Transport(_) => "transport",
            ProbeError::Connection(_) => "connection",
            ProbeError::Timeout(_) => "timeout",
            ProbeError::Http(_) => "http",
            ProbeError::Persistence(_) => "persistence",
            ProbeError::Serialization(_) => "serialization",
            ProbeError::Config(_) => "config",
            ProbeError::AnalysisInProgress(_) => "busy",
            ProbeError::Internal(_) => "internal",
        }
    }
}
