// ! Structured logging for the OAuth probe
// !
// ! Module provides structured error logging with categorization
// ! and context preservation on top of `tracing`.

use serde_json::json;
use tracing::{Level, error, info, span, warn};

use crate::core::error::ProbeError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLogLevel {
    /// Critical errors that require immediate attention
    Critical,
    /// Errors that affect functionality but the run can continue
    Error,
    /// Warnings about potential issues
    Warning,
    /// Informational error context
    Info,
}

impl From<&ProbeError> for ErrorLogLevel {
    fn from(error: &ProbeError) -> Self {
        match error {
            ProbeError::Internal(_) => ErrorLogLevel::Critical,

            // The captured record is no longer durable
            ProbeError::Persistence(_) | ProbeError::Serialization(_) => ErrorLogLevel::Error,

            // Remote side misbehaving; reported per item
            ProbeError::Transport(_)
            | ProbeError::Connection(_)
            | ProbeError::Timeout(_)
            | ProbeError::Http(_) => ErrorLogLevel::Warning,

            // Caller/input issues
            ProbeError::MalformedInput(_)
            | ProbeError::Config(_)
            | ProbeError::AnalysisInProgress(_) => ErrorLogLevel::Info,
        }
    }
}

/// Extended error context for logging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Operation being performed when error occurred
    pub operation: String,
    /// Component that raised the error (capture, runner, discovery, ...)
    pub component: Option<String>,
    /// URL the operation was working on
    pub target: Option<String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            operation: "unknown".to_string(),
            component: None,
            target: None,
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    /// Set component identifier
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Set the URL being worked on
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Structured error logger
pub struct ErrorLogger;

impl ErrorLogger {
    /// Log an error with full context
    pub fn log_error(error: &ProbeError, context: &ErrorContext) {
        let category = error.category();
        let recoverable = error.is_recoverable();

        let log_data = json!({
            "error_category": category,
            "error_recoverable": recoverable,
            "error_message": error.to_string(),
            "operation": context.operation,
            "component": context.component,
            "target": context.target,
        });
        let log_data = serde_json::to_string(&log_data).unwrap_or_default();

        match ErrorLogLevel::from(error) {
            ErrorLogLevel::Critical => {
                error!(
                    target: "oauth_probe_errors",
                    error_category = category,
                    error_recoverable = recoverable,
                    operation = context.operation.as_str(),
                    "CRITICAL probe error: {} - {}",
                    error,
                    log_data
                );
            }
            ErrorLogLevel::Error => {
                error!(
                    target: "oauth_probe_errors",
                    error_category = category,
                    error_recoverable = recoverable,
                    operation = context.operation.as_str(),
                    "Probe error: {} - {}",
                    error,
                    log_data
                );
            }
            ErrorLogLevel::Warning => {
                warn!(
                    target: "oauth_probe_errors",
                    error_category = category,
                    error_recoverable = recoverable,
                    operation = context.operation.as_str(),
                    "Probe warning: {} - {}",
                    error,
                    log_data
                );
            }
            ErrorLogLevel::Info => {
                info!(
                    target: "oauth_probe_errors",
                    error_category = category,
                    error_recoverable = recoverable,
                    operation = context.operation.as_str(),
                    "Probe info: {} - {}",
                    error,
                    log_data
                );
            }
        }
    }

    /// Create a logging span for one analysis run
    pub fn create_run_span(run_id: &str, target: &str) -> tracing::Span {
        span!(Level::INFO, "oauth_probe_run", run_id = run_id, target = target)
    }
}

impl ProbeError {
    /// Log this error with structured context
    pub fn log_with_context(&self, context: &ErrorContext) {
        ErrorLogger::log_error(self, context);
    }

    /// Log this error with basic context
    pub fn log_error(&self, operation: &str) {
        ErrorLogger::log_error(self, &ErrorContext::new(operation));
    }
}
