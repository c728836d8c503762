use std::{fmt, time::SystemTime};

use crate::lifecycle::ServiceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Information,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Information => write!(f, "information"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic line destined for the host's log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: SystemTime,
    pub source: String,
    pub message: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(source: &str, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message: message.into(),
            severity,
        }
    }
}

/// The boundary between the lifecycle and whatever hosts it.
///
/// `report_status` is called on every state transition, `log` on every
/// transition and every child failure. Return values are not consumed, so
/// implementations should swallow their own errors.
pub trait StatusReporter: Send + Sync + 'static {
    fn report_status(&self, status: &ServiceStatus);

    fn log(&self, entry: &LogEntry);
}

/// Forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn report_status(&self, status: &ServiceStatus) {
        tracing::info!(
            state = %status.state,
            code = status.code.code(),
            wait_hint_ms = status.wait_hint.as_millis() as u64,
            "service status"
        );
    }

    fn log(&self, entry: &LogEntry) {
        match entry.severity {
            Severity::Information => tracing::info!(source = %entry.source, "{}", entry.message),
            Severity::Warning => tracing::warn!(source = %entry.source, "{}", entry.message),
            Severity::Error => tracing::error!(source = %entry.source, "{}", entry.message),
        }
    }
}
