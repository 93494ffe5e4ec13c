//! Operator-facing notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How urgently an operator should care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Degraded but progressing (an identity was paused)
    Warning,
    /// Delivery halted (every identity exhausted)
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Critical => f.write_str("critical"),
        }
    }
}

/// A single operator alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    /// Owning operator, when the scheduler is run on someone's behalf
    pub operator: Option<String>,
}

impl Notification {
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>, operator: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
            operator,
        }
    }
}

/// Destination for operator alerts.
///
/// The scheduler publishes every alert exactly once; implementations decide
/// where it goes (log stream, webhook, message bus).
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notification: &Notification);
}

/// Default sink: notifications land on the tracing stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn publish(&self, notification: &Notification) {
        match notification.severity {
            Severity::Warning => tracing::warn!(
                operator = notification.operator.as_deref(),
                "{}",
                notification.message
            ),
            Severity::Critical => tracing::error!(
                operator = notification.operator.as_deref(),
                "{}",
                notification.message
            ),
        }
    }
}
