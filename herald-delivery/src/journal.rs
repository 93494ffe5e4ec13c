//! Append-only delivery log.
//!
//! One durable record per send attempt. Journal failures never cross the
//! per-recipient boundary; the scheduler logs them and keeps going.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// Outcome of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendOutcome {
    Sent,
    Error,
}

impl std::fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sent => f.write_str("sent"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// One delivery-log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// Event name of the campaign the send belonged to
    pub campaign: String,
    /// Sending identity address
    pub identity: String,
    /// Recipient address
    pub recipient: String,
    pub outcome: SendOutcome,
    /// Raw transport error text, when the outcome is an error
    pub error: Option<String>,
}

impl LogEntry {
    #[must_use]
    pub fn new(
        campaign: impl Into<String>,
        identity: impl Into<String>,
        recipient: impl Into<String>,
        outcome: SendOutcome,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            campaign: campaign.into(),
            identity: identity.into(),
            recipient: recipient.into(),
            outcome,
            error,
        }
    }
}

/// Durable, append-only record of every send attempt.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    /// Append one record.
    async fn record(&self, entry: &LogEntry) -> std::io::Result<()>;
}

/// CSV-backed delivery log.
///
/// Appends one row per attempt; the header row is written when the file is
/// first created. Fields containing separators, quotes or newlines are
/// quoted per RFC 4180.
#[derive(Debug, Clone)]
pub struct FileDeliveryLog {
    path: PathBuf,
}

const HEADER: &str = "timestamp,campaign,identity,recipient,outcome,error\n";

impl FileDeliveryLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn format_row(entry: &LogEntry) -> String {
        let fields = [
            entry.timestamp.to_rfc3339(),
            entry.campaign.clone(),
            entry.identity.clone(),
            entry.recipient.clone(),
            entry.outcome.to_string(),
            entry.error.clone().unwrap_or_default(),
        ];
        let mut row = fields
            .iter()
            .map(|field| quote_field(field))
            .collect::<Vec<_>>()
            .join(",");
        row.push('\n');
        row
    }
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[async_trait]
impl DeliveryLog for FileDeliveryLog {
    async fn record(&self, entry: &LogEntry) -> std::io::Result<()> {
        let fresh = !tokio::fs::try_exists(&self.path).await.unwrap_or(false);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        if fresh {
            file.write_all(HEADER.as_bytes()).await?;
        }
        file.write_all(Self::format_row(entry).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

/// In-memory delivery log for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryDeliveryLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryDeliveryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded entry, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl DeliveryLog for MemoryDeliveryLog {
    async fn record(&self, entry: &LogEntry) -> std::io::Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}
