//! Pluggable message transport.
//!
//! The scheduler depends only on this narrow contract; the concrete
//! mechanics of message submission and mailbox-quota inspection live
//! outside the core. Error text crossing this boundary is opaque and is
//! interpreted solely by the [`crate::classifier::FailureClassifier`].

use async_trait::async_trait;
use herald_common::identity::{Identity, Recipient};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed transport operation, carrying the raw error text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Quota usage for one identity, as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub used: u32,
    pub limit: u32,
}

impl QuotaUsage {
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}

/// Per-identity quota report surfaced through the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaReport {
    pub address: String,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    /// Present when the transport could not be queried for this identity
    pub error: Option<String>,
}

/// External capability that actually delivers a message and can report
/// identity quota usage.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit one rendered message from `identity` to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns the transport's raw error text; the caller classifies it.
    async fn send(
        &self,
        identity: &Identity,
        recipient: &Recipient,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError>;

    /// Report how much of its sending quota `identity` has consumed.
    ///
    /// # Errors
    ///
    /// Returns the transport's raw error text when the mailbox cannot be
    /// inspected.
    async fn inspect_quota(&self, identity: &Identity) -> Result<QuotaUsage, TransportError>;
}
