//! Sending identities and recipients.

use serde::{Deserialize, Serialize};

/// Live status of a sending identity.
///
/// An identity starts out `Active` and is flipped to `Paused` when the
/// failure classifier decides its credentials or quota are exhausted.
/// Pausing is irreversible within a session; only a pool reload restores
/// every identity to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    Active,
    Paused,
}

/// A sending account: the address it dispatches from, the credential used
/// to authenticate against the transport, and a display name for message
/// personalisation.
///
/// The address is the identity key; the pool never holds two identities
/// with the same address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Outbound address, unique within the pool
    pub address: String,
    /// Transport credential (app password, API key)
    pub credential: String,
    /// Human-readable name substituted for `{sender_name}`
    pub display_name: String,
    /// Current status, mutated only by the pool
    #[serde(default = "default_status")]
    pub status: IdentityStatus,
}

const fn default_status() -> IdentityStatus {
    IdentityStatus::Active
}

impl Identity {
    /// Create a new active identity.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        credential: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            credential: credential.into(),
            display_name: display_name.into(),
            status: IdentityStatus::Active,
        }
    }

    /// Whether this identity may currently be used for sending.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == IdentityStatus::Active
    }
}

/// A single addressee plus its personalisation fields.
///
/// Recipients are immutable once loaded into a campaign; address validation
/// happens at the ingestion boundary, never during sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Destination address, pre-validated by the ingestion boundary
    pub address: String,
    /// First name substituted for `{first_name}` (may be empty)
    #[serde(default)]
    pub first_name: String,
}

impl Recipient {
    #[must_use]
    pub fn new(address: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            first_name: first_name.into(),
        }
    }
}
