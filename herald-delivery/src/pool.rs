//! Identity pool management.

use std::sync::Arc;

use herald_common::identity::{Identity, IdentityStatus};
use parking_lot::RwLock;

/// Holds the sending identities and their live paused/active status.
///
/// The pool is the exclusive owner of identity status: the delivery loop
/// pauses identities on a classifier verdict, and [`reload`] replaces the
/// whole set. Pausing is irreversible within a session; there is no
/// auto-recovery.
///
/// [`reload`]: IdentityPool::reload
#[derive(Debug, Clone, Default)]
pub struct IdentityPool {
    identities: Arc<RwLock<Vec<Identity>>>,
}

impl IdentityPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pool contents, resetting every identity to active.
    ///
    /// This is the identity-ingestion boundary's entry point: a fresh
    /// upload reactivates identities paused earlier in the session.
    pub fn reload(&self, identities: Vec<Identity>) {
        let mut guard = self.identities.write();
        *guard = identities;
        for identity in guard.iter_mut() {
            identity.status = IdentityStatus::Active;
        }
    }

    /// Snapshot of every identity, paused or not.
    #[must_use]
    pub fn list(&self) -> Vec<Identity> {
        self.identities.read().clone()
    }

    /// Snapshot of the identities currently eligible for sending.
    ///
    /// An empty result is not an error here; the scheduler interprets it
    /// as "delivery must halt".
    #[must_use]
    pub fn active_subset(&self) -> Vec<Identity> {
        self.identities
            .read()
            .iter()
            .filter(|identity| identity.is_active())
            .cloned()
            .collect()
    }

    /// Pause the identity with the given address.
    ///
    /// Returns `true` if the identity existed and was newly paused.
    pub fn mark_paused(&self, address: &str) -> bool {
        let mut guard = self.identities.write();
        guard
            .iter_mut()
            .find(|identity| identity.address == address)
            .is_some_and(|identity| {
                let newly = identity.status == IdentityStatus::Active;
                identity.status = IdentityStatus::Paused;
                newly
            })
    }

    /// Number of identities in the pool, paused or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.read().is_empty()
    }
}
