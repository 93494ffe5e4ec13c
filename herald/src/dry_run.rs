//! Dry-run transport.
//!
//! Accepts every send without touching the network, counting per-identity
//! usage so quota reports stay meaningful. Lets an operator rehearse a
//! campaign (pacing, rotation, controls) before wiring a real transport
//! into [`crate::Herald::run_with`].

use std::collections::HashMap;

use async_trait::async_trait;
use herald_common::identity::{Identity, Recipient};
use herald_delivery::{QuotaUsage, Transport, TransportError};
use parking_lot::Mutex;
use tracing::info;

/// Daily limit reported for every identity, matching the common provider
/// default.
const DAILY_LIMIT: u32 = 500;

/// Transport that records sends instead of performing them.
#[derive(Debug, Default)]
pub struct DryRunTransport {
    sends_per_identity: Mutex<HashMap<String, u32>>,
}

impl DryRunTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    async fn send(
        &self,
        identity: &Identity,
        recipient: &Recipient,
        subject: &str,
        _body: &str,
    ) -> Result<(), TransportError> {
        *self
            .sends_per_identity
            .lock()
            .entry(identity.address.clone())
            .or_insert(0) += 1;

        info!(
            identity = %identity.address,
            recipient = %recipient.address,
            subject,
            "dry-run send"
        );
        Ok(())
    }

    async fn inspect_quota(&self, identity: &Identity) -> Result<QuotaUsage, TransportError> {
        let used = self
            .sends_per_identity
            .lock()
            .get(&identity.address)
            .copied()
            .unwrap_or(0);
        Ok(QuotaUsage {
            used,
            limit: DAILY_LIMIT,
        })
    }
}
