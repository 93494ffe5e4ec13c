//! Test support: a scriptable transport and polling helpers.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use herald_common::identity::{Identity, Recipient};
use herald_delivery::{QuotaUsage, Transport, TransportError};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// A transport whose behaviour is scripted per identity, with an optional
/// gate so tests can hold a send in flight deterministically.
#[derive(Default)]
pub struct MockTransport {
    /// Completed attempts as (identity address, recipient address)
    records: Mutex<Vec<(String, String)>>,
    /// Identities that always fail, with their error text
    failing: Mutex<HashMap<String, String>>,
    /// Recipients whose sends always fail, with their error text
    failing_recipients: Mutex<HashMap<String, String>>,
    /// Attempts started (incremented before the gate is acquired)
    started: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A transport that blocks each send until a permit is released via
    /// [`MockTransport::release`].
    pub fn gated(initial_permits: usize) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Arc::new(Semaphore::new(initial_permits))),
            ..Self::default()
        })
    }

    /// Make every send from `address` fail with `error`.
    pub fn fail_identity(&self, address: &str, error: &str) {
        self.failing
            .lock()
            .insert(address.to_string(), error.to_string());
    }

    /// Make every send to `address` fail with `error`.
    pub fn fail_recipient(&self, address: &str, error: &str) {
        self.failing_recipients
            .lock()
            .insert(address.to_string(), error.to_string());
    }

    pub fn release(&self, permits: usize) {
        self.gate
            .as_ref()
            .expect("release() requires a gated transport")
            .add_permits(permits);
    }

    pub fn records(&self) -> Vec<(String, String)> {
        self.records.lock().clone()
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        identity: &Identity,
        recipient: &Recipient,
        _subject: &str,
        _body: &str,
    ) -> Result<(), TransportError> {
        self.started.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate never closed").forget();
        }

        self.records
            .lock()
            .push((identity.address.clone(), recipient.address.clone()));

        let failure = self
            .failing
            .lock()
            .get(&identity.address)
            .cloned()
            .or_else(|| {
                self.failing_recipients
                    .lock()
                    .get(&recipient.address)
                    .cloned()
            });
        match failure {
            Some(error) => Err(TransportError::new(error)),
            None => Ok(()),
        }
    }

    async fn inspect_quota(&self, identity: &Identity) -> Result<QuotaUsage, TransportError> {
        let used =
            u32::try_from(
                self.records
                    .lock()
                    .iter()
                    .filter(|(sender, _)| *sender == identity.address)
                    .count(),
            )
            .unwrap_or(u32::MAX);
        Ok(QuotaUsage { used, limit: 500 })
    }
}

/// Poll `condition` until it holds or the deadline passes.
pub async fn wait_for<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
