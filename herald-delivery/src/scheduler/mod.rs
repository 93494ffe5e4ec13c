//! Delivery scheduler: state machine, control surface and the loop.
//!
//! One scheduler instance owns the identity pool, the campaign queue and
//! a single background delivery loop. Control operations run on separate
//! callers and communicate with the loop exclusively through
//! [`ControlSignals`] and the state guarded here; only the loop writes the
//! cursor.

mod run;

use std::{collections::VecDeque, sync::Arc, time::Duration};

use herald_common::{
    campaign::{Campaign, CampaignId},
    notification::{Notification, NotificationSink, Severity},
    template::RenderStyle,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    classifier::FailureClassifier,
    cursor::Cursor,
    error::SchedulerError,
    journal::DeliveryLog,
    pool::IdentityPool,
    queue::{CampaignQueue, HistoryEntry},
    signals::ControlSignals,
    transport::{QuotaReport, Transport},
};

/// Most recent in-memory log lines and notifications kept for `status()`.
const RING_CAPACITY: usize = 500;

/// Lifecycle of the delivery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Paused,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
            Self::Paused => f.write_str("paused"),
        }
    }
}

const fn default_send_gap_secs() -> f64 {
    5.0
}

const fn default_send_timeout_secs() -> u64 {
    25
}

const fn default_poll_interval_ms() -> u64 {
    250
}

fn default_highlight() -> String {
    "#d6336c".to_string()
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Inter-send pacing gap (in seconds)
    #[serde(default = "default_send_gap_secs")]
    pub send_gap_secs: f64,

    /// Upper bound on one transport send; an elapsed timeout is treated
    /// as a failed send and classified like any other error
    ///
    /// Default: 25 seconds
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// How often the loop re-checks pause/abort/stop while waiting
    /// (in milliseconds)
    ///
    /// Default: 250 ms
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Highlight colour for substituted template values
    #[serde(default = "default_highlight")]
    pub highlight: String,

    /// Operator reference attached to notifications
    #[serde(default)]
    pub operator: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            send_gap_secs: default_send_gap_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            highlight: default_highlight(),
            operator: None,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn send_gap(&self) -> Duration {
        Duration::from_secs_f64(self.send_gap_secs.max(0.0))
    }

    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn render_style(&self) -> RenderStyle {
        RenderStyle::html(&self.highlight)
    }
}

/// Point-in-time view of the scheduler for the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: SchedulerState,
    /// Campaign currently in flight, if any
    pub campaign_id: Option<CampaignId>,
    pub campaign: Option<String>,
    pub subject: Option<String>,
    /// Successful sends for the in-flight campaign
    pub sent: usize,
    /// Recipients in the in-flight campaign
    pub total: usize,
    pub queued_campaigns: usize,
    pub queued_recipients: usize,
    /// Most recent in-memory log lines, oldest first
    pub log: Vec<String>,
    /// Most recent notifications, oldest first
    pub notifications: Vec<Notification>,
}

#[derive(Debug)]
struct Inner {
    state: SchedulerState,
    cursor: Option<Cursor>,
}

pub(crate) struct SchedulerCore {
    pub(crate) config: SchedulerConfig,
    pub(crate) classifier: FailureClassifier,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) journal: Arc<dyn DeliveryLog>,
    sink: Arc<dyn NotificationSink>,
    pub(crate) pool: IdentityPool,
    pub(crate) queue: CampaignQueue,
    pub(crate) signals: ControlSignals,
    inner: Mutex<Inner>,
    log_ring: Mutex<VecDeque<String>>,
    notifications: Mutex<VecDeque<Notification>>,
}

/// The delivery scheduler.
///
/// A cheap-to-clone handle over the shared core; control operations take
/// `&self` and are safe to call from any task.
#[derive(Clone)]
pub struct Scheduler {
    core: Arc<SchedulerCore>,
}

impl Scheduler {
    /// Build a scheduler with the default failure classifier.
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        transport: Arc<dyn Transport>,
        journal: Arc<dyn DeliveryLog>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_classifier(config, transport, journal, sink, FailureClassifier::default())
    }

    /// Build a scheduler with a custom failure rule table.
    #[must_use]
    pub fn with_classifier(
        config: SchedulerConfig,
        transport: Arc<dyn Transport>,
        journal: Arc<dyn DeliveryLog>,
        sink: Arc<dyn NotificationSink>,
        classifier: FailureClassifier,
    ) -> Self {
        Self {
            core: Arc::new(SchedulerCore {
                config,
                classifier,
                transport,
                journal,
                sink,
                pool: IdentityPool::new(),
                queue: CampaignQueue::new(),
                signals: ControlSignals::default(),
                inner: Mutex::new(Inner {
                    state: SchedulerState::Idle,
                    cursor: None,
                }),
                log_ring: Mutex::new(VecDeque::new()),
                notifications: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// The identity pool (ingestion boundary: `pool().reload(..)`).
    #[must_use]
    pub fn pool(&self) -> &IdentityPool {
        &self.core.pool
    }

    /// Enqueue a fully-materialised campaign.
    ///
    /// Campaigns may be enqueued at any time; a running loop picks new
    /// arrivals up after the current campaign completes.
    pub fn enqueue(&self, campaign: Campaign) -> CampaignId {
        self.core.queue.enqueue(campaign)
    }

    /// Snapshot of the queued campaigns, head first.
    #[must_use]
    pub fn campaigns(&self) -> Vec<Arc<Campaign>> {
        self.core.queue.list()
    }

    /// Completed-campaigns history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.core.queue.history()
    }

    /// Start the delivery loop.
    ///
    /// Valid only while idle, and only with a non-empty pool and a
    /// non-empty queue. Reuses a checkpointed cursor when it matches the
    /// head campaign (resume after a hard stop or pool exhaustion),
    /// otherwise starts the head campaign from its first recipient.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::AlreadyRunning`], [`SchedulerError::EmptyPool`]
    /// or [`SchedulerError::EmptyQueue`].
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut inner = self.core.inner.lock();
        if inner.state != SchedulerState::Idle {
            return Err(SchedulerError::AlreadyRunning);
        }
        if self.core.pool.is_empty() {
            return Err(SchedulerError::EmptyPool);
        }
        let Some(head) = self.core.queue.head() else {
            return Err(SchedulerError::EmptyQueue);
        };

        match &inner.cursor {
            Some(cursor) if cursor.campaign_id == head.id => {}
            _ => inner.cursor = Some(Cursor::new(head.id.clone())),
        }

        self.core.signals.reset();
        inner.state = SchedulerState::Running;
        drop(inner);

        let core = Arc::clone(&self.core);
        tokio::spawn(async move {
            core.run().await;
        });

        Ok(())
    }

    /// Pause after the current send completes. Does not consume a
    /// recipient while paused.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotRunning`] unless the scheduler is running.
    pub fn pause(&self) -> Result<(), SchedulerError> {
        let mut inner = self.core.inner.lock();
        if inner.state != SchedulerState::Running {
            return Err(SchedulerError::NotRunning);
        }
        self.core.signals.set_paused(true);
        inner.state = SchedulerState::Paused;
        Ok(())
    }

    /// Resume at the exact unsent index.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotPaused`] unless the scheduler is paused.
    pub fn resume(&self) -> Result<(), SchedulerError> {
        let mut inner = self.core.inner.lock();
        if inner.state != SchedulerState::Paused {
            return Err(SchedulerError::NotPaused);
        }
        self.core.signals.set_paused(false);
        inner.state = SchedulerState::Running;
        Ok(())
    }

    /// Abort the in-flight campaign at the next iteration boundary.
    ///
    /// The loop records a history entry, removes the campaign from the
    /// queue (remaining recipients are deliberately dropped, not kept for
    /// resume), clears the cursor and returns to idle.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotRunning`] when the scheduler is idle.
    pub fn abort_with_checkpoint(&self) -> Result<(), SchedulerError> {
        let inner = self.core.inner.lock();
        if inner.state == SchedulerState::Idle {
            return Err(SchedulerError::NotRunning);
        }
        self.core.signals.request_abort();
        Ok(())
    }

    /// Hard stop at the next poll point.
    ///
    /// No checkpoint is taken: the campaign stays queued and the cursor is
    /// left exactly where the last completed send finished, so a later
    /// [`start`](Self::start) resumes mid-campaign. A send in flight at
    /// stop time has an unknown outcome; the resumed run re-attempts that
    /// recipient index, which may duplicate a delivery.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotRunning`] when the scheduler is idle.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        let inner = self.core.inner.lock();
        if inner.state == SchedulerState::Idle {
            return Err(SchedulerError::NotRunning);
        }
        self.core.signals.request_stop();
        Ok(())
    }

    /// Current state, campaign progress, backlog and recent activity.
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        let inner = self.core.inner.lock();
        let head = self.core.queue.head();

        let in_flight = match (inner.state, &head, &inner.cursor) {
            (SchedulerState::Running | SchedulerState::Paused, Some(campaign), Some(cursor))
                if cursor.campaign_id == campaign.id =>
            {
                Some((Arc::clone(campaign), cursor.sent))
            }
            _ => None,
        };

        let (campaign_id, campaign, subject, sent, total) =
            in_flight.map_or((None, None, None, 0, 0), |(campaign, sent)| {
                let subject = herald_common::template::render_subject(
                    campaign.subject_template(),
                    &campaign.fields.event,
                );
                (
                    Some(campaign.id.clone()),
                    Some(campaign.fields.event.clone()),
                    Some(subject),
                    sent,
                    campaign.total(),
                )
            });

        StatusSnapshot {
            state: inner.state,
            campaign_id,
            campaign,
            subject,
            sent,
            total,
            queued_campaigns: self.core.queue.len(),
            queued_recipients: self.core.queue.total_recipients(),
            log: self.core.log_ring.lock().iter().cloned().collect(),
            notifications: self.core.notifications.lock().iter().cloned().collect(),
        }
    }

    /// Query the transport for per-identity quota usage.
    ///
    /// An identity whose mailbox cannot be inspected is reported with the
    /// error text instead of failing the whole report.
    pub async fn quota_report(&self) -> Vec<QuotaReport> {
        let mut reports = Vec::new();
        for identity in self.core.pool.list() {
            let report = match self.core.transport.inspect_quota(&identity).await {
                Ok(usage) => QuotaReport {
                    address: identity.address,
                    used: usage.used,
                    limit: usage.limit,
                    remaining: usage.remaining(),
                    error: None,
                },
                Err(error) => QuotaReport {
                    address: identity.address,
                    used: 0,
                    limit: 0,
                    remaining: 0,
                    error: Some(error.message),
                },
            };
            reports.push(report);
        }
        reports
    }
}

impl SchedulerCore {
    pub(crate) fn push_log(&self, line: String) {
        let line = format!("[{}] {line}", chrono::Utc::now().to_rfc3339());
        let mut ring = self.log_ring.lock();
        if ring.len() == RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(line);
    }

    pub(crate) fn notify(&self, severity: Severity, message: impl Into<String>) {
        let notification = Notification::new(severity, message, self.config.operator.clone());
        {
            let mut ring = self.notifications.lock();
            if ring.len() == RING_CAPACITY {
                ring.pop_front();
            }
            ring.push_back(notification.clone());
        }
        self.sink.publish(&notification);
    }

    pub(crate) fn current_sent(&self) -> usize {
        self.inner
            .lock()
            .cursor
            .as_ref()
            .map_or(0, |cursor| cursor.sent)
    }

    pub(crate) fn cursor_index(&self) -> usize {
        self.inner
            .lock()
            .cursor
            .as_ref()
            .map_or(0, |cursor| cursor.next_index)
    }

    pub(crate) fn bind_cursor(&self, campaign_id: &CampaignId) {
        let mut inner = self.inner.lock();
        match &inner.cursor {
            Some(cursor) if cursor.campaign_id == *campaign_id => {}
            _ => inner.cursor = Some(Cursor::new(campaign_id.clone())),
        }
    }

    pub(crate) fn clear_cursor(&self) {
        self.inner.lock().cursor = None;
    }

    pub(crate) fn advance_cursor(&self, delivered: bool) {
        if let Some(cursor) = self.inner.lock().cursor.as_mut() {
            cursor.advance(delivered);
        }
    }

    pub(crate) fn settle_idle(&self) {
        self.signals.set_paused(false);
        self.inner.lock().state = SchedulerState::Idle;
    }
}
