//! Campaign queue and completed-campaign history.

use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use herald_common::campaign::{Campaign, CampaignId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Record of a campaign that left the queue, either drained to completion
/// or cut short by an abort-with-checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub campaign_id: CampaignId,
    /// Event name of the campaign
    pub campaign: String,
    /// Recipients the campaign was enqueued with
    pub recipients_total: usize,
    /// Successful sends before the campaign left the queue
    pub sent: usize,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct QueueInner {
    backlog: VecDeque<Arc<Campaign>>,
    history: Vec<HistoryEntry>,
}

/// Ordered backlog of campaigns awaiting delivery.
///
/// Campaigns are drained strictly in FIFO order, one at a time; the head
/// campaign is the only one the scheduler ever touches. Dequeued campaigns
/// land in the completed-campaigns history.
#[derive(Debug, Clone, Default)]
pub struct CampaignQueue {
    inner: Arc<Mutex<QueueInner>>,
}

impl CampaignQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a campaign to the backlog, returning its id.
    pub fn enqueue(&self, campaign: Campaign) -> CampaignId {
        let id = campaign.id.clone();
        self.inner.lock().backlog.push_back(Arc::new(campaign));
        id
    }

    /// The campaign currently at the head of the queue.
    #[must_use]
    pub fn head(&self) -> Option<Arc<Campaign>> {
        self.inner.lock().backlog.front().cloned()
    }

    /// Remove the head campaign and append a history entry for it.
    ///
    /// The id guards against racing control callers: nothing is removed if
    /// the head changed since the caller looked at it.
    pub fn finish_head(&self, id: &CampaignId, sent: usize) -> bool {
        let mut inner = self.inner.lock();
        if !inner
            .backlog
            .front()
            .is_some_and(|campaign| campaign.id == *id)
        {
            return false;
        }
        let Some(campaign) = inner.backlog.pop_front() else {
            return false;
        };
        inner.history.push(HistoryEntry {
            campaign_id: campaign.id.clone(),
            campaign: campaign.fields.event.clone(),
            recipients_total: campaign.total(),
            sent,
            recorded_at: Utc::now(),
        });
        true
    }

    /// Snapshot of the backlog in queue order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<Campaign>> {
        self.inner.lock().backlog.iter().cloned().collect()
    }

    /// Snapshot of the completed-campaigns history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().history.clone()
    }

    /// Number of queued campaigns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().backlog.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().backlog.is_empty()
    }

    /// Total recipients across the backlog.
    #[must_use]
    pub fn total_recipients(&self) -> usize {
        self.inner
            .lock()
            .backlog
            .iter()
            .map(|campaign| campaign.total())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use herald_common::{campaign::TemplateFields, identity::Recipient};

    use super::*;

    fn campaign(event: &str, recipients: usize) -> Campaign {
        Campaign::new(
            TemplateFields {
                event: event.into(),
                ..TemplateFields::default()
            },
            "",
            "",
            (0..recipients)
                .map(|i| Recipient::new(format!("r{i}@example.com"), ""))
                .collect(),
        )
    }

    #[test]
    fn fifo_order() {
        let queue = CampaignQueue::new();
        let first = queue.enqueue(campaign("first", 1));
        let second = queue.enqueue(campaign("second", 2));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.total_recipients(), 3);
        assert_eq!(queue.head().unwrap().id, first);

        assert!(queue.finish_head(&first, 1));
        assert_eq!(queue.head().unwrap().id, second);
    }

    #[test]
    fn finish_head_records_history() {
        let queue = CampaignQueue::new();
        let id = queue.enqueue(campaign("expo", 5));
        assert!(queue.finish_head(&id, 2));

        let history = queue.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].campaign, "expo");
        assert_eq!(history[0].recipients_total, 5);
        assert_eq!(history[0].sent, 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn finish_head_rejects_stale_id() {
        let queue = CampaignQueue::new();
        let id = queue.enqueue(campaign("expo", 1));
        assert!(queue.finish_head(&id, 1));
        assert!(!queue.finish_head(&id, 1));
        assert!(queue.history().len() == 1);
    }
}
