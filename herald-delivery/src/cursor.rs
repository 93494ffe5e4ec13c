//! Resumable progress pointer into a campaign's recipient list.

use herald_common::campaign::CampaignId;
use serde::{Deserialize, Serialize};

/// The sole source of truth for resume position.
///
/// Exactly one live cursor exists while a campaign is in flight. On pause,
/// hard stop, or pool exhaustion it is left pointing at the next unsent
/// recipient; on natural completion or abort-with-checkpoint it is cleared
/// by the scheduler. Invariant: `next_index` never decreases while a
/// campaign is running and never exceeds the recipient count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Campaign this cursor tracks; always the head of the queue while
    /// running
    pub campaign_id: CampaignId,
    /// Index of the next unsent recipient
    pub next_index: usize,
    /// Successful sends so far for this campaign
    pub sent: usize,
}

impl Cursor {
    /// Fresh cursor at the start of a campaign.
    #[must_use]
    pub fn new(campaign_id: CampaignId) -> Self {
        Self {
            campaign_id,
            next_index: 0,
            sent: 0,
        }
    }

    /// Consume one recipient; `delivered` marks a successful send.
    pub fn advance(&mut self, delivered: bool) {
        self.next_index += 1;
        if delivered {
            self.sent += 1;
        }
    }

    /// Whether every recipient of a campaign of `total` recipients has
    /// been consumed.
    #[must_use]
    pub fn is_exhausted(&self, total: usize) -> bool {
        self.next_index >= total
    }
}
