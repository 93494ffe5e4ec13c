//! Campaign definitions.
//!
//! A campaign is one logical bulk-send job: a message template, the field
//! values it is rendered with, and a fixed, ordered recipient list. The
//! recipient sequence is frozen at enqueue time; campaigns are drained
//! strictly in FIFO order, one at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::identity::Recipient;

/// Unique campaign identifier.
///
/// ULIDs encode creation time and sort lexicographically, so identifiers
/// double as a stable enqueue-order tiebreaker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(String);

impl CampaignId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CampaignId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Field values substituted into a campaign's template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFields {
    /// Event or campaign name, substituted for `{event}`
    pub event: String,
    /// Substituted for `{date}`
    #[serde(default)]
    pub date: String,
    /// Substituted for `{location}`
    #[serde(default)]
    pub location: String,
    /// Substituted for `{count}`
    #[serde(default)]
    pub count: String,
}

/// One bulk-send job: template plus its recipient list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub fields: TemplateFields,
    /// Subject template; only `{event}` is substituted. Empty means
    /// "fall back to the event name".
    #[serde(default)]
    pub subject: String,
    /// Body template; empty means [`Campaign::default_body`]
    #[serde(default)]
    pub body: String,
    /// Ordered recipients, fixed at enqueue time
    pub recipients: Vec<Recipient>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Build a campaign with a freshly generated id.
    #[must_use]
    pub fn new(
        fields: TemplateFields,
        subject: impl Into<String>,
        body: impl Into<String>,
        recipients: Vec<Recipient>,
    ) -> Self {
        Self {
            id: CampaignId::generate(),
            fields,
            subject: subject.into(),
            body: body.into(),
            recipients,
            created_at: Utc::now(),
        }
    }

    /// The subject template to render, falling back to the event name when
    /// none was supplied.
    #[must_use]
    pub fn subject_template(&self) -> &str {
        if self.subject.is_empty() {
            &self.fields.event
        } else {
            &self.subject
        }
    }

    /// The body template to render, falling back to the stock template.
    #[must_use]
    pub fn body_template(&self) -> &str {
        if self.body.is_empty() {
            Self::default_body()
        } else {
            &self.body
        }
    }

    /// Stock body template used when a campaign carries no body of its own.
    #[must_use]
    pub const fn default_body() -> &'static str {
        "Hi {first_name},\n\nWe are pleased to invite you to {event}\n{date}\n{location}\n\n\
         {count} attendees are already registered.\n\nRegards,\n{sender_name}"
    }

    /// Number of recipients in this campaign.
    #[must_use]
    pub fn total(&self) -> usize {
        self.recipients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign() -> Campaign {
        Campaign::new(
            TemplateFields {
                event: "Expo".into(),
                ..TemplateFields::default()
            },
            "",
            "",
            vec![Recipient::new("r@example.com", "Ana")],
        )
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(CampaignId::generate(), CampaignId::generate());
    }

    #[test]
    fn empty_subject_falls_back_to_event() {
        let campaign = campaign();
        assert_eq!(campaign.subject_template(), "Expo");
    }

    #[test]
    fn empty_body_falls_back_to_stock_template() {
        let campaign = campaign();
        assert_eq!(campaign.body_template(), Campaign::default_body());
    }

    #[test]
    fn explicit_templates_win() {
        let mut campaign = campaign();
        campaign.subject = "About {event}".into();
        campaign.body = "See you at {event}".into();
        assert_eq!(campaign.subject_template(), "About {event}");
        assert_eq!(campaign.body_template(), "See you at {event}");
    }
}
