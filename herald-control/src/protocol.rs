//! Wire types for the control protocol.
//!
//! Requests and responses travel in a versioned envelope so an operator
//! CLI from a different build fails loudly instead of misdecoding.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use herald_common::{
    campaign::{Campaign, CampaignId, TemplateFields},
    identity::{Identity, IdentityStatus, Recipient},
};
use herald_delivery::{HistoryEntry, QuotaReport, StatusSnapshot};
use serde::{Deserialize, Serialize};

/// Protocol version spoken by this build.
pub const PROTOCOL_VERSION: u32 = 1;

/// Versioned envelope around a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub version: u32,
    pub command: RequestCommand,
}

/// The three command families the daemon accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RequestCommand {
    /// Delivery scheduler control
    Scheduler(SchedulerCommand),
    /// Identity pool management
    Identity(IdentityCommand),
    /// Campaign queue management
    Campaign(CampaignCommand),
}

/// Delivery scheduler control commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SchedulerCommand {
    /// Start the delivery loop (idle only)
    Start,
    /// Pause after the current send
    Pause,
    /// Resume a paused loop
    Resume,
    /// Checkpoint the in-flight campaign, dequeue it and go idle
    Abort,
    /// Hard stop; campaign stays queued for a later resume
    Stop,
    /// Current state, progress and recent activity
    Status,
}

/// Identity pool management commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IdentityCommand {
    /// Replace the pool; every identity is reset to active.
    ///
    /// This is the identity-ingestion boundary: callers deliver structured,
    /// pre-validated records.
    Load(Vec<Identity>),
    /// List identities and their paused/active status
    List,
    /// Query the transport for per-identity quota usage
    Quota,
}

/// Campaign queue management commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CampaignCommand {
    /// Enqueue a fully-materialised campaign.
    ///
    /// This is the campaign-ingestion boundary; recipient addresses are
    /// trusted to be pre-validated.
    Submit(CampaignSpec),
    /// List queued campaigns in delivery order
    List,
    /// List completed and aborted campaigns
    History,
}

/// A campaign definition as submitted over the control socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSpec {
    /// Event name, substituted for `{event}`
    pub event: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub count: String,
    /// Subject template; empty falls back to the event name
    #[serde(default)]
    pub subject: String,
    /// Body template; empty falls back to the stock template
    #[serde(default)]
    pub body: String,
    pub recipients: Vec<Recipient>,
}

impl CampaignSpec {
    /// Materialise the spec into a queued-ready campaign.
    #[must_use]
    pub fn into_campaign(self) -> Campaign {
        Campaign::new(
            TemplateFields {
                event: self.event,
                date: self.date,
                location: self.location,
                count: self.count,
            },
            self.subject,
            self.body,
            self.recipients,
        )
    }
}

/// Versioned envelope around a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub version: u32,
    pub payload: ResponsePayload,
}

/// Outcome of a command: a bare ack, a data payload, or a rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponsePayload {
    Ok,
    Data(Box<ResponseData>),
    Error(String),
}

/// Payloads the daemon can answer with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseData {
    /// Scheduler status snapshot
    Status(StatusSnapshot),
    /// Identity pool summary
    Identities(Vec<IdentitySummary>),
    /// Per-identity quota usage
    Quota(Vec<QuotaReport>),
    /// Queued campaigns in delivery order
    Campaigns(Vec<CampaignSummary>),
    /// Completed-campaigns history
    History(Vec<HistoryEntry>),
    /// Id of a freshly submitted campaign
    Submitted(CampaignId),
    /// Simple string message
    Message(String),
}

/// Identity summary for list responses; credentials never cross the socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub address: String,
    pub display_name: String,
    pub status: IdentityStatus,
}

impl From<&Identity> for IdentitySummary {
    fn from(identity: &Identity) -> Self {
        Self {
            address: identity.address.clone(),
            display_name: identity.display_name.clone(),
            status: identity.status,
        }
    }
}

impl Display for IdentitySummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let status = match self.status {
            IdentityStatus::Active => "active",
            IdentityStatus::Paused => "paused",
        };
        f.write_fmt(format_args!(
            "{:<30} {:<20} {status}",
            self.address, self.display_name
        ))
    }
}

/// Campaign summary for list responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub id: CampaignId,
    pub event: String,
    pub subject: String,
    pub recipients: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Campaign> for CampaignSummary {
    fn from(campaign: &Campaign) -> Self {
        Self {
            id: campaign.id.clone(),
            event: campaign.fields.event.clone(),
            subject: campaign.subject_template().to_string(),
            recipients: campaign.total(),
            created_at: campaign.created_at,
        }
    }
}

impl Display for CampaignSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("ID:         {}\n", self.id))?;
        f.write_fmt(format_args!("Event:      {}\n", self.event))?;
        f.write_fmt(format_args!("Subject:    {}\n", self.subject))?;
        f.write_fmt(format_args!("Recipients: {}\n", self.recipients))?;
        f.write_fmt(format_args!(
            "Created:    {}\n",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ))
    }
}

impl Request {
    /// Wrap a command in an envelope stamped with this build's version.
    #[must_use]
    pub const fn new(command: RequestCommand) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            command,
        }
    }

    /// Whether this envelope can be decoded by this build. Only an exact
    /// version match is accepted.
    #[must_use]
    pub const fn is_version_compatible(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }
}

impl Response {
    /// A rejection carrying the reason text.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Error(message.into()),
        }
    }

    /// A bare acknowledgement.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Ok,
        }
    }

    /// A success carrying a payload.
    #[must_use]
    pub fn data(data: ResponseData) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Data(Box::new(data)),
        }
    }

    /// Anything but a rejection counts as success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self.payload, ResponsePayload::Error(_))
    }

    /// Whether this envelope can be decoded by this build. Only an exact
    /// version match is accepted.
    #[must_use]
    pub const fn is_version_compatible(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }
}
