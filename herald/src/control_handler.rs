//! Control handler implementation for the herald daemon.
//!
//! Bridges control-socket commands onto the scheduler's control surface.
//! Scheduler rejections travel back as error responses; they never tear
//! down the connection or the daemon.

use async_trait::async_trait;
use herald_control::{
    CampaignCommand, CommandHandler, IdentityCommand, Request, RequestCommand, Response,
    ResponseData, SchedulerCommand,
    protocol::{CampaignSummary, IdentitySummary},
};
use herald_delivery::{Scheduler, SchedulerError};

/// Handler for control commands.
pub struct HeraldControlHandler {
    scheduler: Scheduler,
}

impl HeraldControlHandler {
    #[must_use]
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    fn ack(result: Result<(), SchedulerError>) -> Response {
        match result {
            Ok(()) => Response::ok(),
            Err(error) => Response::error(error.to_string()),
        }
    }

    fn handle_scheduler(&self, command: SchedulerCommand) -> Response {
        match command {
            SchedulerCommand::Start => Self::ack(self.scheduler.start()),
            SchedulerCommand::Pause => Self::ack(self.scheduler.pause()),
            SchedulerCommand::Resume => Self::ack(self.scheduler.resume()),
            SchedulerCommand::Abort => Self::ack(self.scheduler.abort_with_checkpoint()),
            SchedulerCommand::Stop => Self::ack(self.scheduler.stop()),
            SchedulerCommand::Status => {
                Response::data(ResponseData::Status(self.scheduler.status()))
            }
        }
    }

    async fn handle_identity(&self, command: IdentityCommand) -> Response {
        match command {
            IdentityCommand::Load(identities) => {
                let count = identities.len();
                self.scheduler.pool().reload(identities);
                Response::data(ResponseData::Message(format!(
                    "Loaded {count} identities, all active"
                )))
            }
            IdentityCommand::List => {
                let summaries: Vec<IdentitySummary> = self
                    .scheduler
                    .pool()
                    .list()
                    .iter()
                    .map(IdentitySummary::from)
                    .collect();
                Response::data(ResponseData::Identities(summaries))
            }
            IdentityCommand::Quota => {
                Response::data(ResponseData::Quota(self.scheduler.quota_report().await))
            }
        }
    }

    fn handle_campaign(&self, command: CampaignCommand) -> Response {
        match command {
            CampaignCommand::Submit(spec) => {
                let id = self.scheduler.enqueue(spec.into_campaign());
                Response::data(ResponseData::Submitted(id))
            }
            CampaignCommand::List => {
                let summaries: Vec<CampaignSummary> = self
                    .scheduler
                    .campaigns()
                    .iter()
                    .map(|campaign| CampaignSummary::from(campaign.as_ref()))
                    .collect();
                Response::data(ResponseData::Campaigns(summaries))
            }
            CampaignCommand::History => {
                Response::data(ResponseData::History(self.scheduler.history()))
            }
        }
    }
}

#[async_trait]
impl CommandHandler for HeraldControlHandler {
    async fn handle_request(&self, request: Request) -> herald_control::Result<Response> {
        if !request.is_version_compatible() {
            return Ok(Response::error(format!(
                "Incompatible protocol version: {}",
                request.version
            )));
        }

        Ok(match request.command {
            RequestCommand::Scheduler(command) => self.handle_scheduler(command),
            RequestCommand::Identity(command) => self.handle_identity(command).await,
            RequestCommand::Campaign(command) => self.handle_campaign(command),
        })
    }
}
