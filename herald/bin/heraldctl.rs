//! Command-line utility for managing a running herald instance
//!
//! This tool provides operational control over the delivery engine:
//! - Scheduler control (start, pause, resume, abort, stop, status)
//! - Identity pool management (load, list, quota)
//! - Campaign management (submit, list, history)

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use herald_common::identity::Identity;
use herald_control::{
    CampaignCommand, CampaignSpec, ControlClient, DEFAULT_CONTROL_SOCKET, IdentityCommand,
    Request, RequestCommand, Response, ResponseData, ResponsePayload, SchedulerCommand,
};
use herald_delivery::StatusSnapshot;
use serde::Deserialize;

/// Command-line utility for managing the herald delivery engine
#[derive(Parser, Debug)]
#[command(name = "heraldctl")]
#[command(about = "Manage the herald delivery engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the control socket
    #[arg(short = 'c', long, default_value = DEFAULT_CONTROL_SOCKET)]
    control_socket: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Delivery scheduler control
    Scheduler {
        #[command(subcommand)]
        action: SchedulerAction,
    },
    /// Identity pool management
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
    /// Campaign queue management
    Campaign {
        #[command(subcommand)]
        action: CampaignAction,
    },
}

#[derive(Subcommand, Debug)]
enum SchedulerAction {
    /// Start the delivery loop
    Start,
    /// Pause after the current send completes
    Pause,
    /// Resume a paused loop at the exact unsent recipient
    Resume,
    /// Checkpoint the in-flight campaign, drop its remaining recipients
    Abort,
    /// Hard stop; the campaign stays queued for a later resume
    Stop,
    /// Show state, progress and recent activity
    Status,
}

#[derive(Subcommand, Debug)]
enum IdentityAction {
    /// Replace the identity pool from a TOML file
    Load {
        /// File with an `[[identities]]` table per identity
        file: PathBuf,
    },
    /// List identities and their paused/active status
    List,
    /// Show per-identity quota usage
    Quota,
}

#[derive(Subcommand, Debug)]
enum CampaignAction {
    /// Submit a campaign definition from a TOML file
    Submit {
        /// File with the campaign fields and a `[[recipients]]` table
        file: PathBuf,
    },
    /// List queued campaigns in delivery order
    List,
    /// Show completed and aborted campaigns
    History,
}

/// On-disk shape of an identity upload
#[derive(Debug, Deserialize)]
struct IdentityFile {
    identities: Vec<Identity>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let client = ControlClient::new(&cli.control_socket);
    client.ensure_socket()?;

    let command = match cli.command {
        Commands::Scheduler { action } => RequestCommand::Scheduler(match action {
            SchedulerAction::Start => SchedulerCommand::Start,
            SchedulerAction::Pause => SchedulerCommand::Pause,
            SchedulerAction::Resume => SchedulerCommand::Resume,
            SchedulerAction::Abort => SchedulerCommand::Abort,
            SchedulerAction::Stop => SchedulerCommand::Stop,
            SchedulerAction::Status => SchedulerCommand::Status,
        }),
        Commands::Identity { action } => RequestCommand::Identity(match action {
            IdentityAction::Load { file } => {
                let content = std::fs::read_to_string(&file)?;
                let parsed: IdentityFile = toml::from_str(&content)?;
                IdentityCommand::Load(parsed.identities)
            }
            IdentityAction::List => IdentityCommand::List,
            IdentityAction::Quota => IdentityCommand::Quota,
        }),
        Commands::Campaign { action } => RequestCommand::Campaign(match action {
            CampaignAction::Submit { file } => {
                let content = std::fs::read_to_string(&file)?;
                let spec: CampaignSpec = toml::from_str(&content)?;
                CampaignCommand::Submit(spec)
            }
            CampaignAction::List => CampaignCommand::List,
            CampaignAction::History => CampaignCommand::History,
        }),
    };

    let response = client.send_request(Request::new(command)).await?;
    print_response(&response);

    Ok(())
}

fn print_response(response: &Response) {
    match &response.payload {
        ResponsePayload::Ok => println!("OK"),
        ResponsePayload::Error(message) => println!("Error: {message}"),
        ResponsePayload::Data(data) => print_data(data),
    }
}

fn print_data(data: &ResponseData) {
    match data {
        ResponseData::Status(status) => print_status(status),
        ResponseData::Identities(identities) => {
            if identities.is_empty() {
                println!("No identities loaded");
                return;
            }
            println!("{:<30} {:<20} status", "address", "display name");
            for identity in identities {
                println!("{identity}");
            }
        }
        ResponseData::Quota(reports) => {
            if reports.is_empty() {
                println!("No identities loaded");
                return;
            }
            println!(
                "{:<30} {:>6} {:>6} {:>9}",
                "address", "used", "limit", "remaining"
            );
            for report in reports {
                match &report.error {
                    Some(error) => println!("{:<30} unavailable: {error}", report.address),
                    None => println!(
                        "{:<30} {:>6} {:>6} {:>9}",
                        report.address, report.used, report.limit, report.remaining
                    ),
                }
            }
        }
        ResponseData::Campaigns(campaigns) => {
            if campaigns.is_empty() {
                println!("Campaign queue is empty");
                return;
            }
            for campaign in campaigns {
                println!("{campaign}");
            }
        }
        ResponseData::History(history) => {
            if history.is_empty() {
                println!("No completed campaigns");
                return;
            }
            for entry in history {
                println!(
                    "{}  {:<24} sent {}/{}",
                    entry.recorded_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    entry.campaign,
                    entry.sent,
                    entry.recipients_total
                );
            }
        }
        ResponseData::Submitted(id) => println!("Submitted campaign {id}"),
        ResponseData::Message(message) => println!("{message}"),
    }
}

fn print_status(status: &StatusSnapshot) {
    println!("State:     {}", status.state);
    match (&status.campaign, &status.subject) {
        (Some(campaign), Some(subject)) => {
            println!("Campaign:  {campaign}");
            println!("Subject:   {subject}");
            println!("Progress:  {}/{} sent", status.sent, status.total);
        }
        _ => println!("Campaign:  none in flight"),
    }
    println!(
        "Backlog:   {} campaign(s), {} recipient(s)",
        status.queued_campaigns, status.queued_recipients
    );

    if !status.notifications.is_empty() {
        println!("\n--- Notifications ---");
        for notification in status.notifications.iter().rev().take(5) {
            println!(
                "{} [{}] {}",
                notification.timestamp.format("%H:%M:%S"),
                notification.severity,
                notification.message
            );
        }
    }

    if !status.log.is_empty() {
        println!("\n--- Recent activity ---");
        for line in status.log.iter().rev().take(10).rev() {
            println!("{line}");
        }
    }
}
