//! Control protocol for managing a running herald instance
//!
//! This crate provides an IPC mechanism using Unix domain sockets to:
//! - Drive the delivery scheduler (start, pause, resume, abort, stop)
//! - Inspect status, history and per-identity quota
//! - Load identities and submit campaigns (the ingestion boundaries)
//!
//! The protocol uses bincode for efficient serialization.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::ControlClient;
pub use error::{ControlError, Result};
pub use protocol::{
    CampaignCommand, CampaignSpec, IdentityCommand, PROTOCOL_VERSION, Request, RequestCommand,
    Response, ResponseData, ResponsePayload, SchedulerCommand,
};
pub use server::{CommandHandler, ControlServer};

/// Default path for the control socket
pub const DEFAULT_CONTROL_SOCKET: &str = "/tmp/herald.sock";
