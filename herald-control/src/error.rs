//! Failure modes of the control channel.

use thiserror::Error;

/// Everything that can go wrong between `heraldctl` and the daemon.
///
/// `Rejected` is the one variant that is not a channel fault: the server
/// understood the request and declined it (for example a `start` while the
/// scheduler is already running).
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control socket i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode control frame: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("could not encode control frame: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// The server processed the request and declined it.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("peer closed the connection mid-frame")]
    Disconnected,

    #[error("control exchange timed out")]
    TimedOut,

    /// A length prefix announced more bytes than the channel allows.
    #[error("frame of {size} bytes exceeds the {limit}-byte limit")]
    Oversize { size: u32, limit: u32 },

    #[error("protocol version mismatch: peer speaks {peer}, this build speaks {ours}")]
    VersionMismatch { peer: u32, ours: u32 },

    #[error("no control socket at {0}; is the daemon running?")]
    MissingSocket(String),
}

pub type Result<T> = std::result::Result<T, ControlError>;
