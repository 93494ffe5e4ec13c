//! Client side of the control socket.
//!
//! Every request opens a fresh connection, performs one framed exchange
//! and disconnects; the command surface is small enough that connection
//! reuse buys nothing.

use std::{path::Path, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
};
use tracing::trace;

use crate::{ControlError, PROTOCOL_VERSION, Request, Response, ResponsePayload, Result};

/// Upper bound on a response frame. A full status snapshot with its log
/// ring stays far below 10 MB.
const RESPONSE_LIMIT: u32 = 10_000_000;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to a herald daemon over its control socket.
pub struct ControlClient {
    socket_path: String,
    timeout: Duration,
}

impl ControlClient {
    #[must_use]
    pub fn new(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the deadline applied to a whole request/response cycle.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one request and decode the server's response.
    ///
    /// # Errors
    ///
    /// Fails on connection or framing problems, on a protocol version
    /// mismatch, on timeout, or with [`ControlError::Rejected`] when the
    /// server declined the command.
    pub async fn send_request(&self, request: Request) -> Result<Response> {
        tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| ControlError::TimedOut)?
    }

    async fn exchange(&self, request: Request) -> Result<Response> {
        trace!(path = %self.socket_path, "connecting to control socket");
        let mut stream = UnixStream::connect(&self.socket_path).await?;

        let frame = bincode::serde::encode_to_vec(&request, bincode::config::legacy())?;
        let size = u32::try_from(frame.len())
            .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidData, error))?;

        stream.write_all(&size.to_be_bytes()).await?;
        stream.write_all(&frame).await?;
        stream.flush().await?;

        let mut prefix = [0u8; 4];
        stream.read_exact(&mut prefix).await?;
        let size = u32::from_be_bytes(prefix);
        if size > RESPONSE_LIMIT {
            return Err(ControlError::Oversize {
                size,
                limit: RESPONSE_LIMIT,
            });
        }

        let mut frame = vec![0u8; size as usize];
        stream.read_exact(&mut frame).await?;

        let (response, _): (Response, _) =
            bincode::serde::decode_from_slice(&frame, bincode::config::legacy())?;

        if !response.is_version_compatible() {
            return Err(ControlError::VersionMismatch {
                peer: response.version,
                ours: PROTOCOL_VERSION,
            });
        }
        if let ResponsePayload::Error(message) = &response.payload {
            return Err(ControlError::Rejected(message.clone()));
        }

        Ok(response)
    }

    /// Fail fast when the daemon's socket is not even on disk.
    ///
    /// # Errors
    ///
    /// [`ControlError::MissingSocket`] when nothing is bound at the path.
    pub fn ensure_socket(&self) -> Result<()> {
        if Path::new(&self.socket_path).exists() {
            Ok(())
        } else {
            Err(ControlError::MissingSocket(self.socket_path.clone()))
        }
    }
}
