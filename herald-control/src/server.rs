//! Unix-socket control server.
//!
//! Each accepted connection carries exactly one request/response exchange:
//! a big-endian u32 length prefix followed by a bincode frame, in both
//! directions. Connections are handled on their own tasks so a slow
//! operator CLI never blocks the accept loop.

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use herald_common::Signal;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::broadcast,
};
use tracing::{error, info, trace, warn};

use crate::{ControlError, Request, Response, Result};

/// Upper bound on an incoming request frame. Identity and campaign uploads
/// are the only large requests and fit comfortably inside 1 MB.
const REQUEST_LIMIT: u32 = 1_000_000;

/// One deadline covers a whole exchange, read through write; a stalled
/// peer cannot hold its connection task open past this.
const EXCHANGE_DEADLINE: Duration = Duration::from_secs(30);

/// Processes decoded control requests on behalf of the server.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a request and produce the response to send back.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot be processed; the server
    /// converts it into an error response rather than dropping the
    /// connection.
    async fn handle_request(&self, request: Request) -> Result<Response>;
}

/// Control server for a running herald instance.
pub struct ControlServer {
    socket_path: String,
    handler: Arc<dyn CommandHandler>,
}

impl ControlServer {
    /// Create a server that will bind `socket_path` once served.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible so path validation can move
    /// here without touching callers.
    pub fn new(socket_path: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Result<Self> {
        Ok(Self {
            socket_path: socket_path.into(),
            handler,
        })
    }

    /// Accept and serve control connections until a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error when the socket cannot be claimed or bound.
    pub async fn serve(&self, mut shutdown: broadcast::Receiver<Signal>) -> Result<()> {
        let listener = self.claim_socket().await?;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let handler = Arc::clone(&self.handler);
                        tokio::spawn(async move {
                            if let Err(error) = exchange(stream, handler).await {
                                error!(%error, "control connection failed");
                            }
                        });
                    }
                    Err(error) => error!(%error, "control accept failed"),
                },
                signal = shutdown.recv() => {
                    match signal {
                        Ok(Signal::Shutdown | Signal::Finalised) => {
                            info!("control server shutting down");
                        }
                        Err(error) => error!(%error, "control shutdown channel dropped"),
                    }
                    break;
                }
            }
        }

        let _ = tokio::fs::remove_file(&self.socket_path).await;
        Ok(())
    }

    /// Bind the socket, reclaiming a stale file left by a crashed process
    /// and restricting it to the owning user.
    async fn claim_socket(&self) -> Result<UnixListener> {
        let path = Path::new(&self.socket_path);
        if path.exists() {
            // A connectable socket means another instance is live.
            if UnixStream::connect(path).await.is_ok() {
                return Err(ControlError::Io(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    format!("control socket {} already in use", self.socket_path),
                )));
            }
            info!(path = %self.socket_path, "reclaiming stale control socket");
            tokio::fs::remove_file(path).await?;
        }

        let listener = UnixListener::bind(path)?;

        #[cfg(unix)]
        {
            let mut permissions = tokio::fs::metadata(path).await?.permissions();
            permissions.set_mode(0o600);
            tokio::fs::set_permissions(path, permissions).await?;
        }

        info!(path = %self.socket_path, "control socket listening, mode 0600");
        Ok(listener)
    }
}

/// Run one request/response exchange on an accepted connection.
async fn exchange(mut stream: UnixStream, handler: Arc<dyn CommandHandler>) -> Result<()> {
    tokio::time::timeout(EXCHANGE_DEADLINE, async {
        let request = read_request(&mut stream).await?;
        trace!(?request, "control request");

        let response = match handler.handle_request(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "control handler failed");
                Response::error(error.to_string())
            }
        };

        write_response(&mut stream, &response).await
    })
    .await
    .map_err(|_| ControlError::TimedOut)?
}

async fn read_request(stream: &mut UnixStream) -> Result<Request> {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).await.map_err(|error| {
        if error.kind() == std::io::ErrorKind::UnexpectedEof {
            ControlError::Disconnected
        } else {
            ControlError::Io(error)
        }
    })?;

    let size = u32::from_be_bytes(prefix);
    if size > REQUEST_LIMIT {
        return Err(ControlError::Oversize {
            size,
            limit: REQUEST_LIMIT,
        });
    }

    let mut frame = vec![0u8; size as usize];
    stream.read_exact(&mut frame).await?;

    let (request, _) = bincode::serde::decode_from_slice(&frame, bincode::config::legacy())?;
    Ok(request)
}

async fn write_response(stream: &mut UnixStream, response: &Response) -> Result<()> {
    let frame = bincode::serde::encode_to_vec(response, bincode::config::legacy())?;
    let size = u32::try_from(frame.len())
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidData, error))?;

    stream.write_all(&size.to_be_bytes()).await?;
    stream.write_all(&frame).await?;
    stream.flush().await?;

    Ok(())
}
