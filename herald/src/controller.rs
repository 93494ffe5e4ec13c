//! Top-level daemon controller.

use std::sync::{Arc, LazyLock};

use herald_common::{Signal, internal, logging};
use herald_control::ControlServer;
use herald_delivery::{FileDeliveryLog, Scheduler, Transport};
use tokio::sync::broadcast;

use crate::{config::HeraldConfig, control_handler::HeraldControlHandler, dry_run::DryRunTransport};

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

/// Resolve when the daemon should exit: first signal broadcasts the
/// shutdown so the serving branches wind down cleanly, a second ctrl-c
/// forces the exit.
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => internal!(level = INFO, "ctrl-c received, shutting down"),
        _ = terminate.recv() => internal!(level = INFO, "SIGTERM received, shutting down"),
    }

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::Interrupted, error.to_string()))?;

    tokio::signal::ctrl_c().await?;
    internal!(level = INFO, "second ctrl-c, forcing exit");

    Ok(())
}

/// The herald daemon: scheduler plus control plane.
pub struct Herald {
    config: HeraldConfig,
}

impl Herald {
    #[must_use]
    pub fn new(config: HeraldConfig) -> Self {
        Self { config }
    }

    /// Run with the dry-run transport.
    ///
    /// No message leaves the machine; sends are accepted and counted so an
    /// operator can rehearse pacing, rotation and controls.
    ///
    /// # Errors
    ///
    /// Returns an error if the control server fails to bind or serve.
    pub async fn run(self) -> anyhow::Result<()> {
        let transport = Arc::new(DryRunTransport::new());
        self.run_with(transport).await
    }

    /// Run this controller, and everything it controls, with the given
    /// transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the control server fails to bind or serve.
    pub async fn run_with(self, transport: Arc<dyn Transport>) -> anyhow::Result<()> {
        logging::init();

        internal!(level = INFO, "Controller running");

        let journal = Arc::new(FileDeliveryLog::new(&self.config.journal.path));
        let sink = Arc::new(herald_common::notification::TracingSink);
        let scheduler = Scheduler::new(self.config.scheduler.clone(), transport, journal, sink);

        let handler = Arc::new(HeraldControlHandler::new(scheduler.clone()));
        let control = ControlServer::new(self.config.control.socket.clone(), handler)?;

        let ret = tokio::select! {
            r = control.serve(SHUTDOWN_BROADCAST.subscribe()) => {
                r.map_err(Into::into)
            }
            r = shutdown() => {
                r
            }
        };

        // Halt a running loop so the cursor settles before exit; the
        // campaign stays queued for the next session.
        let _ = scheduler.stop();

        internal!(level = INFO, "Shutting down...");

        ret
    }
}
