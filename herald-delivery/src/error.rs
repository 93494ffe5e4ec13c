//! Typed errors for scheduler control operations.
//!
//! Every control command is accepted or rejected against the current
//! scheduler state; rejections are ordinary values, never panics. Failures
//! inside the delivery loop itself are not errors at this level: they are
//! classified per-recipient and the loop continues or transitions state.

use thiserror::Error;

/// Rejection reasons for scheduler control operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// A start was requested while a delivery loop is already live.
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// pause/abort/stop requested while the scheduler is idle.
    #[error("scheduler is not running")]
    NotRunning,

    /// resume requested while the scheduler is not paused.
    #[error("scheduler is not paused")]
    NotPaused,

    /// A start was requested with no identities loaded.
    #[error("identity pool is empty")]
    EmptyPool,

    /// A start was requested with no campaigns queued.
    #[error("campaign queue is empty")]
    EmptyQueue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            SchedulerError::AlreadyRunning.to_string(),
            "scheduler is already running"
        );
        assert_eq!(SchedulerError::EmptyPool.to_string(), "identity pool is empty");
    }
}
