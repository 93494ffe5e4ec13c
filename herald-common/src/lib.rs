pub mod campaign;
pub mod identity;
pub mod logging;
pub mod notification;
pub mod template;

pub use tracing;

/// Process-wide shutdown signalling, broadcast to every long-running task.
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Shutdown,
    Finalised,
}
