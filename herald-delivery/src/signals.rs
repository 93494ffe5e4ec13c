//! Cooperative control signals for the delivery loop.
//!
//! Control callers never touch the cursor or in-flight send data; they
//! flip these flags and the loop observes them at its defined suspension
//! points (top of each iteration and every pacing slice). An in-flight
//! send is not preemptible.

use std::sync::atomic::{AtomicBool, Ordering};

/// Pause / abort / stop flags shared between the loop and control callers.
#[derive(Debug, Default)]
pub struct ControlSignals {
    pause: AtomicBool,
    abort: AtomicBool,
    stop: AtomicBool,
}

impl ControlSignals {
    /// Clear every flag. Called when a run starts.
    pub fn reset(&self) {
        self.pause.store(false, Ordering::SeqCst);
        self.abort.store(false, Ordering::SeqCst);
        self.stop.store(false, Ordering::SeqCst);
    }

    pub fn set_paused(&self, paused: bool) {
        self.pause.store(paused, Ordering::SeqCst);
    }

    #[must_use]
    pub fn paused(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Observe-and-clear the abort request. The loop consumes the flag so
    /// a single request produces exactly one checkpoint.
    #[must_use]
    pub fn take_abort(&self) -> bool {
        self.abort.swap(false, Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Whether any signal should cut a pacing sleep short.
    #[must_use]
    pub fn interrupts_pacing(&self) -> bool {
        self.stop_requested() || self.abort_requested() || self.paused()
    }
}
