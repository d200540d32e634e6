//! # Failure channel for background dispatch.
//!
//! [`FailureChannel`] is a thin wrapper around [`tokio::sync::broadcast`] that
//! carries [`HandlerFailure`] records produced by non-blocking publishes.
//! Those publishes have already returned when a handler fails, so the
//! failure goes here (and to the log) instead of back to the caller.
//!
//! ## Rules
//! - **Non-blocking report**: `report()` never waits; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: one ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest records.
//! - **No persistence**: records sent while nobody listens are only logged.

use tokio::sync::broadcast;

use crate::error::HandlerFailure;

/// Broadcast channel of background handler failures.
#[derive(Clone, Debug)]
pub struct FailureChannel {
    tx: broadcast::Sender<HandlerFailure>,
}

impl FailureChannel {
    /// Creates a channel with the given capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Logs the failure and broadcasts it to every current receiver.
    pub fn report(&self, failure: HandlerFailure) {
        tracing::error!(
            event = failure.event,
            handler = %failure.handler,
            label = failure.error.as_label(),
            error = %failure.error,
            "handler failed during background dispatch"
        );
        let _ = self.tx.send(failure);
    }

    /// Creates a receiver observing failures reported from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<HandlerFailure> {
        self.tx.subscribe()
    }
}
