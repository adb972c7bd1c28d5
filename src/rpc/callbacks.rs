//! Collaborator capabilities consumed by the engine
//!
//! The transport sink and the location provider are injected at construction
//! time as trait objects; the engine holds no ambient references.

use async_trait::async_trait;

/// The transport-facing side of the bridge: ships outbound frames to the
/// serial peer and acknowledges socket-open attempts.
#[async_trait]
pub trait TransportSink: Send + Sync {
    /// Transmit a pre-framed text packet to the peer. Returns whether the
    /// transport accepted it.
    async fn send_frame(&self, frame: &str) -> bool;

    /// Notified with the outcome of every OPEN_SOCKET attempt, exactly once
    /// per attempt, before dispatch returns.
    async fn ack_open(&self, success: bool);
}

/// Supplies the current location fix as text on demand.
pub trait LocationProvider: Send + Sync {
    fn current_location(&self) -> String;
}
