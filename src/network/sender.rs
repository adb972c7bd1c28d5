//! Outbound datagram path with bounded reconnect-and-retry
//!
//! One Sender task per open socket drains the outbound queue in order. A
//! send that fails with a connection-reset-class error gets exactly one
//! reconnect and one retry; a second failure abandons the datagram with a
//! log line. Other I/O failures are logged and not retried.

use std::io;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::socket::Connection;

/// The seam between the retry policy and the socket, so the policy is
/// testable without real network failures.
#[async_trait]
pub trait SendPort: Send + Sync {
    /// Transmit one datagram to the connected endpoint.
    async fn transmit(&self, payload: &[u8]) -> io::Result<()>;

    /// Re-establish the connection to the same endpoint.
    async fn reconnect(&self) -> io::Result<()>;
}

/// Errors that indicate the peer association broke and a reconnect is worth
/// one attempt.
fn is_reset_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
    )
}

/// Send one datagram: first attempt, then on a reset-class failure exactly
/// one reconnect and one retry. Returns whether the datagram went out.
pub async fn send_with_retry<P: SendPort + ?Sized>(port: &P, payload: &[u8]) -> bool {
    match port.transmit(payload).await {
        Ok(()) => {
            tracing::debug!("send: {} bytes sent", payload.len());
            true
        }
        Err(e) if is_reset_error(&e) => {
            tracing::warn!("send failed ({}), reconnecting...", e);
            if let Err(e) = port.reconnect().await {
                tracing::warn!("send: reconnect failed, giving up: {}", e);
                return false;
            }
            match port.transmit(payload).await {
                Ok(()) => {
                    tracing::debug!("send: resend after reconnect succeeded");
                    true
                }
                Err(e) => {
                    tracing::warn!("send: resend failed, giving up: {}", e);
                    false
                }
            }
        }
        Err(e) => {
            tracing::error!("send failed: {}", e);
            false
        }
    }
}

/// Spawn the Sender task. It exits once the queue handle is dropped and the
/// remaining datagrams are drained, which is what makes `close` deterministic.
pub(crate) fn spawn(conn: Connection, mut rx: mpsc::Receiver<Vec<u8>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            send_with_retry(&conn, &payload).await;
        }
        tracing::debug!("sender: queue closed, exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A port that fails the first `failures` transmits with the given error
    /// kind, then succeeds.
    struct FlakyPort {
        failures: usize,
        kind: io::ErrorKind,
        reconnect_ok: bool,
        transmits: AtomicUsize,
        reconnects: AtomicUsize,
    }

    impl FlakyPort {
        fn new(failures: usize, kind: io::ErrorKind) -> Self {
            Self {
                failures,
                kind,
                reconnect_ok: true,
                transmits: AtomicUsize::new(0),
                reconnects: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SendPort for FlakyPort {
        async fn transmit(&self, _payload: &[u8]) -> io::Result<()> {
            let n = self.transmits.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(io::Error::new(self.kind, "simulated failure"))
            } else {
                Ok(())
            }
        }

        async fn reconnect(&self) -> io::Result<()> {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            if self.reconnect_ok {
                Ok(())
            } else {
                Err(io::Error::new(io::ErrorKind::Other, "reconnect refused"))
            }
        }
    }

    #[tokio::test]
    async fn test_send_succeeds_first_try() {
        let port = FlakyPort::new(0, io::ErrorKind::ConnectionReset);
        assert!(send_with_retry(&port, b"hi").await);
        assert_eq!(port.transmits.load(Ordering::SeqCst), 1);
        assert_eq!(port.reconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reset_triggers_exactly_one_retry() {
        let port = FlakyPort::new(1, io::ErrorKind::ConnectionReset);
        assert!(send_with_retry(&port, b"hi").await);
        assert_eq!(port.transmits.load(Ordering::SeqCst), 2);
        assert_eq!(port.reconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_failure_gives_up() {
        let port = FlakyPort::new(2, io::ErrorKind::ConnectionRefused);
        assert!(!send_with_retry(&port, b"hi").await);
        // Exactly one retry, never more.
        assert_eq!(port.transmits.load(Ordering::SeqCst), 2);
        assert_eq!(port.reconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_reset_error_is_not_retried() {
        let port = FlakyPort::new(1, io::ErrorKind::PermissionDenied);
        assert!(!send_with_retry(&port, b"hi").await);
        assert_eq!(port.transmits.load(Ordering::SeqCst), 1);
        assert_eq!(port.reconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_reconnect_gives_up_without_resend() {
        let mut port = FlakyPort::new(2, io::ErrorKind::ConnectionReset);
        port.reconnect_ok = false;
        assert!(!send_with_retry(&port, b"hi").await);
        assert_eq!(port.transmits.load(Ordering::SeqCst), 1);
        assert_eq!(port.reconnects.load(Ordering::SeqCst), 1);
    }
}
