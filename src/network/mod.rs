//! Network module - UDP socket lifecycle and background I/O
//!
//! Provides:
//! - [`SocketManager`] owning the socket: open, close, reconnect
//! - Listener task forwarding inbound datagrams to the transport sink
//! - Sender task draining a queue of outbound datagrams with a bounded
//!   reconnect-and-retry policy

mod listener;
mod sender;
mod socket;

pub use sender::{send_with_retry, SendPort};
pub use socket::*;

use std::time::Duration;

/// Default receive/send timeout (10 seconds)
pub const SOCKET_TIMEOUT_MS: u64 = 10_000;

/// Default socket buffer size in bytes
pub const SOCKET_BUFFER_SIZE: usize = 2048;

/// Configuration for the UDP socket
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Receive/send timeout in milliseconds
    pub timeout_ms: u64,
    /// Receive/send buffer size in bytes
    pub buffer_size: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            timeout_ms: SOCKET_TIMEOUT_MS,
            buffer_size: SOCKET_BUFFER_SIZE,
        }
    }
}

impl SocketConfig {
    /// The receive timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// How long `close` waits for a background task: timeout plus a one
    /// second margin.
    pub fn join_window(&self) -> Duration {
        Duration::from_millis(self.timeout_ms + 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_socket_config() {
        let config = SocketConfig::default();
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.buffer_size, 2048);
        assert_eq!(config.join_window(), Duration::from_millis(11_000));
    }
}
