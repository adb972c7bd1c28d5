//! UDP socket ownership and lifecycle
//!
//! [`SocketManager`] is the single owner of the connection state: the socket
//! handle, the remote endpoint, and the background Listener and Sender tasks.
//! All mutations go through `&mut self`, so open/close/send are serialized by
//! construction. At most one connection exists at a time; a second open tears
//! the previous one down first.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::sender::SendPort;
use super::{listener, sender, SocketConfig};
use crate::rpc::TransportSink;

/// Capacity of the outbound datagram queue
const SEND_QUEUE_DEPTH: usize = 32;

/// Socket-layer errors. These never propagate past [`SocketManager::open`];
/// they are logged and converted to a boolean there.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("bad endpoint argument: {0:?} (expected \"<address> <port>\")")]
    BadEndpoint(String),

    #[error("could not resolve {0}")]
    Resolve(String),
}

pub type NetResult<T> = Result<T, NetError>;

/// A live UDP socket bound to its remote endpoint.
///
/// Cheap to clone; the background tasks hold their own clones so the manager
/// can drop its reference on close without racing them.
#[derive(Debug, Clone)]
pub struct Connection {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
}

impl Connection {
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf).await
    }
}

#[async_trait]
impl SendPort for Connection {
    async fn transmit(&self, payload: &[u8]) -> io::Result<()> {
        self.socket.send(payload).await.map(|_| ())
    }

    /// Re-establish the association to the same remote endpoint on the
    /// existing socket handle.
    async fn reconnect(&self) -> io::Result<()> {
        tracing::debug!("reconnecting to {}", self.remote);
        self.socket.connect(self.remote).await
    }
}

/// Owns the UDP socket and its background tasks.
pub struct SocketManager {
    config: SocketConfig,
    sink: Arc<dyn TransportSink>,
    conn: Option<Connection>,
    send_tx: Option<mpsc::Sender<Vec<u8>>>,
    sender_task: Option<JoinHandle<()>>,
    listener_stop: Option<mpsc::Sender<()>>,
    listener_task: Option<JoinHandle<()>>,
}

impl SocketManager {
    pub fn new(config: SocketConfig, sink: Arc<dyn TransportSink>) -> Self {
        Self {
            config,
            sink,
            conn: None,
            send_tx: None,
            sender_task: None,
            listener_stop: None,
            listener_task: None,
        }
    }

    /// Whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// The current remote endpoint, if any.
    pub fn remote(&self) -> Option<SocketAddr> {
        self.conn.as_ref().map(|c| c.remote())
    }

    /// Open a UDP socket to the endpoint given as `"<address> <port>"`.
    ///
    /// On success the Listener and Sender tasks are running and `true` is
    /// returned. On any failure partial state is torn down via [`close`]
    /// and `false` is returned; socket-layer errors never propagate.
    ///
    /// [`close`]: SocketManager::close
    pub async fn open(&mut self, args: &str) -> bool {
        if self.is_connected() {
            tracing::debug!("open: replacing existing connection");
            self.close().await;
        }

        match self.try_open(args).await {
            Ok(remote) => {
                tracing::info!("open: UDP socket connected to {}", remote);
                true
            }
            Err(e) => {
                tracing::error!("open failed: {}", e);
                self.close().await;
                false
            }
        }
    }

    async fn try_open(&mut self, args: &str) -> NetResult<SocketAddr> {
        let remote = resolve_endpoint(args).await?;

        tracing::debug!("open: creating UDP socket for {}", remote);
        let socket = create_socket(&remote, &self.config)?;
        socket.connect(remote).await?;

        let conn = Connection {
            socket: Arc::new(socket),
            remote,
        };

        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        self.listener_task = Some(listener::spawn(
            conn.clone(),
            self.sink.clone(),
            self.config.clone(),
            stop_rx,
        ));
        self.listener_stop = Some(stop_tx);

        let (send_tx, send_rx) = mpsc::channel::<Vec<u8>>(SEND_QUEUE_DEPTH);
        self.sender_task = Some(sender::spawn(conn.clone(), send_rx));
        self.send_tx = Some(send_tx);

        self.conn = Some(conn);
        Ok(remote)
    }

    /// Queue a datagram for the Sender task.
    ///
    /// Returns whether the datagram was accepted; the send itself completes
    /// asynchronously and its outcome is only logged.
    pub fn send(&self, payload: Vec<u8>) -> bool {
        match &self.send_tx {
            Some(tx) => match tx.try_send(payload) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("send: outbound queue rejected datagram: {}", e);
                    false
                }
            },
            None => {
                tracing::error!("send: no open connection");
                false
            }
        }
    }

    /// Close the socket and stop the background tasks. Idempotent; closing
    /// an unopened socket is a no-op, not an error.
    ///
    /// The Sender queue is closed and drained first so in-flight sends
    /// complete before the socket is released; the Listener is then signaled
    /// and joined within the configured window.
    pub async fn close(&mut self) -> bool {
        // Dropping the queue handle lets the sender drain and exit.
        self.send_tx.take();
        if let Some(task) = self.sender_task.take() {
            tracing::debug!("close: draining sender...");
            if tokio::time::timeout(self.config.join_window(), task)
                .await
                .is_err()
            {
                tracing::warn!("close: sender did not drain within the join window");
            }
        }

        // Dropping the stop handle wakes the listener's shutdown arm.
        self.listener_stop.take();
        if let Some(task) = self.listener_task.take() {
            tracing::debug!("close: stopping listener...");
            if tokio::time::timeout(self.config.join_window(), task)
                .await
                .is_err()
            {
                tracing::warn!("close: listener did not stop within the join window");
            }
        }

        if self.conn.take().is_some() {
            tracing::debug!("close: socket released");
        }
        true
    }
}

/// Parse and resolve a `"<address> <port>"` argument string.
async fn resolve_endpoint(args: &str) -> NetResult<SocketAddr> {
    let mut parts = args.split_whitespace();
    let (host, port) = match (parts.next(), parts.next()) {
        (Some(host), Some(port)) => (host, port),
        _ => return Err(NetError::BadEndpoint(args.to_string())),
    };
    let port: u16 = port
        .parse()
        .map_err(|_| NetError::BadEndpoint(args.to_string()))?;

    let target = format!("{}:{}", host, port);
    let addr = tokio::net::lookup_host(&target).await?.next();
    addr.ok_or(NetError::Resolve(target))
}

/// Create a UDP socket configured per the protocol contract: fixed buffer
/// sizes, broadcast disabled, address reuse enabled. The receive timeout is
/// applied by the Listener around each receive call.
fn create_socket(remote: &SocketAddr, config: &SocketConfig) -> io::Result<UdpSocket> {
    let domain = if remote.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(false)?;
    socket.set_recv_buffer_size(config.buffer_size)?;
    socket.set_send_buffer_size(config.buffer_size)?;
    socket.set_nonblocking(true)?;

    let bind_addr: SocketAddr = if remote.is_ipv4() {
        (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    };
    socket.bind(&bind_addr.into())?;

    UdpSocket::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_endpoint() {
        let addr = resolve_endpoint("127.0.0.1 9000").await.unwrap();
        assert_eq!(addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_endpoint_rejects_garbage() {
        assert!(resolve_endpoint("").await.is_err());
        assert!(resolve_endpoint("127.0.0.1").await.is_err());
        assert!(resolve_endpoint("127.0.0.1 notaport").await.is_err());
    }

    #[tokio::test]
    async fn test_create_socket_applies_options() {
        let remote: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let socket = create_socket(&remote, &SocketConfig::default()).unwrap();
        assert!(!socket.broadcast().unwrap());
        assert_eq!(socket.local_addr().unwrap().ip().to_string(), "0.0.0.0");
    }
}
