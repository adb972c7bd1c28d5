//! Background receive loop
//!
//! One persistent task per open socket. It blocks on receive with the
//! configured timeout, frames each datagram as RECV_DATA, and forwards it
//! through the transport sink. Timeouts and I/O errors are steady-state
//! conditions; only the shutdown signal ends the loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::socket::Connection;
use super::SocketConfig;
use crate::protocol::frame;
use crate::rpc::TransportSink;

pub(crate) fn spawn(
    conn: Connection,
    sink: Arc<dyn TransportSink>,
    config: SocketConfig,
    mut stop_rx: mpsc::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; config.buffer_size];
        let recv_timeout = config.timeout();

        loop {
            tokio::select! {
                // Fires on an explicit stop or when the manager drops its
                // stop handle during close.
                _ = stop_rx.recv() => break,

                result = tokio::time::timeout(recv_timeout, conn.recv(&mut buf)) => {
                    match result {
                        Err(_) => {
                            tracing::debug!("listener: receive timed out, retrying");
                        }
                        Ok(Ok(0)) => {
                            tracing::debug!("listener: empty datagram, ignoring");
                        }
                        Ok(Ok(n)) => {
                            tracing::debug!("listener: received {} bytes, forwarding to peer", n);
                            let framed = frame::recv_frame(&buf[..n]);
                            if sink.send_frame(&framed).await {
                                tracing::debug!("listener: forward completed");
                            } else {
                                tracing::warn!("listener: transport sink rejected frame");
                            }
                        }
                        Ok(Err(e)) => {
                            tracing::warn!("listener: receive error (continuing): {}", e);
                        }
                    }
                }
            }
        }

        tracing::debug!("listener: exiting loop");
    })
}
