//! RPC engine - accumulation, dispatch, and command handling
//!
//! [`RpcEngine`] is the protocol core: it accumulates transport fragments,
//! parses complete frames, and routes each command to the socket layer, the
//! sender, or the location provider. Every failure path ends in a log line
//! and a boolean; nothing here can take the hosting process down.

mod callbacks;

pub use callbacks::*;

use std::sync::Arc;

use crate::network::{SocketConfig, SocketManager};
use crate::protocol::{codec, frame, Accumulator, Command};

/// The protocol engine bridging the serial transport and the UDP socket.
pub struct RpcEngine {
    accumulator: Accumulator,
    /// Scratch command id of the frame being dispatched
    fn_id: u32,
    /// Scratch argument string of the frame being dispatched
    args: String,
    socket: SocketManager,
    sink: Arc<dyn TransportSink>,
    location: Arc<dyn LocationProvider>,
}

impl RpcEngine {
    pub fn new(
        config: SocketConfig,
        sink: Arc<dyn TransportSink>,
        location: Arc<dyn LocationProvider>,
    ) -> Self {
        Self {
            accumulator: Accumulator::new(),
            fn_id: 0,
            args: String::new(),
            socket: SocketManager::new(config, sink.clone()),
            sink,
            location,
        }
    }

    /// Feed a transport fragment into the accumulator. Returns true when a
    /// complete frame is buffered and [`dispatch`] should be called.
    ///
    /// [`dispatch`]: RpcEngine::dispatch
    pub fn accumulate(&mut self, chunk: &str) -> bool {
        self.accumulator.accumulate(chunk)
    }

    /// The accumulated text so far.
    pub fn accumulation(&self) -> &str {
        self.accumulator.contents()
    }

    /// Whether a UDP connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.socket.is_connected()
    }

    /// The current remote endpoint, if any.
    pub fn remote(&self) -> Option<std::net::SocketAddr> {
        self.socket.remote()
    }

    /// Parse the accumulated frame and route it to its handler.
    ///
    /// Returns the handler's success boolean; it is informational and never
    /// used to retry. The accumulator and scratch fields are cleared after
    /// every attempt, success or failure.
    pub async fn dispatch(&mut self) -> bool {
        let fields = frame::parse(self.accumulator.contents());
        let success = self.dispatch_fields(&fields).await;
        self.reset();
        success
    }

    async fn dispatch_fields(&mut self, fields: &[String]) -> bool {
        let fn_id: u32 = match fields.first().and_then(|f| f.trim().parse().ok()) {
            Some(id) => id,
            None => {
                tracing::error!("dispatch: malformed command id in {:?}", fields);
                return false;
            }
        };

        self.fn_id = fn_id;
        self.args = fields.get(1).cloned().unwrap_or_default();
        tracing::debug!("dispatch: fn_id={} args=[{}]", self.fn_id, self.args);

        match Command::from_id(fn_id) {
            Some(Command::OpenSocket) => {
                let args = self.args.clone();
                let success = self.socket.open(&args).await;
                self.sink.ack_open(success).await;
                success
            }
            Some(Command::CloseSocket) => self.socket.close().await,
            Some(Command::SendData) => {
                let args = self.args.clone();
                self.send_data(&args)
            }
            Some(Command::GetLocation) => self.get_location().await,
            Some(Command::RecvData) | None => {
                tracing::warn!(
                    "dispatch: improper fn_id={} args=[{}], ignoring",
                    self.fn_id,
                    self.args
                );
                false
            }
        }
    }

    /// Decode the payload and hand it to the Sender. The send itself
    /// completes asynchronously; the return value only says whether the
    /// datagram was accepted.
    fn send_data(&self, payload: &str) -> bool {
        if payload.is_empty() {
            tracing::warn!("send: payload has zero length, not sending");
            return false;
        }

        let raw = match codec::decode(payload) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("send: payload decode failed: {}", e);
                return false;
            }
        };
        if raw.is_empty() {
            tracing::error!("send: decoded payload has zero length");
            return false;
        }

        if !self.socket.is_connected() {
            tracing::error!("send: no open connection");
            return false;
        }

        self.socket.send(raw)
    }

    /// Answer GET_LOCATION: fetch the fix, frame it, and push it through the
    /// transport sink.
    async fn get_location(&self) -> bool {
        let location = self.location.current_location();
        tracing::debug!("get_location: current fix: {}", location);

        let packet = frame::location_frame(&location);
        let success = self.sink.send_frame(&packet).await;
        if success {
            tracing::debug!("get_location: fix sent");
        } else {
            tracing::error!("get_location: fix send failed");
        }
        success
    }

    /// Close the socket and stop the background tasks.
    pub async fn close(&mut self) -> bool {
        self.socket.close().await
    }

    fn reset(&mut self) {
        self.accumulator.clear();
        self.fn_id = 0;
        self.args.clear();
    }
}
