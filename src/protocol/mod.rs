//! Protocol module - Defines the textual RPC frame protocol
//!
//! Frames are text units of the form `[<command_id>|<payload>]`:
//! - `[` / `]` are the frame head and tail markers
//! - `|` separates the decimal command id from the optional payload
//! - payloads carrying binary data are Base64 text
//!
//! The Base64 alphabet contains none of the marker characters, which is what
//! makes substring-based frame detection safe for encoded payloads.

pub mod codec;
pub mod frame;

pub use codec::*;
pub use frame::*;

/// Frame head marker
pub const FRAME_HEAD: char = '[';

/// Frame tail marker
pub const FRAME_TAIL: char = ']';

/// Field delimiter between command id and payload
pub const FIELD_DELIMITER: char = '|';

/// The fixed set of RPC commands. Not extensible at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Command {
    /// Open a UDP socket to `"<address> <port>"` (inbound)
    OpenSocket = 0x01,
    /// Close the current socket (inbound)
    CloseSocket = 0x02,
    /// Send a Base64-encoded datagram (inbound)
    SendData = 0x04,
    /// A received datagram, Base64-encoded (outbound)
    RecvData = 0x08,
    /// Request the current location fix (inbound, answered outbound)
    GetLocation = 0x16,
}

impl Command {
    /// Look up a command by its wire id. Unknown ids return `None`;
    /// the dispatcher treats them as tolerated no-ops.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0x01 => Some(Command::OpenSocket),
            0x02 => Some(Command::CloseSocket),
            0x04 => Some(Command::SendData),
            0x08 => Some(Command::RecvData),
            0x16 => Some(Command::GetLocation),
            _ => None,
        }
    }

    /// The decimal id written on the wire.
    pub fn id(self) -> u32 {
        self as u32
    }
}
