//! Console protocol message types.
//!
//! One UDP port carries both discovery and session traffic.  Every datagram
//! holds exactly one message: a 16-byte header followed by the payload (see
//! [`crate::protocol::codec`]).

use serde::{Deserialize, Serialize};

use crate::output::OutputFrame;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Current protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Total size of the common message header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Application identifier carried by discovery requests.  Hosts ignore
/// requests for any other application.
pub const APP_IDENTIFIER: &str = "devconsole.app";

/// Default UDP port for discovery and sessions.
pub const DEFAULT_PORT: u16 = 24810;

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Session control (0x01–0x3F)
    Connect = 0x01,
    ConnectAck = 0x02,
    Disconnect = 0x03,
    Ping = 0x04,
    Pong = 0x05,
    // Console traffic (0x40–0x7F)
    Command = 0x40,
    Ack = 0x41,
    Output = 0x42,
    // Discovery (0x80–0x8F)
    DiscoveryRequest = 0x80,
    DiscoveryResponse = 0x81,
}

impl TryFrom<u8> for MessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(MessageType::Connect),
            0x02 => Ok(MessageType::ConnectAck),
            0x03 => Ok(MessageType::Disconnect),
            0x04 => Ok(MessageType::Ping),
            0x05 => Ok(MessageType::Pong),
            0x40 => Ok(MessageType::Command),
            0x41 => Ok(MessageType::Ack),
            0x42 => Ok(MessageType::Output),
            0x80 => Ok(MessageType::DiscoveryRequest),
            0x81 => Ok(MessageType::DiscoveryResponse),
            _ => Err(()),
        }
    }
}

/// How a message type travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent once; may be lost, duplicated or reordered.
    Unreliable,
    /// Retransmitted until acknowledged and released to the receiver in
    /// sequence order.
    ReliableOrdered,
}

impl MessageType {
    pub fn delivery(self) -> Delivery {
        match self {
            MessageType::Command => Delivery::ReliableOrdered,
            _ => Delivery::Unreliable,
        }
    }
}

// ── Common message header ─────────────────────────────────────────────────────

/// 16-byte header prepended to every message on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Protocol version; always [`PROTOCOL_VERSION`].
    pub version: u8,
    /// Identifies the payload type.
    pub message_type: MessageType,
    /// Length of the payload in bytes (not including this header).
    pub payload_length: u32,
    /// Per-sender counter.  For reliable messages it is the reliability
    /// sequence; for everything else it is informational.
    pub sequence_number: u64,
}

// ── Per-message payload structs ───────────────────────────────────────────────

/// A command line submitted by the remote tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub line: String,
    /// `true` when a person typed the line.
    pub manual: bool,
}

/// Top-level message enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleMessage {
    /// Broadcast by a remote tool looking for hosts.
    DiscoveryRequest { app_id: String },
    /// A host's answer: its identity and the port sessions use.
    DiscoveryResponse { identity: String, port: u16 },
    /// Opens a session.
    Connect { client_name: String },
    /// Answer to `Connect`; `reason` is empty when accepted.
    ConnectAck { accepted: bool, reason: String },
    /// Ends the session from either side.
    Disconnect { reason: String },
    Ping(u64),
    Pong(u64),
    /// Reliable-ordered; the reliability sequence travels in the header.
    Command(CommandMessage),
    /// Acknowledges a reliable message by sequence number.
    Ack { sequence: u64 },
    /// Console output, best effort.
    Output(OutputFrame),
}

impl ConsoleMessage {
    /// Returns the [`MessageType`] code for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            ConsoleMessage::DiscoveryRequest { .. } => MessageType::DiscoveryRequest,
            ConsoleMessage::DiscoveryResponse { .. } => MessageType::DiscoveryResponse,
            ConsoleMessage::Connect { .. } => MessageType::Connect,
            ConsoleMessage::ConnectAck { .. } => MessageType::ConnectAck,
            ConsoleMessage::Disconnect { .. } => MessageType::Disconnect,
            ConsoleMessage::Ping(_) => MessageType::Ping,
            ConsoleMessage::Pong(_) => MessageType::Pong,
            ConsoleMessage::Command(_) => MessageType::Command,
            ConsoleMessage::Ack { .. } => MessageType::Ack,
            ConsoleMessage::Output(_) => MessageType::Output,
        }
    }
}

/// A decoded message together with its header sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sequence: u64,
    pub message: ConsoleMessage,
}
