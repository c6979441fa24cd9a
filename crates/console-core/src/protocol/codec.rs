//! Binary codec for console protocol messages.
//!
//! Wire format:
//! ```text
//! [version:1][msg_type:1][reserved:2][payload_len:4][seq:8][payload:N]
//! ```
//! Total header size: 16 bytes.  All multi-byte integers are big-endian and
//! strings are a `u16` byte length followed by UTF-8.
//!
//! # Output frames
//!
//! An `Output` payload starts with a big-endian `i32` discriminator:
//!
//! | value | kind      | rest of payload                                   |
//! |-------|-----------|---------------------------------------------------|
//! | 0     | line      | string                                            |
//! | 1     | table     | `u32` count, then that many strings               |
//! | 2     | exception | message, exception message, stack trace (strings) |

use thiserror::Error;

use crate::output::{FrameKind, OutputFrame};
use crate::protocol::messages::{
    CommandMessage, ConsoleMessage, Envelope, MessageHeader, MessageType, HEADER_SIZE,
    PROTOCOL_VERSION,
};

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The message type byte in the header is not a recognized value.
    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// The protocol version in the header is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The payload could not be parsed (unknown discriminator, UTF-8 error, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The encoded payload length field does not match the actual data available.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },

    /// A string is longer than the `u16` length prefix can describe.
    #[error("string of {0} bytes exceeds the 65535-byte limit")]
    StringTooLong(usize),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`ConsoleMessage`] into a byte vector including the 16-byte header.
///
/// # Errors
///
/// Returns [`ProtocolError::StringTooLong`] if a string field cannot be
/// length-prefixed.
///
/// # Examples
///
/// ```rust
/// use console_core::protocol::{decode_message, encode_message, ConsoleMessage};
///
/// let msg = ConsoleMessage::Ping(42);
/// let bytes = encode_message(&msg, 0).unwrap();
/// let (envelope, consumed) = decode_message(&bytes).unwrap();
/// assert_eq!(envelope.message, msg);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_message(msg: &ConsoleMessage, sequence_number: u64) -> Result<Vec<u8>, ProtocolError> {
    let payload = encode_payload(msg)?;
    let payload_len = payload.len() as u32;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.push(PROTOCOL_VERSION);
    buf.push(msg.message_type() as u8);
    buf.push(0x00); // reserved
    buf.push(0x00); // reserved
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(&sequence_number.to_be_bytes());

    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Parses and validates the 16-byte header at the start of `bytes`.
///
/// # Errors
///
/// Returns [`ProtocolError`] for a short buffer, wrong version or unknown type.
pub fn decode_header(bytes: &[u8]) -> Result<MessageHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let msg_type_byte = bytes[1];
    let message_type = MessageType::try_from(msg_type_byte)
        .map_err(|_| ProtocolError::UnknownMessageType(msg_type_byte))?;

    // bytes[2..4] are reserved – ignored on decode

    Ok(MessageHeader {
        version,
        message_type,
        payload_length: read_u32(bytes, 4)?,
        sequence_number: read_u64(bytes, 8)?,
    })
}

/// Decodes one message from the beginning of `bytes`.
///
/// Returns the envelope and the total number of bytes consumed.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are malformed.
pub fn decode_message(bytes: &[u8]) -> Result<(Envelope, usize), ProtocolError> {
    let header = decode_header(bytes)?;
    let payload_len = header.payload_length as usize;

    let total_needed = HEADER_SIZE + payload_len;
    if bytes.len() < total_needed {
        return Err(ProtocolError::PayloadLengthMismatch {
            declared: payload_len,
            available: bytes.len() - HEADER_SIZE,
        });
    }

    let payload = &bytes[HEADER_SIZE..total_needed];
    let message = decode_payload(header.message_type, payload)?;
    Ok((
        Envelope {
            sequence: header.sequence_number,
            message,
        },
        total_needed,
    ))
}

/// Encodes just an output frame (discriminator + payload).
///
/// # Errors
///
/// Returns [`ProtocolError::StringTooLong`] for an oversized string field.
pub fn encode_output_frame(buf: &mut Vec<u8>, frame: &OutputFrame) -> Result<(), ProtocolError> {
    buf.extend_from_slice(&(frame.kind() as i32).to_be_bytes());
    match frame {
        OutputFrame::Line(text) => write_length_prefixed_string(buf, text)?,
        OutputFrame::Table(cells) => {
            buf.extend_from_slice(&(cells.len() as u32).to_be_bytes());
            for cell in cells {
                write_length_prefixed_string(buf, cell)?;
            }
        }
        OutputFrame::Exception {
            message,
            exception_message,
            stack_trace,
        } => {
            write_length_prefixed_string(buf, message)?;
            write_length_prefixed_string(buf, exception_message)?;
            write_length_prefixed_string(buf, stack_trace)?;
        }
    }
    Ok(())
}

/// Decodes an output frame payload.
///
/// # Errors
///
/// [`ProtocolError::MalformedPayload`] for an unknown discriminator or a
/// truncated field.
pub fn decode_output_frame(p: &[u8]) -> Result<OutputFrame, ProtocolError> {
    require_len(p, 4, "Output")?;
    let raw_kind = i32::from_be_bytes([p[0], p[1], p[2], p[3]]);
    let kind = FrameKind::try_from(raw_kind)
        .map_err(|_| ProtocolError::MalformedPayload(format!("unknown output kind: {raw_kind}")))?;

    match kind {
        FrameKind::Line => {
            let (text, _) = read_length_prefixed_string(p, 4)?;
            Ok(OutputFrame::Line(text))
        }
        FrameKind::Table => {
            require_len(p, 8, "Output.table")?;
            let count = read_u32(p, 4)? as usize;
            // every cell needs at least its 2-byte length prefix
            require_len(p, 8 + count.saturating_mul(2), "Output.table cells")?;
            let mut cells = Vec::with_capacity(count);
            let mut off = 8;
            for _ in 0..count {
                let (cell, next) = read_length_prefixed_string(p, off)?;
                cells.push(cell);
                off = next;
            }
            Ok(OutputFrame::Table(cells))
        }
        FrameKind::Exception => {
            let (message, off) = read_length_prefixed_string(p, 4)?;
            let (exception_message, off) = read_length_prefixed_string(p, off)?;
            let (stack_trace, _) = read_length_prefixed_string(p, off)?;
            Ok(OutputFrame::Exception {
                message,
                exception_message,
                stack_trace,
            })
        }
    }
}

// ── Payload encoding ──────────────────────────────────────────────────────────

fn encode_payload(msg: &ConsoleMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    match msg {
        ConsoleMessage::DiscoveryRequest { app_id } => write_length_prefixed_string(&mut buf, app_id)?,
        ConsoleMessage::DiscoveryResponse { identity, port } => {
            buf.extend_from_slice(&port.to_be_bytes());
            write_length_prefixed_string(&mut buf, identity)?;
        }
        ConsoleMessage::Connect { client_name } => write_length_prefixed_string(&mut buf, client_name)?,
        ConsoleMessage::ConnectAck { accepted, reason } => {
            buf.push(if *accepted { 0x01 } else { 0x00 });
            write_length_prefixed_string(&mut buf, reason)?;
        }
        ConsoleMessage::Disconnect { reason } => write_length_prefixed_string(&mut buf, reason)?,
        ConsoleMessage::Ping(token) => buf.extend_from_slice(&token.to_be_bytes()),
        ConsoleMessage::Pong(token) => buf.extend_from_slice(&token.to_be_bytes()),
        ConsoleMessage::Command(m) => encode_command(&mut buf, m)?,
        ConsoleMessage::Ack { sequence } => buf.extend_from_slice(&sequence.to_be_bytes()),
        ConsoleMessage::Output(frame) => encode_output_frame(&mut buf, frame)?,
    }
    Ok(buf)
}

fn encode_command(buf: &mut Vec<u8>, m: &CommandMessage) -> Result<(), ProtocolError> {
    buf.push(if m.manual { 0x01 } else { 0x00 });
    write_length_prefixed_string(buf, &m.line)
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn decode_payload(msg_type: MessageType, payload: &[u8]) -> Result<ConsoleMessage, ProtocolError> {
    match msg_type {
        MessageType::DiscoveryRequest => {
            let (app_id, _) = read_length_prefixed_string(payload, 0)?;
            Ok(ConsoleMessage::DiscoveryRequest { app_id })
        }
        MessageType::DiscoveryResponse => {
            require_len(payload, 4, "DiscoveryResponse")?;
            let port = u16::from_be_bytes([payload[0], payload[1]]);
            let (identity, _) = read_length_prefixed_string(payload, 2)?;
            Ok(ConsoleMessage::DiscoveryResponse { identity, port })
        }
        MessageType::Connect => {
            let (client_name, _) = read_length_prefixed_string(payload, 0)?;
            Ok(ConsoleMessage::Connect { client_name })
        }
        MessageType::ConnectAck => {
            require_len(payload, 3, "ConnectAck")?;
            let accepted = payload[0] != 0;
            let (reason, _) = read_length_prefixed_string(payload, 1)?;
            Ok(ConsoleMessage::ConnectAck { accepted, reason })
        }
        MessageType::Disconnect => {
            let (reason, _) = read_length_prefixed_string(payload, 0)?;
            Ok(ConsoleMessage::Disconnect { reason })
        }
        MessageType::Ping => Ok(ConsoleMessage::Ping(read_u64(payload, 0)?)),
        MessageType::Pong => Ok(ConsoleMessage::Pong(read_u64(payload, 0)?)),
        MessageType::Command => {
            // 1 (manual) + 2 (line_len) + line
            require_len(payload, 3, "Command")?;
            let manual = payload[0] != 0;
            let (line, _) = read_length_prefixed_string(payload, 1)?;
            Ok(ConsoleMessage::Command(CommandMessage { line, manual }))
        }
        MessageType::Ack => Ok(ConsoleMessage::Ack {
            sequence: read_u64(payload, 0)?,
        }),
        MessageType::Output => decode_output_frame(payload).map(ConsoleMessage::Output),
    }
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn require_len(buf: &[u8], needed: usize, context: &str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            buf.len()
        )))
    } else {
        Ok(())
    }
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32, ProtocolError> {
    if buf.len() < offset + 4 {
        return Err(ProtocolError::InsufficientData {
            needed: offset + 4,
            available: buf.len(),
        });
    }
    Ok(u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]))
}

fn read_u64(buf: &[u8], offset: usize) -> Result<u64, ProtocolError> {
    if buf.len() < offset + 8 {
        return Err(ProtocolError::InsufficientData {
            needed: offset + 8,
            available: buf.len(),
        });
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    Ok(u64::from_be_bytes(raw))
}

/// Writes a 2-byte length prefix followed by the UTF-8 string bytes.
fn write_length_prefixed_string(buf: &mut Vec<u8>, s: &str) -> Result<(), ProtocolError> {
    let bytes = s.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| ProtocolError::StringTooLong(bytes.len()))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Reads a 2-byte length prefix and then that many UTF-8 bytes.
/// Returns the string and the offset of the byte after the string.
fn read_length_prefixed_string(buf: &[u8], offset: usize) -> Result<(String, usize), ProtocolError> {
    if buf.len() < offset + 2 {
        return Err(ProtocolError::MalformedPayload(format!(
            "need 2 bytes for string length at offset {offset}"
        )));
    }
    let len = u16::from_be_bytes([buf[offset], buf[offset + 1]]) as usize;
    let start = offset + 2;
    if buf.len() < start + len {
        return Err(ProtocolError::MalformedPayload(format!(
            "string of length {len} at offset {start} exceeds buffer"
        )));
    }
    let s = std::str::from_utf8(&buf[start..start + len])
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))?
        .to_string();
    Ok((s, start + len))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::*;

    fn round_trip(msg: &ConsoleMessage) -> ConsoleMessage {
        let encoded = encode_message(msg, 7).expect("encode failed");
        let (decoded, consumed) = decode_message(&encoded).expect("decode failed");
        assert_eq!(consumed, encoded.len(), "consumed bytes should equal total encoded size");
        assert_eq!(decoded.sequence, 7);
        decoded.message
    }

    #[test]
    fn test_discovery_messages_round_trip() {
        let request = ConsoleMessage::DiscoveryRequest {
            app_id: APP_IDENTIFIER.to_string(),
        };
        let response = ConsoleMessage::DiscoveryResponse {
            identity: "Game (pid 42)".to_string(),
            port: DEFAULT_PORT,
        };
        assert_eq!(round_trip(&request), request);
        assert_eq!(round_trip(&response), response);
    }

    #[test]
    fn test_command_with_unicode_line_round_trip() {
        let msg = ConsoleMessage::Command(CommandMessage {
            line: "echo \"héllo wörld\" && cmdlist".to_string(),
            manual: true,
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_connect_ack_rejected_round_trip() {
        let msg = ConsoleMessage::ConnectAck {
            accepted: false,
            reason: "busy".to_string(),
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_output_frames_round_trip() {
        for frame in [
            OutputFrame::line(""),
            OutputFrame::Table(vec![]),
            OutputFrame::Table(vec!["a".into(), "bb".into(), "".into()]),
            OutputFrame::Exception {
                message: "Error while executing command 'x'".into(),
                exception_message: "boom".into(),
                stack_trace: "0: main\n1: start".into(),
            },
        ] {
            let msg = ConsoleMessage::Output(frame);
            assert_eq!(round_trip(&msg), msg);
        }
    }

    #[test]
    fn test_output_payload_starts_with_i32_discriminator() {
        // Arrange
        let msg = ConsoleMessage::Output(OutputFrame::Exception {
            message: String::new(),
            exception_message: String::new(),
            stack_trace: String::new(),
        });

        // Act
        let bytes = encode_message(&msg, 0).unwrap();

        // Assert
        assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 4], &2i32.to_be_bytes());
    }

    #[test]
    fn test_unknown_output_discriminator_is_malformed() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&9i32.to_be_bytes());
        let result = decode_output_frame(&payload);
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_truncated_table_is_malformed() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1i32.to_be_bytes());
        payload.extend_from_slice(&1000u32.to_be_bytes());
        payload.extend_from_slice(&[0, 1, b'x']);
        assert!(decode_output_frame(&payload).is_err());
    }

    #[test]
    fn test_oversized_string_is_rejected_on_encode() {
        let msg = ConsoleMessage::Output(OutputFrame::line("a".repeat(70_000)));
        assert_eq!(encode_message(&msg, 0), Err(ProtocolError::StringTooLong(70_000)));
    }

    #[test]
    fn test_max_length_string_round_trip() {
        let msg = ConsoleMessage::Disconnect {
            reason: "a".repeat(u16::MAX as usize),
        };
        assert_eq!(round_trip(&msg), msg);
    }

    // ── Error conditions ──────────────────────────────────────────────────────

    #[test]
    fn test_decode_empty_bytes_returns_insufficient_data() {
        let result = decode_message(&[]);
        assert!(matches!(result, Err(ProtocolError::InsufficientData { .. })));
    }

    #[test]
    fn test_decode_unknown_message_type_returns_error() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0] = PROTOCOL_VERSION;
        bytes[1] = 0xFF;
        let result = decode_message(&bytes);
        assert!(matches!(result, Err(ProtocolError::UnknownMessageType(0xFF))));
    }

    #[test]
    fn test_decode_wrong_version_returns_error() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0] = 0x99;
        bytes[1] = MessageType::Ping as u8;
        let result = decode_message(&bytes);
        assert!(matches!(result, Err(ProtocolError::UnsupportedVersion(0x99))));
    }

    #[test]
    fn test_decode_payload_length_exceeds_available_returns_error() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0] = PROTOCOL_VERSION;
        bytes[1] = MessageType::Ping as u8;
        bytes[4..8].copy_from_slice(&100u32.to_be_bytes());
        let result = decode_message(&bytes);
        assert!(matches!(result, Err(ProtocolError::PayloadLengthMismatch { .. })));
    }

    #[test]
    fn test_header_layout() {
        // Arrange
        let seq = 0x1234_5678_9ABC_DEF0u64;

        // Act
        let bytes = encode_message(&ConsoleMessage::Ping(0), seq).unwrap();

        // Assert
        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(bytes[1], MessageType::Ping as u8);
        assert_eq!(&bytes[2..4], &[0, 0]);
        assert_eq!(u32::from_be_bytes(bytes[4..8].try_into().unwrap()), 8);
        assert_eq!(u64::from_be_bytes(bytes[8..16].try_into().unwrap()), seq);
        assert_eq!(bytes.len(), HEADER_SIZE + 8);
    }
}
