//! Reliable-ordered delivery on top of unreliable datagrams.
//!
//! Only command submissions need it.  The two halves do no I/O: the caller
//! hands in the current time and gets back the bytes to put on the wire.
//!
//! # How it works (for beginners)
//!
//! The sender numbers each reliable message (0, 1, 2, ...) and keeps a copy
//! until the receiver acknowledges that number.  If no ack arrives within
//! `resend_interval`, the copy is sent again.  After `max_attempts`
//! transmissions the peer is presumed gone and the sender gives up.
//!
//! The receiver acks every copy it sees, because the ack for the first copy
//! may itself have been lost.  It releases messages to the application only
//! in sequence order:
//!
//! ```text
//! expected = 3
//! receive 5  -> buffered           (gap at 3, 4)
//! receive 3  -> deliver [3]        expected = 4
//! receive 4  -> deliver [4, 5]     expected = 6
//! receive 4  -> duplicate          (already delivered, ack again)
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use super::codec::{encode_message, ProtocolError};
use super::messages::ConsoleMessage;

/// How many sequence numbers past `expected` the receiver will buffer.
pub const RECEIVE_WINDOW: u64 = 64;

/// Retransmission settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReliabilityConfig {
    /// Time without an ack before a packet is sent again.
    pub resend_interval: Duration,
    /// Total transmissions (including the first) before giving up.
    pub max_attempts: u32,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            resend_interval: Duration::from_millis(250),
            max_attempts: 20,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReliabilityError {
    /// A packet went unacknowledged for every allowed attempt.
    #[error("reliable packet {sequence} unacknowledged after {attempts} attempts")]
    RetriesExhausted { sequence: u64, attempts: u32 },
}

// ── Sender ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct InFlight {
    sequence: u64,
    bytes: Vec<u8>,
    last_sent: Instant,
    attempts: u32,
}

/// Numbers outgoing reliable messages and retransmits them until acked.
#[derive(Debug)]
pub struct ReliableSender {
    config: ReliabilityConfig,
    next_sequence: u64,
    in_flight: VecDeque<InFlight>,
}

impl ReliableSender {
    pub fn new(config: ReliabilityConfig) -> Self {
        Self {
            config,
            next_sequence: 0,
            in_flight: VecDeque::new(),
        }
    }

    /// Encodes `msg` with the next reliable sequence number and keeps a copy
    /// for retransmission.  Returns the sequence number and the datagram to
    /// send now.
    pub fn send(&mut self, msg: &ConsoleMessage, now: Instant) -> Result<(u64, Vec<u8>), ProtocolError> {
        let sequence = self.next_sequence;
        let bytes = encode_message(msg, sequence)?;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.in_flight.push_back(InFlight {
            sequence,
            bytes: bytes.clone(),
            last_sent: now,
            attempts: 1,
        });
        Ok((sequence, bytes))
    }

    /// Forgets the packet with `sequence`.  Returns `false` for an unknown or
    /// already acknowledged number.
    pub fn acknowledge(&mut self, sequence: u64) -> bool {
        match self.in_flight.iter().position(|p| p.sequence == sequence) {
            Some(index) => {
                self.in_flight.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns every datagram that is due for retransmission at `now`.
    ///
    /// # Errors
    ///
    /// [`ReliabilityError::RetriesExhausted`] when a due packet has already
    /// been sent `max_attempts` times.  Everything in flight is discarded,
    /// since the stream can no longer be delivered in order.
    pub fn poll(&mut self, now: Instant) -> Result<Vec<Vec<u8>>, ReliabilityError> {
        let mut resend = Vec::new();
        let mut exhausted = None;
        for packet in &mut self.in_flight {
            if now.saturating_duration_since(packet.last_sent) < self.config.resend_interval {
                continue;
            }
            if packet.attempts >= self.config.max_attempts {
                exhausted = Some(ReliabilityError::RetriesExhausted {
                    sequence: packet.sequence,
                    attempts: packet.attempts,
                });
                break;
            }
            packet.attempts += 1;
            packet.last_sent = now;
            debug!(sequence = packet.sequence, attempt = packet.attempts, "retransmitting");
            resend.push(packet.bytes.clone());
        }

        if let Some(err) = exhausted {
            warn!("{err}; dropping {} in-flight packet(s)", self.in_flight.len());
            self.in_flight.clear();
            return Err(err);
        }
        Ok(resend)
    }

    /// Number of packets still waiting for an ack.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Starts a fresh stream at sequence 0 (used for every new session).
    pub fn reset(&mut self) {
        self.next_sequence = 0;
        self.in_flight.clear();
    }
}

// ── Receiver ──────────────────────────────────────────────────────────────────

/// What the receiver did with one incoming reliable message.
#[derive(Debug, PartialEq)]
pub enum Receipt<T> {
    /// The message filled the gap at `expected`; these items are now ready,
    /// in sequence order.
    Deliver(Vec<T>),
    /// Held until the gap before it is filled.
    Buffered,
    /// Already delivered or already buffered.
    Duplicate,
    /// Too far ahead of `expected` to buffer.  Not acknowledged, so the
    /// sender will try again later.
    TooNew,
}

impl<T> Receipt<T> {
    /// Whether the sender should be told this sequence arrived.
    pub fn should_ack(&self) -> bool {
        !matches!(self, Receipt::TooNew)
    }
}

/// Re-orders incoming reliable messages and drops duplicates.
#[derive(Debug)]
pub struct ReliableReceiver<T> {
    expected: u64,
    buffered: BTreeMap<u64, T>,
}

impl<T> Default for ReliableReceiver<T> {
    fn default() -> Self {
        Self {
            expected: 0,
            buffered: BTreeMap::new(),
        }
    }
}

impl<T> ReliableReceiver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequence number that will be delivered.
    pub fn expected(&self) -> u64 {
        self.expected
    }

    pub fn buffered(&self) -> usize {
        self.buffered.len()
    }

    pub fn accept(&mut self, sequence: u64, item: T) -> Receipt<T> {
        if sequence < self.expected || self.buffered.contains_key(&sequence) {
            return Receipt::Duplicate;
        }
        if sequence - self.expected >= RECEIVE_WINDOW {
            return Receipt::TooNew;
        }
        if sequence != self.expected {
            self.buffered.insert(sequence, item);
            return Receipt::Buffered;
        }

        let mut ready = vec![item];
        self.expected += 1;
        while let Some(next) = self.buffered.remove(&self.expected) {
            ready.push(next);
            self.expected += 1;
        }
        Receipt::Deliver(ready)
    }

    pub fn reset(&mut self) {
        self.expected = 0;
        self.buffered.clear();
    }
}
