//! Shared counter for the informational sequence numbers stamped on
//! unreliable datagrams.
//!
//! # Two kinds of sequence numbers (for beginners)
//!
//! Every header carries a `u64` sequence number, but it means different
//! things depending on the message type:
//!
//! - **Reliable messages** (`Command`) use the number as their identity.  The
//!   receiver acknowledges it and uses it to put messages back in order, so
//!   it is owned by the [`ReliableSender`](super::ReliableSender).
//! - **Everything else** (output, acks, pings, discovery) is fire-and-forget.
//!   The number only helps a person reading a packet capture or a log spot
//!   drops and reordering.  That counter lives here.
//!
//! On the host, output is written from the main thread while the network
//! thread answers discovery and sends acks.  Both stamp datagrams from the
//! same counter, so it must be shareable: it wraps an `AtomicU64` and is
//! passed around in an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free, monotonically increasing counter.  Wraps from `u64::MAX` to 0.
///
/// # Examples
///
/// ```rust
/// use console_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// assert_eq!(counter.current(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter whose first [`next`](Self::next) returns `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            inner: AtomicU64::new(first),
        }
    }

    /// Returns the next number and advances the counter.
    ///
    /// `Relaxed` is enough: the value orders datagrams, it does not publish
    /// memory to other threads.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// The value the next call to [`next`](Self::next) will return.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}
