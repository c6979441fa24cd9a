//! Application layer for the console host.
//!
//! [`console_app::ConsoleApp`] is the explicit application context: it owns
//! the timer engine, the shell and (optionally) a transport, and advances all
//! of them once per frame.  The transport is reached only through the
//! [`ConsoleTransport`] trait so this layer never touches a socket.

pub mod console_app;
pub mod host_commands;

use std::net::SocketAddr;
use std::time::Instant;

use console_core::output::OutputFrame;
use console_core::protocol::CommandMessage;

/// Something that happened on the transport since the last pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A remote tool opened a session.
    Connected { peer: SocketAddr, client_name: String },
    /// The session ended.  `reason` is `"goodbye"`, `"timeout"` or the
    /// remote's own reason.
    Disconnected { peer: SocketAddr, reason: String },
    /// A command line delivered in order by the reliable channel.
    Command { peer: SocketAddr, command: CommandMessage },
}

/// The host side of the remote console connection.
#[cfg_attr(test, mockall::automock)]
pub trait ConsoleTransport {
    /// Drains whatever arrived since the last call.  Never blocks.
    fn pump(&mut self, now: Instant) -> Vec<TransportEvent>;

    /// Queues `frame` for `peer`.  Sent by the next [`flush`](Self::flush).
    fn queue_output(&mut self, peer: SocketAddr, frame: OutputFrame);

    /// Sends everything queued by `queue_output`.
    fn flush(&mut self);

    /// Ends the session (if any) and stops the transport.
    fn shutdown(&mut self);
}
