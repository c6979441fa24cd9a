//! Application layer for the remote console tool.
//!
//! Holds the socket-free pieces: the connection state machine's vocabulary,
//! the deduplicated server list and the terminal renderer for output frames.
//!
//! **Dependency rule**: nothing here may import `infrastructure`.

pub mod render;
pub mod server_list;

use std::fmt;

use console_core::output::OutputFrame;

pub use server_list::{ServerInfo, ServerList};

/// Where the remote tool is in its connection lifecycle.
///
/// ```text
///  Disconnected ──discover()──► Discovering ──timeout──► Disconnected
///       │                            │
///       └───────connect()────────────┴──► Connecting ──ConnectAck(ok)──► Connected
///                                              │                           │
///                                   refused / no answer            Disconnect / retries
///                                              ▼                           ▼
///                                         Disconnected                Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Discovering,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Discovering => "discovering",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        };
        f.write_str(text)
    }
}

/// Something the remote client observed during `update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    StatusChanged(ConnectionStatus),
    /// A host answered discovery for the first time since `discover()`.
    ServerDiscovered(ServerInfo),
    /// Console output from the connected host.
    Output(OutputFrame),
}
