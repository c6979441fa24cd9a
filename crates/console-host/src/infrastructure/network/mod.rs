//! Network adapters for the console host.
//!
//! - [`server`]: the UDP socket, the network thread and the
//!   [`ConsoleTransport`](crate::application::ConsoleTransport) implementation.
//! - [`session`]: the socket-free single-session rules the server applies.

pub mod server;
pub mod session;

pub use server::{ConsoleServer, ServerError};
pub use session::{SessionManager, SessionOutcome};
