//! Network infrastructure for the remote console tool.
//!
//! - [`client`]: [`RemoteClient`], the UDP socket and connection state machine.
//! - [`driver`]: async helpers that pump a client on a Tokio interval.

pub mod client;
pub mod driver;

pub use client::{RemoteClient, RemoteConfig, RemoteError};
pub use driver::{drive, TICK};
