//! Infrastructure layer for the console host.
//!
//! Contains OS-facing adapters: the UDP console server and file-system
//! storage for configuration and preferences.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `console_core`, but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
