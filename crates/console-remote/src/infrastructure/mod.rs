//! Infrastructure layer for the remote console tool.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `console_core`, but MUST NOT be imported by the `application` layer.

pub mod network;
