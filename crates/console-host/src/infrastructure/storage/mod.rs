//! Storage infrastructure: configuration file and preferences persistence.
//!
//! - `config` reads and writes the host's `config.toml`, falling back to
//!   defaults on first run.
//! - `preferences` is the typed key-value store the running application
//!   writes to, saved to its own TOML file after a short debounce.

pub mod config;
pub mod preferences;
