//! Command registry, argument parsing, tokenizer and key bindings.
//!
//! # Module layout
//!
//! - [`registry`]: [`CommandDescriptor`]s keyed by name, plus the binding table.
//! - [`args`]: turns argument tokens into typed [`ParsedArgs`].
//! - [`tokenizer`]: splits a raw line into `&&` segments and quoted tokens.
//! - [`keys`]: key codes, modifier sets and trigger parsing.
//! - [`bindings`]: the trigger → command-line table.
//! - [`cvar`]: console variables, registered as commands of the same name.
//!
//! Command names are case-sensitive everywhere: registration, lookup,
//! listing and completion.

pub mod args;
pub mod bindings;
pub mod cvar;
pub mod keys;
pub mod registry;
pub mod tokenizer;

use thiserror::Error;

use crate::shell::ShellError;
use crate::timer::TimerError;

pub use args::{parse_args, parse_positional, ArgKind, ArgParseError, ArgSpec, ArgValue, OptionSpec, ParsedArgs};
pub use bindings::{Binding, BindingTable};
pub use cvar::{CVar, CVarError, CVarListener};
pub use keys::{KeyCode, Modifiers, Trigger, TriggerParseError};
pub use registry::{CommandCompleter, CommandDescriptor, CommandHandler, CommandKind, CommandRegistry};
pub use tokenizer::{split_commands, tokenize, TokenizeError};

/// Errors raised synchronously by registry and binding calls.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A command with this name is already registered.
    #[error("command '{0}' is already registered")]
    DuplicateName(String),

    /// The trigger is already bound; unbind it first.
    #[error("'{0}' is already bound")]
    DuplicateBinding(String),

    /// The named command is not registered.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A command line given to `bind` is blank or does not tokenize.
    #[error("invalid command line '{line}': {reason}")]
    InvalidLine { line: String, reason: String },

    /// The trigger string could not be parsed.
    #[error("invalid shortcut: {0}")]
    InvalidTrigger(#[from] TriggerParseError),
}

/// Error a command handler returns.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The handler failed; the shell reports the message as an exception frame.
    #[error("{0}")]
    Failed(String),

    /// A nested execution failed and has already been reported to the sink.
    #[error(transparent)]
    Nested(#[from] ShellError),
}

impl From<&str> for CommandError {
    fn from(s: &str) -> Self {
        CommandError::Failed(s.to_string())
    }
}

impl From<String> for CommandError {
    fn from(s: String) -> Self {
        CommandError::Failed(s)
    }
}

impl From<RegistryError> for CommandError {
    fn from(e: RegistryError) -> Self {
        CommandError::Failed(e.to_string())
    }
}

impl From<CVarError> for CommandError {
    fn from(e: CVarError) -> Self {
        CommandError::Failed(e.to_string())
    }
}

impl From<TimerError> for CommandError {
    fn from(e: TimerError) -> Self {
        CommandError::Failed(e.to_string())
    }
}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError::Failed(e.to_string())
    }
}
