//! # console-core
//!
//! Runtime engine of the embedded developer console: the frame-driven timer
//! engine, the command registry and shell, and the datagram protocol spoken
//! between a running application and the remote console tool.
//!
//! This crate is used by both the host (the application being inspected) and
//! the remote tool.  It opens no sockets and spawns no threads.
//!
//! # Architecture overview (for beginners)
//!
//! The console lives inside a real-time program.  Everything it does must fit
//! into the program's frame loop without blocking it:
//!
//! - **`timer`** – Delayed and repeating callbacks against a clock the host
//!   advances once per frame.  Callbacks may schedule or cancel timers while
//!   the engine is firing them.
//!
//! - **`command`** – The registry of named commands, their typed argument
//!   specifications, the quoting-aware tokenizer and the key-binding table.
//!
//! - **`shell`** – Turns a command line into handler calls, reports every
//!   failure as structured output, completes partial input and provides the
//!   built-in commands.
//!
//! - **`protocol`** – How the console travels over UDP: a 16-byte header plus
//!   payload, and a small reliability layer so command lines arrive exactly
//!   once and in order.
//!
//! `output`, `guard` and `assert` are the shared plumbing: structured output
//! frames and sinks, panic isolation for user code, and the configurable
//! assertion handler.

pub mod assert;
pub mod command;
pub mod guard;
pub mod output;
pub mod protocol;
pub mod shell;
pub mod timer;

pub use command::{CommandDescriptor, CommandError, CommandRegistry, RegistryError, Trigger};
pub use output::{CapturedOutput, LogSink, OutputFrame, OutputSink};
pub use protocol::{decode_message, encode_message, ConsoleMessage, ProtocolError};
pub use shell::history::History;
pub use shell::{CommandContext, ExecutionResult, Shell, ShellError};
pub use timer::{TimerCallback, TimerEngine, TimerError, TimerHandle};
