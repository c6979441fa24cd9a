//! Shell: parses command lines, resolves them against the registry and runs
//! the handlers.
//!
//! # Execution pipeline (for beginners)
//!
//! ```text
//!   "bind f1 'echo hi' && cmdlist"
//!        │ split_commands
//!        ▼
//!   ["bind f1 'echo hi'", "cmdlist"]      ← run in order, stop at first failure
//!        │ tokenize
//!        ▼
//!   name="bind", tokens=["f1", "echo hi"]
//!        │ registry lookup + parse_args
//!        ▼
//!   handler(&mut CommandContext, &ParsedArgs)   ← guarded against panics
//! ```
//!
//! Every failure is turned into an [`OutputFrame`] on the caller's sink and
//! also returned as a [`ShellError`], so callers can branch on the outcome
//! without having to render anything themselves.  Nothing here unwinds into
//! the caller.
//!
//! The shell keeps no per-call state between executions.  The only state it
//! carries is the registry, the nesting depth of the call currently running
//! (aliases and `exec` re-enter the shell) and the queue of lines deferred by
//! the `delay` builtin.  Terminal history is kept by the front end in a
//! [`history::History`].

pub mod builtins;
pub mod completion;
pub mod history;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::command::keys::Trigger;
use crate::command::tokenizer::{parse_command, split_commands, TokenizeError};
use crate::command::{CommandError, CommandRegistry};
use crate::guard::run_guarded;
use crate::output::{OutputFrame, OutputSink};
use crate::timer::{TimerCallback, TimerEngine, TimerError, TimerHandle};

/// Maximum alias/`exec` nesting depth.
pub const MAX_NESTING_DEPTH: usize = 16;

/// Why an execution failed.  Already reported to the sink when returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShellError {
    #[error("{0}: command not found")]
    UnknownCommand(String),

    #[error("{command}: argument {position}: {detail}")]
    ArgumentError {
        command: String,
        position: usize,
        detail: String,
    },

    #[error("{command}: {message}")]
    Execution {
        command: String,
        message: String,
        backtrace: String,
    },

    #[error("syntax error: {0}")]
    Syntax(#[from] TokenizeError),

    #[error("command nesting deeper than {0} levels")]
    RecursionLimit(usize),
}

/// Outcome of [`Shell::execute`].
pub type ExecutionResult = Result<(), ShellError>;

/// Lines waiting to be run on a later tick.
pub type DeferredQueue = Rc<RefCell<VecDeque<String>>>;

/// Everything a command handler can reach while it runs.
pub struct CommandContext<'a> {
    pub shell: &'a mut Shell,
    pub timers: &'a mut TimerEngine,
    pub out: &'a mut dyn OutputSink,
    /// `true` when a person typed the line, `false` for bindings, timers and
    /// scripts.
    pub manual: bool,
}

impl CommandContext<'_> {
    pub fn print(&mut self, text: impl Into<String>) {
        self.out.emit(OutputFrame::Line(text.into()));
    }

    pub fn print_table(&mut self, cells: Vec<String>) {
        self.out.emit(OutputFrame::Table(cells));
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.shell.registry
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.shell.registry
    }

    /// Runs `line` from inside a handler, sharing this call's sink and
    /// nesting depth.
    pub fn execute_nested(&mut self, line: &str) -> ExecutionResult {
        self.shell
            .run_line(line, self.manual, &mut *self.timers, &mut *self.out)
    }

    /// Queues `line` to run `delay` seconds from now.
    pub fn defer(&mut self, line: impl Into<String>, delay: f64) -> Result<TimerHandle, TimerError> {
        let queue = Rc::clone(&self.shell.deferred);
        let line = line.into();
        let name = format!("deferred: {line}");
        let callback = TimerCallback::action(move || queue.borrow_mut().push_back(line.clone()));
        self.timers.schedule_named(callback, delay, false, name)
    }
}

/// Command-line executor.
#[derive(Default)]
pub struct Shell {
    registry: CommandRegistry,
    deferred: DeferredQueue,
    depth: usize,
}

impl Shell {
    /// An empty shell with no commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// A shell with the built-in commands registered.
    pub fn with_builtins() -> Self {
        let mut shell = Self::new();
        builtins::register_builtins(&mut shell.registry);
        shell
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    /// Executes `line`, sending every frame it produces to `out`.
    ///
    /// A manual line is echoed as `> line` first.  Chained commands run in
    /// order and the chain stops at the first failure.
    pub fn execute(
        &mut self,
        line: &str,
        manual: bool,
        timers: &mut TimerEngine,
        out: &mut dyn OutputSink,
    ) -> ExecutionResult {
        if manual {
            out.emit(OutputFrame::Line(format!("> {line}")));
        }
        self.run_line(line, manual, timers, out)
    }

    /// Runs the key-down (or key-up) line bound to `trigger`, if any.
    ///
    /// Returns `None` when the trigger has no binding for that edge.
    pub fn handle_key(
        &mut self,
        trigger: Trigger,
        pressed: bool,
        timers: &mut TimerEngine,
        out: &mut dyn OutputSink,
    ) -> Option<ExecutionResult> {
        let binding = self.registry.find_binding(&trigger)?;
        let line = if pressed {
            binding.key_down.clone()
        } else {
            binding.key_up.clone()?
        };
        debug!("{trigger} {} -> {line}", if pressed { "down" } else { "up" });
        Some(self.execute(&line, false, timers, out))
    }

    /// Removes and returns every line queued by `delay` whose timer fired.
    pub fn take_deferred(&mut self) -> Vec<String> {
        self.deferred.borrow_mut().drain(..).collect()
    }

    /// Shared handle to the deferred queue.
    pub fn deferred_queue(&self) -> DeferredQueue {
        Rc::clone(&self.deferred)
    }

    fn run_line(
        &mut self,
        line: &str,
        manual: bool,
        timers: &mut TimerEngine,
        out: &mut dyn OutputSink,
    ) -> ExecutionResult {
        if self.depth >= MAX_NESTING_DEPTH {
            let err = ShellError::RecursionLimit(MAX_NESTING_DEPTH);
            report(&err, out);
            return Err(err);
        }

        self.depth += 1;
        let mut result = Ok(());
        for command in split_commands(line) {
            result = self.run_single(&command, manual, timers, out);
            if result.is_err() {
                break;
            }
        }
        self.depth -= 1;
        result
    }

    fn run_single(
        &mut self,
        command_line: &str,
        manual: bool,
        timers: &mut TimerEngine,
        out: &mut dyn OutputSink,
    ) -> ExecutionResult {
        let (name, tokens) = match parse_command(command_line) {
            Ok(parsed) => parsed,
            Err(TokenizeError::EmptyCommand) => return Ok(()),
            Err(e) => return fail(e.into(), out),
        };

        let Some(descriptor) = self.registry.find(&name) else {
            return fail(ShellError::UnknownCommand(name), out);
        };
        let handler = descriptor.handler();
        let args = match descriptor.parse(&tokens) {
            Ok(args) => args,
            Err(e) => {
                let usage = descriptor.usage();
                let err = ShellError::ArgumentError {
                    command: name,
                    position: e.position,
                    detail: e.detail,
                };
                report(&err, out);
                out.emit(OutputFrame::Line(usage));
                return Err(err);
            }
        };

        let mut ctx = CommandContext {
            shell: self,
            timers,
            out,
            manual,
        };
        let outcome = run_guarded(|| handler(&mut ctx, &args));
        let out = ctx.out;

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(CommandError::Nested(e))) => Err(e),
            Ok(Err(CommandError::Failed(message))) => fail(
                ShellError::Execution {
                    command: name,
                    message,
                    backtrace: String::new(),
                },
                out,
            ),
            Err(panic) => fail(
                ShellError::Execution {
                    command: name,
                    message: panic.message,
                    backtrace: panic.backtrace,
                },
                out,
            ),
        }
    }
}

fn fail(err: ShellError, out: &mut dyn OutputSink) -> ExecutionResult {
    report(&err, out);
    Err(err)
}

/// Renders `err` as the frame the user sees.
fn report(err: &ShellError, out: &mut dyn OutputSink) {
    match err {
        ShellError::Execution {
            command,
            message,
            backtrace,
        } => {
            warn!("command '{command}' failed: {message}");
            out.emit(OutputFrame::Exception {
                message: format!("Error while executing command '{command}'"),
                exception_message: message.clone(),
                stack_trace: backtrace.clone(),
            });
        }
        other => out.emit(OutputFrame::Line(other.to_string())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
