//! The console's application context.
//!
//! # One tick (for beginners)
//!
//! The host calls [`ConsoleApp::update`] once per frame.  Each call does the
//! same four steps in the same order:
//!
//! ```text
//! 1. transport.pump()      drain datagrams queued by the network thread;
//!                          run remote commands, output routed to the sender
//! 2. timers.update(delta)  fire due timers
//! 3. deferred lines        run lines queued by `delay` and startup
//! 4. transport.flush()     send every output frame produced above
//! ```
//!
//! Nothing in a tick blocks.  A command handler cannot re-enter the pump: the
//! pump has already returned by the time any handler runs, and output is only
//! queued until step 4.
//!
//! Lines typed at the local terminal (`manual` executions) are recorded in a
//! bounded [`History`]; deferred, bound and remote lines are not.
//!
//! Configuration mistakes made through the context (a duplicate command, an
//! invalid delay, a binding to an unknown command) go to the
//! [`AssertHandler`] chosen at startup instead of being returned.

use std::net::SocketAddr;
use std::time::Instant;

use console_core::assert::AssertHandler;
use console_core::command::{CVar, CommandDescriptor, KeyCode, Modifiers, Trigger};
use console_core::output::{OutputFrame, OutputSink};
use console_core::shell::history::History;
use console_core::shell::{ExecutionResult, Shell};
use console_core::timer::{TimerCallback, TimerEngine, TimerHandle};
use tracing::{debug, info};

use super::{ConsoleTransport, TransportEvent};

/// Sends frames to the remote peer that issued the running command and
/// mirrors them to the local sink.
struct RoutedSink<'a> {
    local: &'a mut dyn OutputSink,
    transport: &'a mut dyn ConsoleTransport,
    peer: SocketAddr,
}

impl OutputSink for RoutedSink<'_> {
    fn emit(&mut self, frame: OutputFrame) {
        self.transport.queue_output(self.peer, frame.clone());
        self.local.emit(frame);
    }
}

/// Owns the timer engine, the shell and the transport.
pub struct ConsoleApp {
    timers: TimerEngine,
    shell: Shell,
    history: History,
    transport: Option<Box<dyn ConsoleTransport>>,
    local: Box<dyn OutputSink>,
    asserts: Box<dyn AssertHandler>,
}

impl ConsoleApp {
    /// A context with the built-in commands and no transport.
    pub fn new(local: Box<dyn OutputSink>, asserts: Box<dyn AssertHandler>) -> Self {
        Self {
            timers: TimerEngine::new(),
            shell: Shell::with_builtins(),
            history: History::default(),
            transport: None,
            local,
            asserts,
        }
    }

    pub fn with_transport(mut self, transport: Box<dyn ConsoleTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the terminal history with an empty one of `capacity` lines.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = History::new(capacity);
        self
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    pub fn timers(&self) -> &TimerEngine {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimerEngine {
        &mut self.timers
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut Shell {
        &mut self.shell
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// For up/down navigation in the local terminal.
    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    // ── Frame loop ────────────────────────────────────────────────────────────

    /// Advances the console by one frame of `delta` seconds.
    pub fn update(&mut self, delta: f64) {
        self.update_at(delta, Instant::now());
    }

    /// [`update`](Self::update) with an explicit wall-clock time for the
    /// transport's session bookkeeping.
    pub fn update_at(&mut self, delta: f64, now: Instant) {
        let events = match self.transport.as_mut() {
            Some(transport) => transport.pump(now),
            None => Vec::new(),
        };
        for event in events {
            self.dispatch(event);
        }

        self.timers.update(delta);

        for line in self.shell.take_deferred() {
            let _ = self
                .shell
                .execute(&line, false, &mut self.timers, self.local.as_mut());
        }

        if let Some(transport) = self.transport.as_mut() {
            transport.flush();
        }
    }

    fn dispatch(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { peer, client_name } => {
                info!(%peer, "remote console '{client_name}' connected");
            }
            TransportEvent::Disconnected { peer, reason } => {
                info!(%peer, "remote console disconnected ({reason})");
            }
            TransportEvent::Command { peer, command } => {
                let Some(transport) = self.transport.as_mut() else {
                    return;
                };
                debug!(%peer, manual = command.manual, "remote command: {}", command.line);
                let mut sink = RoutedSink {
                    local: self.local.as_mut(),
                    transport: transport.as_mut(),
                    peer,
                };
                let _ = self
                    .shell
                    .execute(&command.line, command.manual, &mut self.timers, &mut sink);
            }
        }
    }

    /// Stops the transport.  The context keeps working locally afterwards.
    pub fn shutdown(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown();
        }
    }

    // ── Local input ───────────────────────────────────────────────────────────

    /// Executes `line` with output to the local sink.  Manual lines are added
    /// to the terminal history whether or not they succeed.
    pub fn execute(&mut self, line: &str, manual: bool) -> ExecutionResult {
        if manual {
            self.history.push(line);
        }
        self.shell
            .execute(line, manual, &mut self.timers, self.local.as_mut())
    }

    /// Runs `lines` at the end of the first tick, once the host loop is up.
    pub fn execute_after_first_tick(&mut self, lines: Vec<String>) {
        if lines.is_empty() {
            return;
        }
        let queue = self.shell.deferred_queue();
        let callback = TimerCallback::action(move || {
            queue.borrow_mut().extend(lines.iter().cloned());
        });
        self.schedule(callback, 0.0);
    }

    /// Tab completion for the local terminal.
    pub fn complete(&mut self, line: &str, cursor: usize, double_tab: bool) -> Option<String> {
        self.shell
            .complete(line, cursor, double_tab, self.local.as_mut())
    }

    pub fn key_down(&mut self, key: KeyCode, modifiers: Modifiers) -> Option<ExecutionResult> {
        self.shell.handle_key(
            Trigger::new(key, modifiers),
            true,
            &mut self.timers,
            self.local.as_mut(),
        )
    }

    pub fn key_up(&mut self, key: KeyCode, modifiers: Modifiers) -> Option<ExecutionResult> {
        self.shell.handle_key(
            Trigger::new(key, modifiers),
            false,
            &mut self.timers,
            self.local.as_mut(),
        )
    }

    // ── Configuration (reported to the assert handler) ────────────────────────

    pub fn register_command(&mut self, descriptor: CommandDescriptor) -> bool {
        match self.shell.registry_mut().register(descriptor) {
            Ok(()) => true,
            Err(e) => {
                self.asserts.fail(&e.to_string());
                false
            }
        }
    }

    /// Registers `cvar` as a console variable.  The caller keeps its clone to
    /// read the value.
    pub fn register_cvar(&mut self, cvar: CVar) -> bool {
        match self.shell.registry_mut().register_cvar(cvar) {
            Ok(()) => true,
            Err(e) => {
                self.asserts.fail(&e.to_string());
                false
            }
        }
    }

    pub fn bind(&mut self, shortcut: &str, line: &str) -> bool {
        match self.shell.registry_mut().bind_shortcut(shortcut, line, None) {
            Ok(_) => true,
            Err(e) => {
                self.asserts.fail(&format!("bind {shortcut}: {e}"));
                false
            }
        }
    }

    pub fn schedule(&mut self, callback: TimerCallback, delay: f64) -> Option<TimerHandle> {
        let result = self.timers.schedule(callback, delay);
        self.checked(result)
    }

    pub fn schedule_repeating(&mut self, callback: TimerCallback, period: f64) -> Option<TimerHandle> {
        let result = self.timers.schedule_repeating(callback, period);
        self.checked(result)
    }

    pub fn schedule_once(&mut self, callback: TimerCallback, delay: f64) -> Option<TimerHandle> {
        let result = self.timers.schedule_once(callback, delay);
        self.checked(result)
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.cancel(handle)
    }

    fn checked<T, E: std::fmt::Display>(&self, result: Result<T, E>) -> Option<T> {
        result.map_err(|e| self.asserts.fail(&e.to_string())).ok()
    }
}

impl Drop for ConsoleApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
