//! Assertion capability.
//!
//! Configuration errors raised through the application context (an invalid
//! timer delay, a duplicate command or binding) are programming mistakes.
//! How loudly they are surfaced depends on where the program runs, so the
//! behaviour sits behind one small trait with three implementations:
//!
//! - [`LogAssert`]: log at `error` level and carry on (release builds).
//! - [`PanicAssert`]: panic at the offending call (debug builds).
//! - [`CapturingAssert`]: record the message for a test to inspect.
//!
//! [`select_assert_handler`] picks one at startup from the
//! `DEVCONSOLE_ASSERT` environment variable.

use std::cell::RefCell;
use std::str::FromStr;

use tracing::{error, warn};

/// Environment variable consulted by [`select_assert_handler`].
pub const ASSERT_ENV_VAR: &str = "DEVCONSOLE_ASSERT";

/// Receives assertion failures.
pub trait AssertHandler {
    fn fail(&self, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogAssert;

impl AssertHandler for LogAssert {
    fn fail(&self, message: &str) {
        error!("assertion failed: {message}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PanicAssert;

impl AssertHandler for PanicAssert {
    fn fail(&self, message: &str) {
        panic!("assertion failed: {message}");
    }
}

/// Keeps every failure message in memory.
#[derive(Debug, Default)]
pub struct CapturingAssert {
    failures: RefCell<Vec<String>>,
}

impl CapturingAssert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.borrow().clone()
    }

    pub fn clear(&self) {
        self.failures.borrow_mut().clear();
    }
}

impl AssertHandler for CapturingAssert {
    fn fail(&self, message: &str) {
        self.failures.borrow_mut().push(message.to_string());
    }
}

/// Which handler to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertMode {
    Log,
    Panic,
    Capture,
}

impl AssertMode {
    /// Panic in debug builds, log in release builds.
    pub fn build_default() -> Self {
        if cfg!(debug_assertions) {
            AssertMode::Panic
        } else {
            AssertMode::Log
        }
    }

    pub fn handler(self) -> Box<dyn AssertHandler> {
        match self {
            AssertMode::Log => Box::new(LogAssert),
            AssertMode::Panic => Box::new(PanicAssert),
            AssertMode::Capture => Box::new(CapturingAssert::new()),
        }
    }
}

impl FromStr for AssertMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(AssertMode::Log),
            "panic" => Ok(AssertMode::Panic),
            "capture" => Ok(AssertMode::Capture),
            other => Err(format!("unknown assert mode '{other}'")),
        }
    }
}

/// Resolves the mode from an optional setting, falling back to the build default.
pub fn resolve_assert_mode(setting: Option<&str>) -> AssertMode {
    match setting.map(str::parse::<AssertMode>) {
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            warn!("{ASSERT_ENV_VAR}: {e}; using the build default");
            AssertMode::build_default()
        }
        None => AssertMode::build_default(),
    }
}

/// Chooses the assertion handler from `DEVCONSOLE_ASSERT`.
pub fn select_assert_handler() -> Box<dyn AssertHandler> {
    let setting = std::env::var(ASSERT_ENV_VAR).ok();
    resolve_assert_mode(setting.as_deref()).handler()
}
