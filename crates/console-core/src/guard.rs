//! Fault isolation for user-supplied code.
//!
//! Timer callbacks and command handlers run inside the host's frame loop.  A
//! panic in one of them must not unwind into the host, so both the Timer
//! Engine and the Shell invoke user code through [`run_guarded`], which turns a
//! panic into an ordinary error value carrying the panic message and a
//! captured backtrace.

use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

/// A panic caught at a guard boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtPanic {
    /// The panic payload rendered as text.
    pub message: String,
    /// Backtrace captured at the guard boundary (empty when capture is disabled).
    pub backtrace: String,
}

/// Runs `f`, converting a panic into [`CaughtPanic`].
pub fn run_guarded<R>(f: impl FnOnce() -> R) -> Result<R, CaughtPanic> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| CaughtPanic {
        message: panic_message(payload.as_ref()),
        backtrace: capture_backtrace(),
    })
}

/// Captures the current backtrace as text, honouring `RUST_BACKTRACE`.
pub fn capture_backtrace() -> String {
    let bt = Backtrace::capture();
    match bt.status() {
        std::backtrace::BacktraceStatus::Captured => bt.to_string(),
        _ => String::new(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
