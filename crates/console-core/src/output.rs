//! Structured console output.
//!
//! The shell never formats text for display.  It produces [`OutputFrame`]s and
//! hands them to an [`OutputSink`]; the sink decides where they go (a local
//! terminal widget, a remote session, a test buffer, the log).

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Wire discriminator for each frame kind (sent as a big-endian `i32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum FrameKind {
    Line = 0,
    Table = 1,
    Exception = 2,
}

impl TryFrom<i32> for FrameKind {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, ()> {
        match value {
            0 => Ok(FrameKind::Line),
            1 => Ok(FrameKind::Table),
            2 => Ok(FrameKind::Exception),
            _ => Err(()),
        }
    }
}

/// One unit of console output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFrame {
    /// A single line of text.
    Line(String),
    /// Tabular output: an ordered list of cells the view lays out in columns.
    Table(Vec<String>),
    /// A failure report.
    Exception {
        /// Context line, e.g. "Error while executing command".
        message: String,
        /// The underlying error text.
        exception_message: String,
        /// Captured stack/backtrace; may be empty.
        stack_trace: String,
    },
}

impl OutputFrame {
    pub fn line(text: impl Into<String>) -> Self {
        OutputFrame::Line(text.into())
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            OutputFrame::Line(_) => FrameKind::Line,
            OutputFrame::Table(_) => FrameKind::Table,
            OutputFrame::Exception { .. } => FrameKind::Exception,
        }
    }
}

/// Destination for output frames.
#[cfg_attr(test, mockall::automock)]
pub trait OutputSink {
    fn emit(&mut self, frame: OutputFrame);
}

/// Sink that keeps every frame in memory.
#[derive(Debug, Default, Clone)]
pub struct CapturedOutput {
    pub frames: Vec<OutputFrame>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of every `Line` frame, in order.
    pub fn lines(&self) -> Vec<&str> {
        self.frames
            .iter()
            .filter_map(|f| match f {
                OutputFrame::Line(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl OutputSink for CapturedOutput {
    fn emit(&mut self, frame: OutputFrame) {
        self.frames.push(frame);
    }
}

/// Sink that writes frames to the `tracing` log under the `console` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl OutputSink for LogSink {
    fn emit(&mut self, frame: OutputFrame) {
        match frame {
            OutputFrame::Line(line) => info!(target: "console", "{line}"),
            OutputFrame::Table(cells) => info!(target: "console", "{}", cells.join("  ")),
            OutputFrame::Exception {
                message,
                exception_message,
                stack_trace,
            } => {
                warn!(target: "console", "{message}: {exception_message}");
                if !stack_trace.is_empty() {
                    warn!(target: "console", "{stack_trace}");
                }
            }
        }
    }
}
