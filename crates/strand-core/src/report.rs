//! Diagnostic report sink.
//!
//! The allocation layer emits human-readable lines (statistics
//! snapshots, probe status) through a [`ReportSink`]. The format of
//! the lines is not part of any contract; sinks are free to drop,
//! buffer, or forward them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Severity of a report line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReportLevel {
    /// Statistics snapshots and other high-volume tracing.
    Debug,
    /// Status lines meant for the user.
    Info,
    /// Suspicious but non-fatal conditions.
    Warn,
    /// Conditions that will escalate to a fault.
    Error,
}

impl fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Receives formatted diagnostic lines.
pub trait ReportSink {
    /// Accept one line at the given severity.
    fn emit(&mut self, level: ReportLevel, message: fmt::Arguments<'_>);
}

/// Production sink: one `level: message` line per report, to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrSink;

impl ReportSink for StderrSink {
    fn emit(&mut self, level: ReportLevel, message: fmt::Arguments<'_>) {
        eprintln!("{level}: {message}");
    }
}

/// Buffering sink for tests: retains every line with its level.
///
/// Clones share the same buffer, so a test can keep one handle and
/// hand the other to the code under test.
#[derive(Clone, Debug, Default)]
pub struct BufferSink {
    lines: Rc<RefCell<Vec<(ReportLevel, String)>>>,
}

impl BufferSink {
    /// Create an empty shared buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines emitted so far, in order.
    pub fn lines(&self) -> Vec<(ReportLevel, String)> {
        self.lines.borrow().clone()
    }

    /// Whether any line at `level` contains `needle`.
    pub fn contains(&self, level: ReportLevel, needle: &str) -> bool {
        self.lines
            .borrow()
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }

    /// Number of lines emitted so far.
    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }
}

impl ReportSink for BufferSink {
    fn emit(&mut self, level: ReportLevel, message: fmt::Arguments<'_>) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }
}
