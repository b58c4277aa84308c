use crate::domain::Severity;
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};

#[cfg(test)]
use mockall::automock;

/// A diagnostic routed to the local fallback sink when the primary path
/// cannot accept it: flush failures, close failures, use after close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Local destination of last resort for sender errors and diagnostics.
///
/// Implementations must be cheap and must not perform network I/O; the
/// sender calls `accept` while holding its state lock.
#[cfg_attr(test, automock)]
pub trait FallbackSink: Send + Sync {
    fn accept(&self, diagnostic: Diagnostic);
}

/// Default sink: one line per diagnostic on standard error.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_writer(io::stderr())
    }

    /// Directs output elsewhere, mainly so tests can capture it.
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}

impl FallbackSink for ConsoleSink {
    fn accept(&self, diagnostic: Diagnostic) {
        let mut out = self.out.lock();
        // A failing fallback has nowhere left to report; swallow the error.
        let _ = writeln!(out, "{diagnostic}");
    }
}
