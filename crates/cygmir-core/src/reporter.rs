//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without being
//! coupled to a specific console or GUI implementation. Messages carry an
//! explicit severity and verbosity instead of ad-hoc bitmasks, and
//! long-running steps are bracketed with `start_operation`/`end_operation`
//! so a sink can render them as a single updating line.

use std::sync::Mutex;

/// How good or bad a piece of news is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Particularly good news.
    Good,
    /// Ordinary news.
    Normal,
    /// Significant news.
    Warning,
    /// Disastrous news.
    Error,
}

/// How chatty a message is; sinks filter on a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Essential messages.
    Low,
    /// Informative messages.
    Medium,
    /// Debugging messages.
    High,
}

/// Conduit for status messages from the mirror engine.
pub trait Reporter: Send + Sync {
    /// Emit a standalone message.
    fn message(&self, text: &str, severity: Severity, verbosity: Verbosity);

    /// Begin a bracketed operation (e.g. "Scanning mirror index...").
    fn start_operation(&self, text: &str, verbosity: Verbosity);

    /// Finish the current operation with a short outcome (e.g. "done").
    fn end_operation(&self, text: &str, severity: Severity);

    /// Abandon the current operation without an outcome, if one is open.
    /// Used on error paths so a later message starts on a fresh line.
    fn flush_operation(&self);

    /// Ordinary informational message.
    fn info(&self, text: &str) {
        self.message(text, Severity::Normal, Verbosity::Medium);
    }

    /// Significant but non-fatal message.
    fn warning(&self, text: &str) {
        self.message(text, Severity::Warning, Verbosity::Medium);
    }

    /// Message about a failure.
    fn error(&self, text: &str) {
        self.message(text, Severity::Error, Verbosity::Low);
    }
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn message(&self, text: &str, severity: Severity, verbosity: Verbosity) {
        (**self).message(text, severity, verbosity);
    }
    fn start_operation(&self, text: &str, verbosity: Verbosity) {
        (**self).start_operation(text, verbosity);
    }
    fn end_operation(&self, text: &str, severity: Severity) {
        (**self).end_operation(text, severity);
    }
    fn flush_operation(&self) {
        (**self).flush_operation();
    }
}

/// A no-op reporter for silent operations (e.g. verification, testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn message(&self, _: &str, _: Severity, _: Verbosity) {}
    fn start_operation(&self, _: &str, _: Verbosity) {}
    fn end_operation(&self, _: &str, _: Severity) {}
    fn flush_operation(&self) {}
}

/// Status-message sink using stdout/stderr.
///
/// Messages above [`Severity::Normal`] go to stderr. Messages chattier than
/// the configured verbosity threshold are dropped. A message emitted while
/// an operation is open interrupts it with a `>>>` continuation marker and
/// re-prints the operation banner afterwards, keeping the console coherent
/// when downloads interleave with warnings.
#[derive(Debug)]
pub struct ConsoleReporter {
    threshold: Verbosity,
    operation: Mutex<Option<(String, Verbosity)>>,
}

impl ConsoleReporter {
    /// Create a console reporter filtering out messages above `threshold`.
    pub fn new(threshold: Verbosity) -> Self {
        Self {
            threshold,
            operation: Mutex::new(None),
        }
    }

    fn emit(&self, text: &str, severity: Severity, verbosity: Verbosity) {
        use std::io::Write;

        if verbosity > self.threshold {
            return;
        }
        if severity > Severity::Normal {
            let mut err = std::io::stderr();
            let _ = err.write_all(text.as_bytes());
            let _ = err.flush();
        } else {
            let mut out = std::io::stdout();
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(Verbosity::Medium)
    }
}

impl Reporter for ConsoleReporter {
    fn message(&self, text: &str, severity: Severity, verbosity: Verbosity) {
        let guard = match self.operation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((banner, op_verbosity)) = guard.as_ref() {
            self.emit("  >>>\n", Severity::Normal, *op_verbosity);
            self.emit(&format!("{text}\n"), severity, verbosity);
            self.emit(
                &format!("  >>> {banner}..."),
                Severity::Normal,
                *op_verbosity,
            );
        } else {
            self.emit(&format!("{text}\n"), severity, verbosity);
        }
    }

    fn start_operation(&self, text: &str, verbosity: Verbosity) {
        let mut guard = match self.operation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some((text.to_string(), verbosity));
        self.emit(&format!("{text}..."), Severity::Normal, verbosity);
    }

    fn end_operation(&self, text: &str, severity: Severity) {
        let mut guard = match self.operation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((_, op_verbosity)) = guard.take() {
            self.emit(&format!(" {text}\n"), severity, op_verbosity);
        }
    }

    fn flush_operation(&self) {
        let mut guard = match self.operation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((_, op_verbosity)) = guard.take() {
            self.emit("\n", Severity::Normal, op_verbosity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_for_threshold_checks() {
        assert!(Severity::Warning > Severity::Normal);
        assert!(Severity::Good < Severity::Normal);
        assert!(Verbosity::High > Verbosity::Medium);
    }

    #[test]
    fn null_reporter_accepts_everything() {
        let reporter = NullReporter;
        reporter.info("hello");
        reporter.start_operation("op", Verbosity::Low);
        reporter.end_operation("done", Severity::Good);
        reporter.flush_operation();
    }
}
