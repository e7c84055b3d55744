//! Logger capability offered to extensions

use std::fmt::{self, Display, Write as _};
use std::io::Write as _;
use std::sync::Arc;

/// Leveled logger an extension may accept from the host
///
/// Each method takes a variable-length list of loggable values which are
/// joined with single spaces.
pub trait Logger: Send + Sync {
    /// Debug-level message
    fn debug(&self, values: &[&dyn Display]);
    /// Info-level message
    fn info(&self, values: &[&dyn Display]);
    /// Warning-level message
    fn warning(&self, values: &[&dyn Display]);
    /// Error-level message
    fn error(&self, values: &[&dyn Display]);
    /// Critical-level message
    fn critical(&self, values: &[&dyn Display]);
    /// Fatal-level message
    fn fatal(&self, values: &[&dyn Display]);
}

/// Shape a logger candidate must have to be accepted by an extension
pub type SharedLogger = Arc<dyn Logger>;

/// Join loggable values the way every sink renders them
#[must_use]
pub fn join_values(values: &[&dyn Display]) -> String {
    let mut line = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        let _ = write!(line, "{value}");
    }
    line
}

/// Logger backed by `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    scope: Option<String>,
}

impl TracingLogger {
    /// Create a logger with no scope
    #[must_use]
    pub const fn new() -> Self {
        Self { scope: None }
    }

    /// Create a logger that tags every event with a plugin name
    #[must_use]
    pub fn scoped(plugin: &str) -> Self {
        Self {
            scope: Some(plugin.to_string()),
        }
    }

    /// Wrap into the shared capability shape
    #[must_use]
    pub fn shared(self) -> SharedLogger {
        Arc::new(self)
    }

    fn plugin(&self) -> &str {
        self.scope.as_deref().unwrap_or("-")
    }
}

impl Logger for TracingLogger {
    fn debug(&self, values: &[&dyn Display]) {
        tracing::debug!(plugin = %self.plugin(), "{}", join_values(values));
    }

    fn info(&self, values: &[&dyn Display]) {
        tracing::info!(plugin = %self.plugin(), "{}", join_values(values));
    }

    fn warning(&self, values: &[&dyn Display]) {
        tracing::warn!(plugin = %self.plugin(), "{}", join_values(values));
    }

    fn error(&self, values: &[&dyn Display]) {
        tracing::error!(plugin = %self.plugin(), "{}", join_values(values));
    }

    fn critical(&self, values: &[&dyn Display]) {
        tracing::error!(plugin = %self.plugin(), severity = "critical", "{}", join_values(values));
    }

    fn fatal(&self, values: &[&dyn Display]) {
        tracing::error!(plugin = %self.plugin(), severity = "fatal", "{}", join_values(values));
    }
}

/// Console sink used when no logger capability was registered
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutLogger;

impl StdoutLogger {
    fn emit(level: &str, values: &[&dyn Display]) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{level}: {}", join_values(values));
    }
}

impl Logger for StdoutLogger {
    fn debug(&self, values: &[&dyn Display]) {
        Self::emit("DEBUG", values);
    }

    fn info(&self, values: &[&dyn Display]) {
        Self::emit("INFO", values);
    }

    fn warning(&self, values: &[&dyn Display]) {
        Self::emit("WARNING", values);
    }

    fn error(&self, values: &[&dyn Display]) {
        Self::emit("ERROR", values);
    }

    fn critical(&self, values: &[&dyn Display]) {
        Self::emit("CRITICAL", values);
    }

    fn fatal(&self, values: &[&dyn Display]) {
        Self::emit("FATAL", values);
    }
}

impl fmt::Debug for dyn Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logger")
    }
}
