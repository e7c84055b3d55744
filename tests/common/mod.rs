//! Shared test utilities

#![allow(dead_code)]

use std::fmt::Display;
use std::path::Path;
use std::sync::{Arc, Mutex};

use beacon_modifiers::extensions::join_values;
use beacon_modifiers::{
    Error, Logger, ModifierConfig, PathRewriter, PluginLoader, Registerer, Result, SharedLogger,
};

/// Logger that keeps every line it receives
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<String>>,
}

impl RecordingLogger {
    /// Create a recorder and the shared handle to hand to a host
    #[must_use]
    pub fn shared() -> (Arc<Self>, SharedLogger) {
        let recorder = Arc::new(Self::default());
        let shared: SharedLogger = recorder.clone();
        (recorder, shared)
    }

    /// Recorded lines, prefixed with their level
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    /// Number of recorded lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }

    fn record(&self, level: &str, values: &[&dyn Display]) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("{level}: {}", join_values(values)));
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, values: &[&dyn Display]) {
        self.record("DEBUG", values);
    }

    fn info(&self, values: &[&dyn Display]) {
        self.record("INFO", values);
    }

    fn warning(&self, values: &[&dyn Display]) {
        self.record("WARNING", values);
    }

    fn error(&self, values: &[&dyn Display]) {
        self.record("ERROR", values);
    }

    fn critical(&self, values: &[&dyn Display]) {
        self.record("CRITICAL", values);
    }

    fn fatal(&self, values: &[&dyn Display]) {
        self.record("FATAL", values);
    }
}

/// Loader binding `<stem>.so` files to a path rewriter named `omni.<stem>`
///
/// Files whose stem starts with `broken` fail to load.
pub struct FakeLoader;

impl PluginLoader for FakeLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn Registerer>> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if stem.starts_with("broken") {
            return Err(Error::Load {
                path: path.to_path_buf(),
                reason: "symbol not found".to_string(),
            });
        }
        Ok(Arc::new(PathRewriter::with_name(&format!("omni.{stem}"))))
    }
}

/// Create empty files named `names` inside `dir`
pub fn touch_all(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), b"").unwrap();
    }
}

/// Unwrap a JSON object literal into a modifier config
pub fn object(value: serde_json::Value) -> ModifierConfig {
    value.as_object().cloned().unwrap()
}
