//! Plugin loading and lifecycle management

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::discovery::scan;
use crate::extensions::{Capabilities, Registerer, SharedLogger, TracingLogger};
use crate::lifecycle::{ShutdownSignal, ShutdownToken};
use crate::modifiers::{ModifierConfig, ModifierInfo, ModifierPipeline, ModifierRegistry};
use crate::Result;

/// Turns a discovered artifact into a registerer
///
/// Implementations open and bind the artifact; the host only consumes the
/// resulting [`Registerer`].
pub trait PluginLoader {
    /// Load the plugin at `path`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`](crate::Error::Load) if the artifact cannot be
    /// bound
    fn load(&self, path: &Path) -> Result<Arc<dyn Registerer>>;
}

/// A loaded plugin
#[derive(Debug, Clone, Serialize)]
pub struct LoadedPlugin {
    /// Capability name reported by the plugin
    pub name: String,
    /// Artifact the plugin was loaded from, if any
    pub path: Option<PathBuf>,
    /// Capabilities negotiated at load time
    pub capabilities: Capabilities,
    /// Modifiers it registered
    pub modifiers: Vec<String>,
}

/// Host side of the modifier plugin protocol
///
/// Owns the modifier registry, the logger handed to plugins and the shutdown
/// signal shared by every plugin.
pub struct PluginHost {
    registry: ModifierRegistry,
    plugins: Vec<LoadedPlugin>,
    registerers: Vec<Arc<dyn Registerer>>,
    logger: Option<SharedLogger>,
    shutdown: ShutdownSignal,
}

impl Default for PluginHost {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginHost {
    /// Create a host that hands a tracing logger to plugins
    #[must_use]
    pub fn new() -> Self {
        Self::with_logger(Some(TracingLogger::new().shared()))
    }

    /// Create a host with an explicit logger, or none
    #[must_use]
    pub fn with_logger(logger: Option<SharedLogger>) -> Self {
        Self {
            registry: ModifierRegistry::new(),
            plugins: Vec::new(),
            registerers: Vec::new(),
            logger,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Discover and load every plugin in `folder` matching `pattern`
    ///
    /// Plugins the loader rejects are logged and skipped. Returns the names
    /// of the plugins loaded by this call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`](crate::Error::Discovery) if the folder
    /// cannot be read
    pub fn load_all(
        &mut self,
        folder: &Path,
        pattern: &str,
        loader: &dyn PluginLoader,
    ) -> Result<Vec<String>> {
        let paths = scan(folder, pattern)?;
        let mut loaded = Vec::new();

        for path in paths {
            match loader.load(&path) {
                Ok(registerer) => {
                    loaded.push(self.register_from(registerer, Some(path)));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to load plugin");
                }
            }
        }

        tracing::info!(
            path = %folder.display(),
            plugins = loaded.len(),
            modifiers = self.registry.len(),
            "plugins loaded"
        );

        Ok(loaded)
    }

    /// Register an in-process plugin
    ///
    /// Returns the plugin's capability name.
    pub fn register(&mut self, registerer: Arc<dyn Registerer>) -> String {
        self.register_from(registerer, None)
    }

    fn register_from(&mut self, registerer: Arc<dyn Registerer>, path: Option<PathBuf>) -> String {
        let name = registerer.name().to_string();
        let capabilities = Capabilities::probe(registerer.as_ref());
        let modifiers = self.registry.load_extension(
            registerer.as_ref(),
            self.logger.as_ref(),
            &self.shutdown.token(),
        );

        tracing::info!(
            plugin = %name,
            path = ?path,
            modifiers = modifiers.len(),
            "registered plugin"
        );

        self.plugins.push(LoadedPlugin {
            name: name.clone(),
            path,
            capabilities,
            modifiers,
        });
        self.registerers.push(registerer);

        name
    }

    /// Build the modifier pipeline for `extra_config`
    #[must_use]
    pub fn pipeline(&self, extra_config: &ModifierConfig) -> ModifierPipeline {
        ModifierPipeline::build(&self.registry, extra_config)
    }

    /// Modifier registry
    #[must_use]
    pub const fn registry(&self) -> &ModifierRegistry {
        &self.registry
    }

    /// Loaded plugins in load order
    #[must_use]
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    /// Registerer of a loaded plugin
    #[must_use]
    pub fn registerer(&self, name: &str) -> Option<&Arc<dyn Registerer>> {
        self.registerers.iter().find(|r| r.name() == name)
    }

    /// Registered modifiers
    #[must_use]
    pub fn modifiers(&self) -> Vec<ModifierInfo> {
        self.registry.list()
    }

    /// Signal every plugin to release its resources
    ///
    /// Returns `false` if shutdown already happened.
    pub fn shutdown(&self) -> bool {
        self.shutdown.fire()
    }

    /// Token observing this host's shutdown signal
    #[must_use]
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.token()
    }

    /// Whether shutdown has been signalled
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_fired()
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("plugins", &self.plugins.len())
            .field("modifiers", &self.registry.len())
            .field("has_logger", &self.logger.is_some())
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::PathRewriter;
    use crate::Error;

    /// Loader that binds files named `<name>.so` to a path rewriter
    struct FakeLoader;

    impl PluginLoader for FakeLoader {
        fn load(&self, path: &Path) -> Result<Arc<dyn Registerer>> {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            if stem.starts_with("broken") {
                return Err(Error::Load {
                    path: path.to_path_buf(),
                    reason: "missing symbol".to_string(),
                });
            }
            Ok(Arc::new(PathRewriter::with_name(&format!("omni.{stem}"))))
        }
    }

    #[test]
    fn load_all_registers_discovered_plugins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alpha.so"), b"").unwrap();
        std::fs::write(dir.path().join("broken.so"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let mut host = PluginHost::new();
        let loaded = host.load_all(dir.path(), ".so", &FakeLoader).unwrap();

        assert_eq!(loaded, vec!["omni.alpha"]);
        assert_eq!(host.plugins().len(), 1);
        assert_eq!(host.plugins()[0].path.as_deref(), Some(dir.path().join("alpha.so").as_path()));
        assert!(host.plugins()[0].capabilities.modifiers);
        assert_eq!(host.modifiers().len(), 2);
        assert!(host.registerer("omni.alpha").is_some());
        assert!(host.registerer("omni.broken").is_none());
    }

    #[test]
    fn load_all_missing_folder_fails() {
        let mut host = PluginHost::new();
        let err = host
            .load_all(Path::new("/nonexistent/path"), ".so", &FakeLoader)
            .unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
        assert!(host.plugins().is_empty());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut host = PluginHost::with_logger(None);
        host.register(Arc::new(PathRewriter::new()));
        assert!(!host.is_shut_down());

        let token = host.shutdown_token();
        assert!(host.shutdown());
        assert!(host.is_shut_down());
        assert!(token.is_cancelled());
        assert!(!host.shutdown());
    }
}
