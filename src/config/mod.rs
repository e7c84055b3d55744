//! Configuration management for Beacon modifier plugins

pub mod file;

use std::path::{Path, PathBuf};

use crate::modifiers::ModifierConfig;
use crate::plugins::default_plugin_dirs;
use crate::{Error, Result};

/// Plugin file pattern used when none is configured
pub const DEFAULT_PATTERN: &str = ".so";

/// Modifier host configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Folder scanned for plugin files
    pub plugin_folder: PathBuf,

    /// Substring a plugin file name must contain
    pub plugin_pattern: String,

    /// Configuration handed to modifiers
    pub extra_config: ModifierConfig,
}

impl HostConfig {
    /// Load configuration from the standard config file
    ///
    /// Precedence is env > toml > default. A missing or unreadable file
    /// yields defaults.
    ///
    /// # Errors
    ///
    /// Returns error if `extra_config` cannot be converted
    pub fn load() -> Result<Self> {
        Self::resolve(file::load_config_file())
    }

    /// Load configuration from an explicit file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let fc = file::read_config_file(path)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Self::resolve(fc)
    }

    fn resolve(fc: file::ModifiersConfigFile) -> Result<Self> {
        let plugin_folder = std::env::var("BEACON_PLUGIN_FOLDER")
            .ok()
            .or(fc.plugin.folder)
            .map(PathBuf::from)
            .or_else(|| default_plugin_dirs().into_iter().next())
            .unwrap_or_else(|| PathBuf::from("plugins"));

        let plugin_pattern = std::env::var("BEACON_PLUGIN_PATTERN")
            .ok()
            .or(fc.plugin.pattern)
            .unwrap_or_else(|| DEFAULT_PATTERN.to_string());

        let extra_config = match serde_json::to_value(fc.extra_config)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(Error::Config(format!(
                    "extra_config must be a table, got {other}"
                )));
            }
        };

        Ok(Self {
            plugin_folder,
            plugin_pattern,
            extra_config,
        })
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugin_folder: default_plugin_dirs()
                .into_iter()
                .next()
                .unwrap_or_else(|| PathBuf::from("plugins")),
            plugin_pattern: DEFAULT_PATTERN.to_string(),
            extra_config: ModifierConfig::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::MODIFIER_NAMESPACE;

    #[test]
    fn from_file_converts_extra_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modifiers.toml");
        std::fs::write(
            &path,
            r#"
[plugin]
folder = "/srv/plugins"

[extra_config."plugin/req-resp-modifier"]
name = ["omni.path-rewriter-request"]

[extra_config."plugin/req-resp-modifier"."omni.path-rewriter-request"]
suffix = "/v2"
"#,
        )
        .unwrap();

        let config = HostConfig::from_file(&path).unwrap();
        let namespace = config.extra_config[MODIFIER_NAMESPACE].as_object().unwrap();
        assert_eq!(namespace["name"], serde_json::json!(["omni.path-rewriter-request"]));
        assert_eq!(
            namespace["omni.path-rewriter-request"]["suffix"],
            serde_json::json!("/v2")
        );
    }

    #[test]
    fn missing_file_fails() {
        let err = HostConfig::from_file(Path::new("/nonexistent/modifiers.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn default_pattern() {
        let config = HostConfig::default();
        assert_eq!(config.plugin_pattern, DEFAULT_PATTERN);
        assert!(config.extra_config.is_empty());
    }
}
