//! TOML configuration file loading
//!
//! Supports `~/.config/omni/beacon/modifiers.toml` as a persistent config
//! source. All fields are optional; the file is a partial overlay on top of
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ModifiersConfigFile {
    /// Plugin discovery configuration
    #[serde(default)]
    pub plugin: PluginFileConfig,

    /// Free-form configuration handed to modifiers
    ///
    /// Modifier settings live under the `plugin/req-resp-modifier` key.
    #[serde(default)]
    pub extra_config: toml::Table,
}

/// Plugin discovery configuration
#[derive(Debug, Default, Deserialize)]
pub struct PluginFileConfig {
    /// Folder scanned for plugin files
    pub folder: Option<String>,

    /// Substring a plugin file name must contain (e.g. ".so")
    pub pattern: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ModifiersConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ModifiersConfigFile {
    let Some(path) = config_file_path() else {
        return ModifiersConfigFile::default();
    };

    if !path.exists() {
        return ModifiersConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            ModifiersConfigFile::default()
        }
    }
}

/// Read and parse a config file
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<ModifiersConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/omni/beacon/modifiers.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("omni")
            .join("beacon")
            .join("modifiers.toml")
    })
}
