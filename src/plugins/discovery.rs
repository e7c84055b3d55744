//! Plugin discovery - scan folders for candidate plugin artifacts

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Scan a folder for plugin files
///
/// Returns every non-directory entry whose file name contains `pattern`, in
/// the order the filesystem lists them. Entries are classified without
/// following symlinks.
///
/// # Errors
///
/// Returns [`Error::Discovery`] if the folder cannot be read
pub fn scan(folder: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let discovery_err = |source| Error::Discovery {
        path: folder.to_path_buf(),
        source,
    };

    let entries = std::fs::read_dir(folder).map_err(discovery_err)?;

    let mut plugins = Vec::new();
    for entry in entries {
        let entry = entry.map_err(discovery_err)?;
        let file_type = entry.file_type().map_err(discovery_err)?;
        if file_type.is_dir() {
            continue;
        }

        let name = entry.file_name();
        if name.to_string_lossy().contains(pattern) {
            plugins.push(folder.join(&name));
        }
    }

    tracing::debug!(
        path = %folder.display(),
        pattern = %pattern,
        found = plugins.len(),
        "scanned plugin folder"
    );

    Ok(plugins)
}

/// Scan several folders, skipping ones that cannot be read
#[must_use]
pub fn scan_all(folders: &[PathBuf], pattern: &str) -> Vec<PathBuf> {
    let mut results = Vec::new();

    for folder in folders {
        match scan(folder, pattern) {
            Ok(found) => results.extend(found),
            Err(e) => {
                tracing::debug!(error = %e, "plugin folder unavailable, skipping");
            }
        }
    }

    results
}

/// Default plugin search directories
#[must_use]
pub fn default_plugin_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(base) = directories::BaseDirs::new() {
        dirs.push(base.config_dir().join("omni").join("beacon").join("plugins"));
        dirs.push(base.data_dir().join("omni").join("beacon").join("plugins"));
    }

    dirs
}
