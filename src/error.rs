//! Error types for Beacon modifier plugins

use std::path::PathBuf;

use thiserror::Error;

use crate::modifiers::Phase;

/// Result type alias for modifier plugin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while discovering, loading or running plugins
#[derive(Debug, Error)]
pub enum Error {
    /// Plugin folder could not be read
    #[error("discovery failed for {}: {source}", path.display())]
    Discovery {
        /// Folder that was scanned
        path: PathBuf,
        /// Underlying filesystem error
        #[source]
        source: std::io::Error,
    },

    /// A transform received a payload of the wrong phase
    #[error("unknown {expected} type")]
    UnrecognizedInputType {
        /// Phase the transform expected
        expected: Phase,
    },

    /// Plugin loader failed to produce a registerer
    #[error("failed to load plugin {}: {reason}", path.display())]
    Load {
        /// Plugin artifact
        path: PathBuf,
        /// Loader-supplied reason
        reason: String,
    },

    /// Configuration names a modifier that no extension registered
    #[error("unknown modifier: {0}")]
    UnknownModifier(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shape mismatch at a transform boundary
    #[must_use]
    pub const fn unrecognized(expected: Phase) -> Self {
        Self::UnrecognizedInputType { expected }
    }

    /// Whether this error came from a transform boundary check
    #[must_use]
    pub const fn is_unrecognized_input(&self) -> bool {
        matches!(self, Self::UnrecognizedInputType { .. })
    }
}
