//! Capability registration for modifier extensions
//!
//! A loaded extension exposes a [`Registerer`]. The host probes it once for
//! the capabilities it supports, then calls only those registration methods.
//! Every capability is independently optional: an extension that does not
//! want a logger simply does not expose [`LoggerRegisterer`].
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon_modifiers::extensions::{Capabilities, Registerer};
//!
//! let caps = Capabilities::probe(registerer.as_ref());
//! if let Some(modifiers) = registerer.as_modifier_registerer() {
//!     modifiers.register_modifiers(&mut |descriptor| registry.insert(descriptor));
//! }
//! ```

mod logger;

pub use logger::{join_values, Logger, SharedLogger, StdoutLogger, TracingLogger};

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::lifecycle::ShutdownToken;
use crate::modifiers::ModifierDescriptor;

/// Object an extension hands to the host after loading
pub trait Registerer: Send + Sync {
    /// Capability name, e.g. `omni.path-rewriter`
    fn name(&self) -> &str;

    /// Modifier injection capability
    fn as_modifier_registerer(&self) -> Option<&dyn ModifierRegisterer> {
        None
    }

    /// Logger acceptance capability
    fn as_logger_registerer(&self) -> Option<&dyn LoggerRegisterer> {
        None
    }

    /// Cancellation context acceptance capability
    fn as_context_registerer(&self) -> Option<&dyn ContextRegisterer> {
        None
    }

    /// Capability table derived from the adapter methods
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            modifiers: self.as_modifier_registerer().is_some(),
            logger: self.as_logger_registerer().is_some(),
            context: self.as_context_registerer().is_some(),
        }
    }
}

/// Offers request/response modifiers to the host
pub trait ModifierRegisterer {
    /// Invoke `register` once per offered modifier
    ///
    /// Calling this again re-invokes `register` with fresh descriptors.
    fn register_modifiers(&self, register: &mut dyn FnMut(ModifierDescriptor));
}

/// Accepts a logger from the host
pub trait LoggerRegisterer {
    /// Offer a logger candidate
    ///
    /// Only a [`SharedLogger`] (`Arc<dyn Logger>`) is recognised. Any other
    /// type is ignored, including a concrete logger that has not been
    /// wrapped with [`TracingLogger::shared`] or an equivalent `Arc`.
    fn register_logger(&self, candidate: &dyn Any);
}

/// Accepts the host's shutdown context
pub trait ContextRegisterer {
    /// Hand over the shutdown token
    fn register_context(&self, token: ShutdownToken);
}

/// Capabilities an extension advertises, probed once at load time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Offers modifiers
    pub modifiers: bool,
    /// Accepts a logger
    pub logger: bool,
    /// Accepts a shutdown context
    pub context: bool,
}

impl Capabilities {
    /// Probe a registerer against every known capability shape
    #[must_use]
    pub fn probe(registerer: &dyn Registerer) -> Self {
        registerer.capabilities()
    }

    /// Names of the supported capabilities
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.modifiers, "modifiers"),
            (self.logger, "logger"),
            (self.context, "context"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

/// State owned by one extension instance
///
/// Logger and shutdown token are each written at most once, so every
/// factory and transform can read them through a shared `Arc` without
/// locking.
pub struct ExtensionState {
    name: String,
    logger: OnceLock<SharedLogger>,
    shutdown: OnceLock<ShutdownToken>,
}

impl ExtensionState {
    /// Create state for the named extension
    #[must_use]
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            logger: OnceLock::new(),
            shutdown: OnceLock::new(),
        })
    }

    /// Extension capability name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered logger, if any
    #[must_use]
    pub fn logger(&self) -> Option<&dyn Logger> {
        self.logger.get().map(AsRef::as_ref)
    }

    /// Owned handle to the registered logger, if any
    #[must_use]
    pub fn shared_logger(&self) -> Option<SharedLogger> {
        self.logger.get().cloned()
    }

    /// Registered shutdown token, if any
    #[must_use]
    pub fn shutdown(&self) -> Option<&ShutdownToken> {
        self.shutdown.get()
    }

    /// Accept a logger candidate
    ///
    /// Returns `true` if the candidate had the logger shape and no logger
    /// was set before.
    pub fn accept_logger(&self, candidate: &dyn Any) -> bool {
        let Some(logger) = candidate.downcast_ref::<SharedLogger>() else {
            return false;
        };

        if self.logger.set(Arc::clone(logger)).is_err() {
            return false;
        }

        self.debug(&[&format_args!("[PLUGIN: {}] Logger loaded", self.name)]);
        true
    }

    /// Accept a shutdown token
    ///
    /// Returns `false` if a token was already set.
    pub fn accept_context(&self, token: ShutdownToken) -> bool {
        if self.shutdown.set(token).is_err() {
            return false;
        }

        if let Some(logger) = self.logger() {
            logger.debug(&[&format_args!("[PLUGIN: {}] Context loaded", self.name)]);
        }
        true
    }

    /// Log at debug level, falling back to stdout without a logger
    pub fn debug(&self, values: &[&dyn fmt::Display]) {
        match self.logger() {
            Some(logger) => logger.debug(values),
            None => StdoutLogger.debug(values),
        }
    }

    /// Log at warning level, falling back to stdout without a logger
    pub fn warning(&self, values: &[&dyn fmt::Display]) {
        match self.logger() {
            Some(logger) => logger.warning(values),
            None => StdoutLogger.warning(values),
        }
    }
}

impl fmt::Debug for ExtensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionState")
            .field("name", &self.name)
            .field("has_logger", &self.logger.get().is_some())
            .field("has_context", &self.shutdown.get().is_some())
            .finish()
    }
}
