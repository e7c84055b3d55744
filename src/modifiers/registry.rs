//! Registry of modifiers offered by loaded extensions

use std::collections::HashMap;

use serde::Serialize;

use super::{ModifierDescriptor, Phase};
use crate::extensions::{Capabilities, Registerer, SharedLogger};
use crate::lifecycle::ShutdownToken;

/// Summary of a registered modifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifierInfo {
    /// Modifier name
    pub name: String,
    /// Extension that registered it
    pub extension: String,
    /// Phase it runs in
    pub phase: Phase,
}

struct Entry {
    descriptor: ModifierDescriptor,
    extension: String,
    phase: Phase,
}

/// Modifiers keyed by their globally unique name
///
/// Duplicate names follow last-registration-wins: the newer descriptor
/// replaces the older one and a warning names both extensions.
#[derive(Default)]
pub struct ModifierRegistry {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
}

impl ModifierRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Negotiate capabilities with an extension and collect its modifiers
    ///
    /// Hands over the logger and shutdown token when the extension accepts
    /// them, then pulls modifier descriptors. Returns the names registered
    /// by this call.
    pub fn load_extension(
        &mut self,
        registerer: &dyn Registerer,
        logger: Option<&SharedLogger>,
        shutdown: &ShutdownToken,
    ) -> Vec<String> {
        let extension = registerer.name().to_string();
        let caps = Capabilities::probe(registerer);

        tracing::info!(
            plugin = %extension,
            capabilities = ?caps.names(),
            "negotiated plugin capabilities"
        );

        if let (Some(target), Some(logger)) = (registerer.as_logger_registerer(), logger) {
            target.register_logger(logger);
        }

        if let Some(target) = registerer.as_context_registerer() {
            target.register_context(shutdown.clone());
        }

        let Some(target) = registerer.as_modifier_registerer() else {
            tracing::debug!(plugin = %extension, "plugin offers no modifiers");
            return Vec::new();
        };

        let mut registered = Vec::new();
        target.register_modifiers(&mut |descriptor| {
            if let Some(name) = self.insert(&extension, descriptor) {
                registered.push(name);
            }
        });

        registered
    }

    /// Register a single descriptor on behalf of an extension
    ///
    /// Returns the name on success, `None` if the descriptor is not a
    /// single-phase modifier.
    pub fn insert(&mut self, extension: &str, descriptor: ModifierDescriptor) -> Option<String> {
        let Some(phase) = descriptor.phase() else {
            tracing::warn!(
                plugin = %extension,
                modifier = %descriptor.name,
                applies_to_request = descriptor.applies_to_request,
                applies_to_response = descriptor.applies_to_response,
                "modifier must apply to exactly one phase, ignoring"
            );
            return None;
        };

        let name = descriptor.name.clone();
        let entry = Entry {
            descriptor,
            extension: extension.to_string(),
            phase,
        };

        match self.entries.insert(name.clone(), entry) {
            Some(previous) => {
                tracing::warn!(
                    modifier = %name,
                    previous = %previous.extension,
                    plugin = %extension,
                    "duplicate modifier name, replacing earlier registration"
                );
            }
            None => {
                self.order.push(name.clone());
                tracing::debug!(plugin = %extension, modifier = %name, phase = %phase, "registered modifier");
            }
        }

        Some(name)
    }

    /// Look up a modifier by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModifierDescriptor> {
        self.entries.get(name).map(|e| &e.descriptor)
    }

    /// Phase of a registered modifier
    #[must_use]
    pub fn phase(&self, name: &str) -> Option<Phase> {
        self.entries.get(name).map(|e| e.phase)
    }

    /// All modifiers in first-registration order
    #[must_use]
    pub fn list(&self) -> Vec<ModifierInfo> {
        self.order
            .iter()
            .filter_map(|name| {
                self.entries.get(name).map(|e| ModifierInfo {
                    name: name.clone(),
                    extension: e.extension.clone(),
                    phase: e.phase,
                })
            })
            .collect()
    }

    /// Names of the modifiers in one phase, in registration order
    #[must_use]
    pub fn names_for(&self, phase: Phase) -> Vec<&str> {
        self.order
            .iter()
            .filter(|name| self.phase(name) == Some(phase))
            .map(String::as_str)
            .collect()
    }

    /// Number of registered modifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no modifiers are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ModifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModifierRegistry")
            .field("modifiers", &self.order)
            .finish()
    }
}
