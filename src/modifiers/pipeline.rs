//! Ordered request/response modifier chains built from configuration

use serde_json::Value;

use super::view::{Payload, RequestWrapper, ResponseWrapper};
use super::{ModifierConfig, ModifierDescriptor, ModifierRegistry, Phase, Transform};
use crate::{Error, Result};

/// Key under `extra_config` holding modifier configuration
///
/// ```json
/// "plugin/req-resp-modifier": {
///     "name": ["omni.path-rewriter-request"],
///     "omni.path-rewriter-request": { "suffix": "/v2" }
/// }
/// ```
pub const MODIFIER_NAMESPACE: &str = "plugin/req-resp-modifier";

/// Key listing the enabled modifiers, in execution order
const NAMES_KEY: &str = "name";

/// Modifiers applied to every request and response
#[derive(Default)]
pub struct ModifierPipeline {
    request: Vec<(String, Transform)>,
    response: Vec<(String, Transform)>,
}

impl ModifierPipeline {
    /// Build the pipeline for the modifiers enabled in `extra_config`
    ///
    /// Each enabled modifier's factory runs exactly once here. Unknown names
    /// and malformed entries are logged and skipped.
    #[must_use]
    pub fn build(registry: &ModifierRegistry, extra_config: &ModifierConfig) -> Self {
        let mut pipeline = Self::default();

        let Some(namespace) = extra_config.get(MODIFIER_NAMESPACE) else {
            tracing::debug!(namespace = MODIFIER_NAMESPACE, "no modifier configuration");
            return pipeline;
        };

        let Some(namespace) = namespace.as_object() else {
            tracing::warn!(namespace = MODIFIER_NAMESPACE, "modifier configuration is not a table");
            return pipeline;
        };

        for name in enabled_names(namespace) {
            let descriptor = match resolve(registry, &name) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    tracing::warn!(modifier = %name, error = %e, "skipping modifier");
                    continue;
                }
            };

            let config = match namespace.get(&name) {
                None => ModifierConfig::new(),
                Some(Value::Object(config)) => config.clone(),
                Some(_) => {
                    tracing::warn!(modifier = %name, "modifier config is not a table, using defaults");
                    ModifierConfig::new()
                }
            };

            pipeline.push(descriptor, &config);
        }

        tracing::info!(
            request = pipeline.request.len(),
            response = pipeline.response.len(),
            "modifier pipeline ready"
        );

        pipeline
    }

    /// Append a modifier, running its factory with `config`
    pub fn push(&mut self, descriptor: &ModifierDescriptor, config: &ModifierConfig) {
        let Some(phase) = descriptor.phase() else {
            return;
        };

        let transform = descriptor.build(config);
        let entry = (descriptor.name.clone(), transform);
        match phase {
            Phase::Request => self.request.push(entry),
            Phase::Response => self.response.push(entry),
        }
    }

    /// Run every request modifier in order
    ///
    /// A modifier that fails is skipped for this request; the request
    /// continues through the remaining modifiers unchanged by it.
    #[must_use]
    pub fn modify_request(&self, request: RequestWrapper) -> RequestWrapper {
        let mut current = request;

        for (name, transform) in &self.request {
            match transform(Payload::request(current.clone())) {
                Ok(Payload::Request(out)) => current = RequestWrapper::from_view(out.as_ref()),
                Ok(Payload::Response(_)) => {
                    tracing::warn!(modifier = %name, "request modifier returned a response, ignoring");
                }
                Err(e) => {
                    tracing::warn!(modifier = %name, error = %e, "request modifier failed, skipping");
                }
            }
        }

        current
    }

    /// Run every response modifier in order
    ///
    /// Failing modifiers are skipped the same way as for requests.
    #[must_use]
    pub fn modify_response(&self, response: ResponseWrapper) -> ResponseWrapper {
        let mut current = response;

        for (name, transform) in &self.response {
            match transform(Payload::response(current.clone())) {
                Ok(Payload::Response(out)) => current = ResponseWrapper::from_view(out.as_ref()),
                Ok(Payload::Request(_)) => {
                    tracing::warn!(modifier = %name, "response modifier returned a request, ignoring");
                }
                Err(e) => {
                    tracing::warn!(modifier = %name, error = %e, "response modifier failed, skipping");
                }
            }
        }

        current
    }

    /// Names of the modifiers in one phase, in execution order
    #[must_use]
    pub fn names(&self, phase: Phase) -> Vec<&str> {
        let chain = match phase {
            Phase::Request => &self.request,
            Phase::Response => &self.response,
        };
        chain.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Total number of modifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.request.len() + self.response.len()
    }

    /// Whether the pipeline has no modifiers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.response.is_empty()
    }
}

impl std::fmt::Debug for ModifierPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModifierPipeline")
            .field("request", &self.names(Phase::Request))
            .field("response", &self.names(Phase::Response))
            .finish()
    }
}

fn resolve<'a>(registry: &'a ModifierRegistry, name: &str) -> Result<&'a ModifierDescriptor> {
    registry
        .get(name)
        .ok_or_else(|| Error::UnknownModifier(name.to_string()))
}

/// Modifier names listed under `name`, accepting a single string too
fn enabled_names(namespace: &ModifierConfig) -> Vec<String> {
    match namespace.get(NAMES_KEY) {
        Some(Value::String(name)) => vec![name.clone()],
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(|v| {
                let name = v.as_str();
                if name.is_none() {
                    tracing::warn!(value = %v, "ignoring non-string modifier name");
                }
                name.map(str::to_string)
            })
            .collect(),
        Some(other) => {
            tracing::warn!(value = %other, "modifier name list is malformed");
            Vec::new()
        }
        None => Vec::new(),
    }
}
