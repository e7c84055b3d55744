//! Request and response modifiers
//!
//! A modifier is manufactured once from configuration by its factory and
//! then applied to every matching request or response. Transforms receive a
//! phase-tagged [`Payload`] and reject payloads of the other phase with
//! [`Error::UnrecognizedInputType`](crate::Error::UnrecognizedInputType).

mod path_rewriter;
mod pipeline;
mod registry;
mod view;

pub use path_rewriter::{join_path, PathRewriter, DEFAULT_SUFFIX};
pub use pipeline::{ModifierPipeline, MODIFIER_NAMESPACE};
pub use registry::{ModifierInfo, ModifierRegistry};
pub use view::{
    Data, Headers, Params, Payload, Query, RequestContext, RequestView, RequestWrapper,
    ResponseView, ResponseWrapper,
};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Pipeline phase a modifier intercepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Before the request reaches the backend
    Request,
    /// Before the response reaches the client
    Response,
}

impl Phase {
    /// Suffix appended to an extension name for this phase
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Request => "-request",
            Self::Response => "-response",
        }
    }

    /// Conventional modifier name for an extension
    #[must_use]
    pub fn modifier_name(self, extension: &str) -> String {
        format!("{extension}{}", self.suffix())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Response => write!(f, "response"),
        }
    }
}

/// Configuration blob scoped to one modifier
pub type ModifierConfig = serde_json::Map<String, serde_json::Value>;

/// Configured transform applied per request or response
pub type Transform = Arc<dyn Fn(Payload) -> Result<Payload> + Send + Sync>;

/// Builds a transform from configuration
pub type ModifierFactory = Arc<dyn Fn(&ModifierConfig) -> Transform + Send + Sync>;

/// A modifier offered by an extension
#[derive(Clone)]
pub struct ModifierDescriptor {
    /// Globally unique modifier name
    pub name: String,
    /// Factory producing the transform
    pub factory: ModifierFactory,
    /// Runs on requests
    pub applies_to_request: bool,
    /// Runs on responses
    pub applies_to_response: bool,
}

impl ModifierDescriptor {
    /// Descriptor for a single-phase modifier
    pub fn new<F>(name: impl Into<String>, phase: Phase, factory: F) -> Self
    where
        F: Fn(&ModifierConfig) -> Transform + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            applies_to_request: phase == Phase::Request,
            applies_to_response: phase == Phase::Response,
        }
    }

    /// Phase this modifier runs in
    ///
    /// `None` for mixed-phase or phase-less descriptors, which the host
    /// refuses to register.
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        match (self.applies_to_request, self.applies_to_response) {
            (true, false) => Some(Phase::Request),
            (false, true) => Some(Phase::Response),
            _ => None,
        }
    }

    /// Run the factory
    #[must_use]
    pub fn build(&self, config: &ModifierConfig) -> Transform {
        (self.factory)(config)
    }
}

impl fmt::Debug for ModifierDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierDescriptor")
            .field("name", &self.name)
            .field("applies_to_request", &self.applies_to_request)
            .field("applies_to_response", &self.applies_to_response)
            .finish_non_exhaustive()
    }
}
