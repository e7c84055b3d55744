//! Beacon Modifiers - request/response modifier plugins for the Beacon gateway
//!
//! This library provides the host side of the modifier plugin protocol:
//! - Plugin discovery in a configured folder
//! - Capability negotiation (modifiers, logger, shutdown context)
//! - Modifier factories and the request/response pipeline
//! - A built-in path rewriter extension
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Plugin folder                        │
//! │   rewriter.so  │  auth.so  │  ...                    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ scan + load
//! ┌────────────────────▼────────────────────────────────┐
//! │                  PluginHost                          │
//! │  Registry  │  Logger  │  ShutdownSignal              │
//! └────────────────────┬────────────────────────────────┘
//!                      │ extra_config
//! ┌────────────────────▼────────────────────────────────┐
//! │               ModifierPipeline                       │
//! │   request modifiers  │  response modifiers           │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod extensions;
pub mod lifecycle;
pub mod modifiers;
pub mod plugins;

pub use config::HostConfig;
pub use error::{Error, Result};
pub use extensions::{
    Capabilities, ContextRegisterer, ExtensionState, Logger, LoggerRegisterer,
    ModifierRegisterer, Registerer, SharedLogger, StdoutLogger, TracingLogger,
};
pub use lifecycle::{ShutdownSignal, ShutdownToken};
pub use modifiers::{
    ModifierConfig, ModifierDescriptor, ModifierFactory, ModifierPipeline, ModifierRegistry,
    PathRewriter, Payload, Phase, RequestView, RequestWrapper, ResponseView, ResponseWrapper,
    Transform,
};
pub use plugins::{LoadedPlugin, PluginHost, PluginLoader};
