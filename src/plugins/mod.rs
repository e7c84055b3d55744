//! Plugin system for Beacon modifiers
//!
//! Plugins are discovered as files in a plugin folder whose name contains a
//! configured pattern. A [`PluginLoader`] binds each file to a
//! [`Registerer`](crate::extensions::Registerer), which the [`PluginHost`]
//! negotiates capabilities with.

pub mod discovery;
pub mod loader;

pub use discovery::{default_plugin_dirs, scan, scan_all};
pub use loader::{LoadedPlugin, PluginHost, PluginLoader};
