//! Plugin registry for dataprov.
//!
//! Callers never name a concrete backend type. They hand a
//! [`PluginDescriptor`] to [`Plugins::resolve`], which walks the state machine
//! `descriptor → validated registration → instance`:
//!
//! 1. **Registration** -- each backend crate explicitly registers its plugin
//!    types into a [`PluginsBuilder`] at process start.
//! 2. **Discovery** -- [`Registry::discover`] enumerates the registrations of a
//!    contract, rejecting invalid ones and excluding unusable ones (for example
//!    plugins whose optional dependency was not compiled in) without failing
//!    the whole discovery.
//! 3. **Instantiation** -- the selected plugin's parameters are merged over its
//!    defaults and passed to its constructor.
//!
//! Contract conformance is a compile-time property: a plugin must convert
//! into `Box<dyn Contract>`, so a partial implementation never registers.
//!
//! # Modules
//!
//! - [`error`] -- [`PluginError`] and [`ConfigError`]
//! - [`descriptor`] -- [`PluginDescriptor`] and the multi-contract [`PluginConfig`]
//! - [`plugin`] -- the [`Contract`], [`Plugin`], and [`Configurable`] traits
//! - [`registry`] -- per-contract [`Registry`] and [`Discovery`] reports
//! - [`plugins`] -- the [`Plugins`] table shared by all contracts

pub mod descriptor;
pub mod error;
pub mod plugin;
pub mod plugins;
pub mod registry;

pub use descriptor::{PluginConfig, PluginDescriptor, TYPE_KEY};
pub use error::{BoxError, ConfigError, ConfigResult, PluginError, PluginResult};
pub use plugin::{Configurable, Contract, Plugin, Usability};
pub use plugins::{Plugins, PluginsBuilder};
pub use registry::{Discovery, Registry};
