//! High-level SDK for dataprov.
//!
//! Bundles every built-in plugin into one table and resolves the
//! implementation selected for each contract from a single configuration.
//! This is the main entry point for applications embedding dataprov.
//!
//! # Key Types
//!
//! - [`Provider`] -- plugin table plus configuration; resolves elements,
//!   data sets, and key-value stores
//! - [`ProviderError`] -- umbrella over every crate's error type
//!
//! A configuration selects one implementation per contract:
//!
//! ```toml
//! [data_set]
//! type = "KvsDataSet"
//!
//! [data_set.KvsDataSet.kvstore]
//! type = "MemoryKeyValueStore"
//! ```

pub mod builtin;
pub mod error;
pub mod provider;

pub use builtin::{builtin_plugins, register_builtin_plugins};
pub use error::{ProviderError, ProviderResult};
pub use provider::Provider;

// Re-export the contracts and their built-in implementations
pub use dataprov_element::{
    BackendElement, ByteBackend, DataElement, ElementError, FileElement, InMemoryBackend, MemoryElement, UrlElement,
};
pub use dataprov_kv::{KeyValueStore, KvError, MemoryKeyValueStore};
pub use dataprov_plugin::{Configurable, PluginConfig, PluginDescriptor, PluginError, Plugins};
pub use dataprov_set::{DataSet, FileDataSet, KvsDataSet, MemoryDataSet, SetError};
pub use dataprov_types::{Checksum, DigestAlgorithm, ElementKey, Key};
