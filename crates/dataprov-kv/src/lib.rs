//! The KeyValueStore contract for dataprov.
//!
//! A [`KeyValueStore`] maps opaque [`Key`](dataprov_types::Key)s to JSON
//! [`Value`](dataprov_types::Value)s. Data sets use one to hold element
//! descriptors; anything else may use one as a small persistent table.
//!
//! # Implementations
//!
//! - [`MemoryKeyValueStore`] -- in-memory table, optionally persisted into a
//!   cache [`DataElement`](dataprov_element::DataElement)

pub mod error;
pub mod memory;
pub mod plugins;
pub mod traits;

pub use error::{KvError, KvResult};
pub use memory::MemoryKeyValueStore;
pub use plugins::{register_plugins, resolve_kv_store};
pub use traits::KeyValueStore;
