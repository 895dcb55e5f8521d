//! The DataSet contract for dataprov.
//!
//! A [`DataSet`] is a keyed collection of
//! [`DataElement`](dataprov_element::DataElement)s. Elements are keyed by
//! their SHA-1 hex digest, so adding content-equal elements twice keeps one
//! entry. Sets store element handles, never content: removing an entry
//! leaves the element's backend untouched.
//!
//! # Implementations
//!
//! - [`MemoryDataSet`] -- in-memory map, optionally persisted into a cache
//!   element
//! - [`KvsDataSet`] -- descriptors held in any
//!   [`KeyValueStore`](dataprov_kv::KeyValueStore)
//! - [`FileDataSet`] -- descriptors written as files under a directory tree
//!   partitioned by digest

pub mod error;
pub mod file;
pub mod kvstore;
pub mod memory;
pub mod plugins;
pub mod traits;

pub use error::{SetError, SetResult};
pub use file::{partition_string, FileDataSet, DEFAULT_SHA1_CHUNK};
pub use kvstore::KvsDataSet;
pub use memory::MemoryDataSet;
pub use plugins::{register_plugins, resolve_data_set};
pub use traits::DataSet;
