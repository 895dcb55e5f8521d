//! Foundation types for dataprov.
//!
//! This crate provides the identity and configuration types shared by every
//! other dataprov crate. It performs no I/O and knows nothing about backends.
//!
//! # Key Types
//!
//! - [`Checksum`] -- Digest of an element's byte content, tagged with its algorithm
//! - [`DigestAlgorithm`] -- Supported digest algorithms (SHA-1 is the default)
//! - [`ElementKey`] -- Key under which a data set stores an element
//! - [`Key`] -- Opaque key for key-value stores
//! - [`ConfigMap`] -- JSON object used for plugin parameters

pub mod checksum;
pub mod config;
pub mod error;
pub mod key;

pub use checksum::{Checksum, DigestAlgorithm};
pub use config::{flatten_config, merge_config, unflatten_config, ConfigMap, FlatConfig, Value};
pub use error::TypeError;
pub use key::{ElementKey, Key};
