//! Content hashing for dataprov.
//!
//! Every data element derives its identity from a digest of its full byte
//! content. [`ContentHasher`] computes that digest for any supported
//! [`DigestAlgorithm`](dataprov_types::DigestAlgorithm), with SHA-1 as the
//! default identity algorithm.
//!
//! All hashing wraps established libraries -- no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
