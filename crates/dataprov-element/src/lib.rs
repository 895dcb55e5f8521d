//! The DataElement contract for dataprov.
//!
//! A [`DataElement`] is a handle to one unit of byte content. Where the bytes
//! live (memory, a local file, a byte backend, a URL) is the implementation's
//! business; identity and local-file access are uniform across all of them.
//!
//! # Identity and Caching
//!
//! Every element owns a [`ContentCache`]:
//!
//! - checksums are memoized per algorithm, never from a stale read
//! - [`DataElement::write_temp`] materializes content once per content state
//! - [`DataElement::set_bytes`] and [`DataElement::clean_temp`] invalidate both
//! - temp files are removed when the element is dropped
//!
//! # Implementations
//!
//! - [`MemoryElement`] -- bytes in process memory
//! - [`FileElement`] -- a file on the local filesystem
//! - [`BackendElement`] -- a locator inside a named [`ByteBackend`]
//! - [`UrlElement`] -- HTTP(S) content, read-only (`http` feature)
//!
//! Register them with [`register_plugins`] and resolve descriptors through
//! [`dataprov_plugin::Plugins`].

pub mod backend;
pub mod cache;
pub mod content_type;
pub mod error;
pub mod file;
pub mod memory;
pub mod plugins;
pub mod traits;
pub mod uri;
pub mod url;

pub use backend::{BackendElement, ByteBackend, InMemoryBackend, DEFAULT_BACKEND};
pub use cache::ContentCache;
pub use content_type::{ContentTypeValidator, ContentTypes};
pub use error::{ElementError, ElementResult};
pub use file::FileElement;
pub use memory::MemoryElement;
pub use plugins::{register_plugins, resolve_element};
pub use traits::DataElement;
pub use uri::{from_uri, from_uri_with, UriResolver};
pub use url::UrlElement;
