use std::path::PathBuf;

use dataprov_element::ElementError;
use dataprov_kv::KvError;
use dataprov_plugin::PluginError;
use dataprov_types::ElementKey;

/// Errors from data set operations.
#[derive(Debug, thiserror::Error)]
pub enum SetError {
    /// No element is stored under the key.
    #[error("no element with key {0}")]
    KeyNotFound(ElementKey),

    /// Mutation attempted on a set whose storage is read-only.
    #[error("{set} is read-only")]
    ReadOnly { set: String },

    /// The set's storage failed or holds unreadable entries.
    #[error("{set} storage error: {reason}")]
    Store { set: String, reason: String },

    /// Reading or writing a serialized element failed.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An element failed while being keyed or persisted.
    #[error(transparent)]
    Element(#[from] ElementError),

    /// The backing key-value store failed.
    #[error(transparent)]
    Kv(#[from] KvError),

    /// A stored descriptor could not be turned back into an element.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

/// Result alias for data set operations.
pub type SetResult<T> = Result<T, SetError>;
