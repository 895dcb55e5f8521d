use dataprov_element::ElementError;
use dataprov_types::Key;

/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// The key is not present and no default was given.
    #[error("key not found: {0}")]
    KeyNotFound(Key),

    /// Mutation attempted on a read-only store.
    #[error("{store} is read-only")]
    ReadOnly { store: String },

    /// The store's backend failed to persist or load its table.
    #[error("{store} backend error: {reason}")]
    Store { store: String, reason: String },

    /// The cache element failed.
    #[error(transparent)]
    Element(#[from] ElementError),
}

/// Result alias for key-value store operations.
pub type KvResult<T> = Result<T, KvError>;
