use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid digest length for {algorithm}: expected {expected}, got {actual}")]
    InvalidLength {
        algorithm: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("configuration key {key:?} cannot be flattened: {reason}")]
    InvalidConfigKey { key: String, reason: String },

    #[error("flat configuration conflict at {0:?}")]
    FlatConflict(String),
}
