use std::path::PathBuf;

/// Errors from data element operations.
#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    /// The backend was unreachable or the locator did not resolve to content.
    #[error("failed to retrieve {locator}: {reason}")]
    Retrieval { locator: String, reason: String },

    /// The backend rejected a write.
    #[error("failed to store {locator}: {reason}")]
    Store { locator: String, reason: String },

    /// Mutation attempted on an element that is not writable.
    #[error("{element} is read-only")]
    ReadOnly { element: String },

    /// No element implementation accepts this URI.
    #[error("invalid URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// The element's content type is not one the caller accepts.
    #[error("{element} has content type {content_type:?}; expected one of {valid:?}")]
    InvalidContentType {
        element: String,
        content_type: Option<String>,
        valid: Vec<String>,
    },

    /// Creating or removing a temporary file failed.
    #[error("temporary file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ElementError {
    pub(crate) fn retrieval(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::Retrieval {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn store(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::Store {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_uri(uri: &str, reason: impl ToString) -> Self {
        Self::InvalidUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for element operations.
pub type ElementResult<T> = Result<T, ElementError>;
