use std::path::PathBuf;

use dataprov_types::TypeError;

/// Boxed error returned by plugin constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from reading or interpreting plugin configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The descriptor does not select an implementation.
    #[error("{contract}: descriptor does not select an implementation (missing \"type\")")]
    MissingType { contract: String },

    /// The `type` selector is not a string.
    #[error("{contract}: \"type\" must be a string or null, got {found}")]
    InvalidType { contract: String, found: String },

    /// A per-implementation section is not a JSON object.
    #[error("{contract}: parameters for {name:?} must be an object, got {found}")]
    NotAnObject {
        contract: String,
        name: String,
        found: String,
    },

    /// The configuration document is structurally wrong.
    #[error("malformed configuration: {0}")]
    Malformed(String),

    /// A configuration document could not be parsed or rendered.
    #[error("{format} configuration error: {reason}")]
    Format { format: &'static str, reason: String },

    /// Reading or writing a configuration file failed.
    #[error("configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Flattening or expanding a configuration failed.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Errors from plugin discovery, validation, and instantiation.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// A registered plugin does not satisfy the registry's rules.
    #[error("{contract} plugin {name:?} failed validation: {reason}")]
    Validation {
        contract: &'static str,
        name: String,
        reason: String,
    },

    /// The plugin's constructor failed.
    #[error("{contract} plugin {name:?} failed to construct: {source}")]
    Construction {
        contract: &'static str,
        name: String,
        #[source]
        source: BoxError,
    },

    /// The plugin declared itself unusable, typically a missing optional dependency.
    #[error("{contract} plugin {name:?} is unusable: {reason}")]
    Unusable {
        contract: &'static str,
        name: String,
        reason: String,
    },

    /// No plugin with this name is registered for the contract.
    #[error("no {contract} plugin named {name:?} (available: {available:?})")]
    NotFound {
        contract: &'static str,
        name: String,
        available: Vec<String>,
    },

    /// Nothing was ever registered for the contract.
    #[error("no registry for contract {0}")]
    UnknownContract(&'static str),

    /// The descriptor itself is malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PluginError {
    /// Name of the plugin this error concerns, if any.
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Self::Validation { name, .. }
            | Self::Construction { name, .. }
            | Self::Unusable { name, .. }
            | Self::NotFound { name, .. } => Some(name),
            Self::UnknownContract(_) | Self::Config(_) => None,
        }
    }
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result alias for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
