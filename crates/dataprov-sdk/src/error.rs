use dataprov_element::ElementError;
use dataprov_kv::KvError;
use dataprov_plugin::{ConfigError, PluginError};
use dataprov_set::SetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no {contract} section in the provider configuration")]
    Unconfigured { contract: &'static str },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("element error: {0}")]
    Element(#[from] ElementError),

    #[error("key-value store error: {0}")]
    Kv(#[from] KvError),

    #[error("data set error: {0}")]
    Set(#[from] SetError),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
