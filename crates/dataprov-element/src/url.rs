use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

use dataprov_plugin::{BoxError, Configurable, Plugin, Plugins, Usability};
use dataprov_types::{ConfigMap, Value};
use tracing::{debug, warn};

use crate::cache::ContentCache;
use crate::error::{ElementError, ElementResult};
use crate::memory::optional_string;
use crate::traits::DataElement;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retrieves the body and `Content-Type` header at an address.
type Fetcher = fn(&str, Duration) -> ElementResult<(Vec<u8>, Option<String>)>;

/// Read-only element over content served at an HTTP(S) address.
///
/// Requires the `http` feature; without it the plugin reports itself
/// unusable and is left out of discovery. Nothing is fetched until the
/// content or its type is first requested; the type is remembered from the
/// first response.
#[derive(Debug)]
pub struct UrlElement {
    url: String,
    timeout: Duration,
    // Outer `None` until a response has been seen.
    content_type: RwLock<Option<Option<String>>>,
    cache: ContentCache,
    fetcher: Fetcher,
}

impl UrlElement {
    /// Wrap `url`. An address without a scheme is taken to be `http://`.
    pub fn new(url: &str) -> ElementResult<Self> {
        let url = if has_web_scheme(url) {
            url.to_string()
        } else {
            format!("http://{url}")
        };
        validate(&url)?;
        Ok(Self {
            url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            content_type: RwLock::new(None),
            cache: ContentCache::new(),
            fetcher: fetch,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse an `http://` or `https://` URI. Unlike [`new`](Self::new), the
    /// scheme is mandatory.
    pub fn from_uri(uri: &str) -> ElementResult<Self> {
        if !has_web_scheme(uri) {
            return Err(ElementError::invalid_uri(uri, "not an http:// or https:// URI"));
        }
        Self::new(uri)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    #[cfg(test)]
    fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    fn fetch(&self) -> ElementResult<Vec<u8>> {
        let (bytes, content_type) = (self.fetcher)(&self.url, self.timeout)?;
        debug!(url = %self.url, bytes = bytes.len(), content_type = ?content_type, "fetched url element");
        *self.content_type.write().expect("lock poisoned") = Some(content_type);
        Ok(bytes)
    }

    fn known_content_type(&self) -> Option<Option<String>> {
        self.content_type.read().expect("lock poisoned").clone()
    }
}

impl DataElement for UrlElement {
    /// Type from the server's `Content-Type` header, fetched on first use.
    fn content_type(&self) -> Option<String> {
        if let Some(known) = self.known_content_type() {
            return known;
        }
        if let Err(e) = self.fetch() {
            warn!(url = %self.url, error = %e, "could not determine content type");
        }
        self.known_content_type().flatten()
    }

    fn get_bytes(&self) -> ElementResult<Vec<u8>> {
        self.fetch()
    }

    /// One request at most: the body fetched for the file also supplies the
    /// type that picks its extension.
    fn write_temp(&self, dir: Option<&Path>) -> ElementResult<PathBuf> {
        if let Some(known) = self.known_content_type() {
            return self.cache.write_temp(dir, known.as_deref(), || self.fetch());
        }
        let bytes = self.fetch()?;
        let content_type = self.known_content_type().flatten();
        self.cache.write_temp(dir, content_type.as_deref(), || Ok(bytes))
    }

    fn writable(&self) -> bool {
        false
    }

    fn store_bytes(&self, _data: &[u8]) -> ElementResult<()> {
        Err(ElementError::ReadOnly {
            element: self.locator(),
        })
    }

    fn locator(&self) -> String {
        self.url.clone()
    }

    fn cache(&self) -> &ContentCache {
        &self.cache
    }
}

impl Configurable for UrlElement {
    fn plugin_name(&self) -> &'static str {
        <Self as Plugin<dyn DataElement>>::NAME
    }

    fn get_config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("url_address".into(), Value::String(self.url.clone()));
        config.insert("timeout_secs".into(), Value::from(self.timeout.as_secs()));
        config
    }
}

impl Plugin<dyn DataElement> for UrlElement {
    const NAME: &'static str = "UrlElement";

    fn usability() -> Usability {
        if cfg!(feature = "http") {
            Usability::Usable
        } else {
            Usability::Unusable("optional dependency `reqwest` not compiled in (enable the `http` feature)".into())
        }
    }

    fn default_config() -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("url_address".into(), Value::Null);
        config.insert("timeout_secs".into(), Value::from(DEFAULT_TIMEOUT_SECS));
        config
    }

    fn from_config(config: &ConfigMap, _plugins: &Plugins) -> Result<Self, BoxError> {
        let url = optional_string(config, "url_address")?.ok_or("\"url_address\" is required")?;
        let timeout = match config.get("timeout_secs") {
            None | Some(Value::Null) => DEFAULT_TIMEOUT_SECS,
            Some(v) => v.as_u64().ok_or("\"timeout_secs\" must be a non-negative integer")?,
        };
        Ok(Self::new(&url)?.with_timeout(Duration::from_secs(timeout)))
    }

    fn into_contract(self) -> Box<dyn DataElement> {
        Box::new(self)
    }
}

fn has_web_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate(url: &str) -> ElementResult<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(ElementError::invalid_uri(url, "missing host"));
    }
    if url.chars().any(char::is_whitespace) {
        return Err(ElementError::invalid_uri(url, "whitespace in address"));
    }
    Ok(())
}

#[cfg(feature = "http")]
fn fetch(url: &str, timeout: Duration) -> ElementResult<(Vec<u8>, Option<String>)> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ElementError::retrieval(url, e))?;
    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| ElementError::retrieval(url, e))?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().map_err(|e| ElementError::retrieval(url, e))?;
    Ok((bytes.to_vec(), content_type))
}

#[cfg(not(feature = "http"))]
fn fetch(url: &str, _timeout: Duration) -> ElementResult<(Vec<u8>, Option<String>)> {
    Err(ElementError::retrieval(url, "HTTP support not compiled in (enable the `http` feature)"))
}
