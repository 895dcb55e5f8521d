use std::sync::RwLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dataprov_plugin::{BoxError, Configurable, Plugin, Plugins};
use dataprov_types::{ConfigMap, Value};
use serde_json::json;

use crate::cache::ContentCache;
use crate::error::{ElementError, ElementResult};
use crate::traits::DataElement;

const BASE64_SCHEME: &str = "base64://";
const DATA_SCHEME: &str = "data:";
const DATA_BASE64_MARKER: &str = ";base64,";

/// Element whose content lives in process memory.
///
/// The content is its own locator, so this is the one element whose
/// configuration carries the bytes (base64 encoded).
#[derive(Debug)]
pub struct MemoryElement {
    bytes: RwLock<Vec<u8>>,
    content_type: Option<String>,
    readonly: bool,
    cache: ContentCache,
}

impl MemoryElement {
    /// A writable element over `bytes`.
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: Option<String>) -> Self {
        Self {
            bytes: RwLock::new(bytes.into()),
            content_type,
            readonly: false,
            cache: ContentCache::new(),
        }
    }

    /// A read-only element over `bytes`.
    pub fn read_only(bytes: impl Into<Vec<u8>>, content_type: Option<String>) -> Self {
        Self::new(bytes, content_type).with_readonly(true)
    }

    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Parse `""`, `base64://<data>`, or `data:<mime>;base64,<data>`.
    ///
    /// The empty URI yields an empty element.
    pub fn from_uri(uri: &str) -> ElementResult<Self> {
        if uri.is_empty() {
            return Ok(Self::new(Vec::new(), None));
        }
        if let Some(encoded) = uri.strip_prefix(BASE64_SCHEME) {
            if encoded.is_empty() {
                return Err(ElementError::invalid_uri(uri, "no base64 data after scheme"));
            }
            let bytes = decode_base64(encoded).map_err(|e| ElementError::invalid_uri(uri, e))?;
            return Ok(Self::new(bytes, None));
        }
        if let Some(rest) = uri.strip_prefix(DATA_SCHEME) {
            let (content_type, encoded) = rest
                .split_once(DATA_BASE64_MARKER)
                .ok_or_else(|| ElementError::invalid_uri(uri, "data URI is not base64 encoded"))?;
            if !is_mime_like(content_type) || encoded.is_empty() {
                return Err(ElementError::invalid_uri(uri, "malformed data URI"));
            }
            let bytes = decode_base64(encoded).map_err(|e| ElementError::invalid_uri(uri, e))?;
            return Ok(Self::new(bytes, Some(content_type.to_string())));
        }
        Err(ElementError::invalid_uri(uri, "not a base64:// or data: URI"))
    }

    /// Copy of the current content.
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.read().expect("lock poisoned").clone()
    }
}

impl Default for MemoryElement {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}

impl DataElement for MemoryElement {
    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn get_bytes(&self) -> ElementResult<Vec<u8>> {
        Ok(self.bytes())
    }

    fn writable(&self) -> bool {
        !self.readonly
    }

    fn store_bytes(&self, data: &[u8]) -> ElementResult<()> {
        *self.bytes.write().expect("lock poisoned") = data.to_vec();
        Ok(())
    }

    fn locator(&self) -> String {
        let len = self.bytes.read().expect("lock poisoned").len();
        format!("MemoryElement({len} bytes)")
    }

    fn cache(&self) -> &ContentCache {
        &self.cache
    }
}

impl Configurable for MemoryElement {
    fn plugin_name(&self) -> &'static str {
        <Self as Plugin<dyn DataElement>>::NAME
    }

    fn get_config(&self) -> ConfigMap {
        let bytes = self.bytes.read().expect("lock poisoned");
        let mut config = ConfigMap::new();
        config.insert("bytes".into(), Value::String(STANDARD.encode(&*bytes)));
        config.insert("content_type".into(), json!(self.content_type));
        config.insert("readonly".into(), Value::Bool(self.readonly));
        config
    }
}

impl Plugin<dyn DataElement> for MemoryElement {
    const NAME: &'static str = "MemoryElement";

    fn default_config() -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("bytes".into(), Value::Null);
        config.insert("content_type".into(), Value::Null);
        config.insert("readonly".into(), Value::Bool(false));
        config
    }

    fn from_config(config: &ConfigMap, _plugins: &Plugins) -> Result<Self, BoxError> {
        let bytes = match config.get("bytes") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(encoded)) => decode_base64(encoded)?,
            Some(other) => return Err(format!("\"bytes\" must be base64 text or null, got {other}").into()),
        };
        let content_type = optional_string(config, "content_type")?;
        let readonly = config.get("readonly").and_then(Value::as_bool).unwrap_or(false);
        Ok(Self::new(bytes, content_type).with_readonly(readonly))
    }

    fn into_contract(self) -> Box<dyn DataElement> {
        Box::new(self)
    }
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = encoded
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    STANDARD.decode(normalized)
}

fn is_mime_like(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+' | '.'))
}

/// Read an optional string parameter, rejecting other JSON types.
pub(crate) fn optional_string(config: &ConfigMap, key: &str) -> Result<Option<String>, BoxError> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(format!("{key:?} must be a string or null, got {other}").into()),
    }
}
