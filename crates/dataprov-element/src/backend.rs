use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use dataprov_plugin::{BoxError, Configurable, Plugin, Plugins};
use dataprov_types::{ConfigMap, Value};
use serde_json::json;
use tracing::debug;

use crate::cache::ContentCache;
use crate::error::{ElementError, ElementResult};
use crate::memory::optional_string;
use crate::traits::DataElement;

/// Name under which the default in-memory backend is registered.
pub const DEFAULT_BACKEND: &str = "memory";

/// Byte storage addressed by locator: an object store, a database column,
/// a distributed hash table.
///
/// All I/O errors are propagated, never silently ignored.
pub trait ByteBackend: Send + Sync {
    /// Read the content at `locator`.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    fn read(&self, locator: &str) -> ElementResult<Option<Vec<u8>>>;

    /// Store `data` at `locator`, replacing any previous content.
    fn write(&self, locator: &str, data: &[u8]) -> ElementResult<()>;

    /// Check whether anything is stored at `locator`.
    fn exists(&self, locator: &str) -> ElementResult<bool>;

    /// Delete the content at `locator`. Returns `true` if it existed.
    fn delete(&self, locator: &str) -> ElementResult<bool>;
}

/// In-memory, HashMap-based byte backend.
///
/// Intended for tests and embedding. Content is held behind a `RwLock` and
/// cloned on read and write.
pub struct InMemoryBackend {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of locators currently holding content.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the backend is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Sorted list of every locator.
    pub fn locators(&self) -> Vec<String> {
        let map = self.objects.read().expect("lock poisoned");
        let mut locators: Vec<String> = map.keys().cloned().collect();
        locators.sort();
        locators
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteBackend for InMemoryBackend {
    fn read(&self, locator: &str) -> ElementResult<Option<Vec<u8>>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(locator).cloned())
    }

    fn write(&self, locator: &str, data: &[u8]) -> ElementResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert(locator.to_string(), data.to_vec());
        Ok(())
    }

    fn exists(&self, locator: &str) -> ElementResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(locator))
    }

    fn delete(&self, locator: &str) -> ElementResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(locator).is_some())
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("object_count", &self.len())
            .finish()
    }
}

/// Element whose content lives at a locator inside a named [`ByteBackend`].
///
/// The backend is a collaborator registered with
/// [`PluginsBuilder::collaborator`](dataprov_plugin::PluginsBuilder::collaborator)
/// as an `Arc<dyn ByteBackend>`; only its name is serialized.
pub struct BackendElement {
    backend_name: String,
    backend: Arc<dyn ByteBackend>,
    locator: String,
    content_type: Option<String>,
    readonly: bool,
    cache: ContentCache,
}

impl BackendElement {
    pub fn new(
        backend_name: impl Into<String>,
        backend: Arc<dyn ByteBackend>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            backend_name: backend_name.into(),
            backend,
            locator: locator.into(),
            content_type: None,
            readonly: false,
            cache: ContentCache::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Whether the backend currently holds content at this locator.
    pub fn exists(&self) -> ElementResult<bool> {
        self.backend.exists(&self.locator)
    }

    /// Remove the content from the backend. The handle stays valid; later
    /// reads fail until content is written again.
    pub fn delete(&self) -> ElementResult<bool> {
        if self.readonly {
            return Err(ElementError::ReadOnly {
                element: self.locator(),
            });
        }
        let existed = self.backend.delete(&self.locator)?;
        self.cache.invalidate();
        Ok(existed)
    }
}

impl std::fmt::Debug for BackendElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendElement")
            .field("backend", &self.backend_name)
            .field("locator", &self.locator)
            .field("content_type", &self.content_type)
            .field("readonly", &self.readonly)
            .finish()
    }
}

impl DataElement for BackendElement {
    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn get_bytes(&self) -> ElementResult<Vec<u8>> {
        self.backend
            .read(&self.locator)?
            .ok_or_else(|| ElementError::retrieval(self.locator(), "no content at locator"))
    }

    fn writable(&self) -> bool {
        !self.readonly
    }

    fn store_bytes(&self, data: &[u8]) -> ElementResult<()> {
        debug!(backend = %self.backend_name, locator = %self.locator, bytes = data.len(), "writing to backend");
        self.backend.write(&self.locator, data)
    }

    fn locator(&self) -> String {
        format!("{}:{}", self.backend_name, self.locator)
    }

    fn cache(&self) -> &ContentCache {
        &self.cache
    }
}

impl Configurable for BackendElement {
    fn plugin_name(&self) -> &'static str {
        <Self as Plugin<dyn DataElement>>::NAME
    }

    fn get_config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("backend".into(), Value::String(self.backend_name.clone()));
        config.insert("locator".into(), Value::String(self.locator.clone()));
        config.insert("content_type".into(), json!(self.content_type));
        config.insert("readonly".into(), Value::Bool(self.readonly));
        config
    }
}

impl Plugin<dyn DataElement> for BackendElement {
    const NAME: &'static str = "BackendElement";

    fn default_config() -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("backend".into(), Value::String(DEFAULT_BACKEND.into()));
        config.insert("locator".into(), Value::Null);
        config.insert("content_type".into(), Value::Null);
        config.insert("readonly".into(), Value::Bool(false));
        config
    }

    fn from_config(config: &ConfigMap, plugins: &Plugins) -> Result<Self, BoxError> {
        let backend_name = optional_string(config, "backend")?.unwrap_or_else(|| DEFAULT_BACKEND.to_string());
        let locator = optional_string(config, "locator")?
            .filter(|l| !l.is_empty())
            .ok_or("\"locator\" is required")?;
        let backend = plugins.require_collaborator::<Arc<dyn ByteBackend>>(&backend_name)?;
        let readonly = config.get("readonly").and_then(Value::as_bool).unwrap_or(false);
        let mut element = Self::new(backend_name, backend, locator).with_readonly(readonly);
        element.content_type = optional_string(config, "content_type")?;
        Ok(element)
    }

    fn into_contract(self) -> Box<dyn DataElement> {
        Box::new(self)
    }
}
