use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use dataprov_element::{resolve_element, DataElement};
use dataprov_plugin::{BoxError, Configurable, Plugin, PluginDescriptor, Plugins};
use dataprov_types::{ConfigMap, ElementKey, Value};
use serde_json::json;
use tracing::debug;

use crate::error::{SetError, SetResult};
use crate::traits::DataSet;

type ElementMap = BTreeMap<ElementKey, Arc<dyn DataElement>>;

/// Data set held in memory.
///
/// An optional cache element receives a JSON object mapping each key to its
/// element's descriptor after every mutation; the set is reloaded from it at
/// construction. A cache element that is not writable makes the set
/// read-only.
#[derive(Debug, Default)]
pub struct MemoryDataSet {
    elements: RwLock<ElementMap>,
    cache_element: Option<Arc<dyn DataElement>>,
}

impl MemoryDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set persisted into `element`. Stored descriptors are resolved
    /// through `plugins`.
    pub fn with_cache_element(element: Arc<dyn DataElement>, plugins: &Plugins) -> SetResult<Self> {
        let elements = load_elements(element.as_ref(), plugins)?;
        debug!(elements = elements.len(), cache = %element.locator(), "loaded memory data set");
        Ok(Self {
            elements: RwLock::new(elements),
            cache_element: Some(element),
        })
    }

    pub fn cache_element(&self) -> Option<&Arc<dyn DataElement>> {
        self.cache_element.as_ref()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut ElementMap) -> SetResult<R>) -> SetResult<R> {
        let Some(cache) = &self.cache_element else {
            let mut elements = self.elements.write().expect("lock poisoned");
            return f(&mut *elements);
        };
        if !cache.writable() {
            return Err(SetError::ReadOnly {
                set: format!("MemoryDataSet cached in {}", cache.locator()),
            });
        }
        let mut elements = self.elements.write().expect("lock poisoned");
        let mut next = elements.clone();
        let out = f(&mut next)?;
        cache.set_bytes(&encode_elements(&next))?;
        *elements = next;
        Ok(out)
    }
}

impl DataSet for MemoryDataSet {
    fn count(&self) -> SetResult<usize> {
        Ok(self.elements.read().expect("lock poisoned").len())
    }

    fn keys(&self) -> SetResult<Vec<ElementKey>> {
        Ok(self.elements.read().expect("lock poisoned").keys().cloned().collect())
    }

    fn has_key(&self, key: &ElementKey) -> SetResult<bool> {
        Ok(self.elements.read().expect("lock poisoned").contains_key(key))
    }

    fn add_many(&self, elements: Vec<Arc<dyn DataElement>>) -> SetResult<()> {
        let keyed = elements
            .into_iter()
            .map(|e| e.uuid().map(|key| (key, e)))
            .collect::<Result<Vec<_>, _>>()?;
        self.mutate(|map| {
            map.extend(keyed);
            Ok(())
        })
    }

    fn get(&self, key: &ElementKey) -> SetResult<Arc<dyn DataElement>> {
        self.elements
            .read()
            .expect("lock poisoned")
            .get(key)
            .cloned()
            .ok_or_else(|| SetError::KeyNotFound(key.clone()))
    }

    fn remove(&self, key: &ElementKey) -> SetResult<()> {
        self.mutate(|map| {
            map.remove(key)
                .map(drop)
                .ok_or_else(|| SetError::KeyNotFound(key.clone()))
        })
    }
}

impl Configurable for MemoryDataSet {
    fn plugin_name(&self) -> &'static str {
        <Self as Plugin<dyn DataSet>>::NAME
    }

    fn get_config(&self) -> ConfigMap {
        let cache = match &self.cache_element {
            Some(element) => element.to_descriptor(),
            None => PluginDescriptor::new(),
        };
        let mut config = ConfigMap::new();
        config.insert("cache_element".into(), cache.to_value());
        config
    }
}

impl Plugin<dyn DataSet> for MemoryDataSet {
    const NAME: &'static str = "MemoryDataSet";

    fn default_config() -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("cache_element".into(), json!({ "type": null }));
        config
    }

    fn from_config(config: &ConfigMap, plugins: &Plugins) -> Result<Self, BoxError> {
        match plugins.resolve_optional::<dyn DataElement>(config.get("cache_element"))? {
            Some(element) => Ok(Self::with_cache_element(Arc::from(element), plugins)?),
            None => Ok(Self::new()),
        }
    }

    fn into_contract(self) -> Box<dyn DataSet> {
        Box::new(self)
    }
}

fn encode_elements(elements: &ElementMap) -> Vec<u8> {
    let table: ConfigMap = elements
        .iter()
        .map(|(key, element)| (key.to_string(), element.to_descriptor().to_value()))
        .collect();
    serde_json::to_vec(&table).unwrap_or_else(|_| unreachable!("descriptors are plain JSON"))
}

fn load_elements(cache: &dyn DataElement, plugins: &Plugins) -> SetResult<ElementMap> {
    let bytes = cache.get_bytes()?;
    if bytes.is_empty() {
        return Ok(ElementMap::new());
    }
    let store_err = |reason: String| SetError::Store {
        set: format!("MemoryDataSet cached in {}", cache.locator()),
        reason,
    };
    let table: ConfigMap = serde_json::from_slice(&bytes)
        .map_err(|e| store_err(format!("cache element does not hold a data set table: {e}")))?;
    table
        .into_iter()
        .map(|(key, value)| -> SetResult<(ElementKey, Arc<dyn DataElement>)> {
            let descriptor: PluginDescriptor = match value {
                Value::Object(map) => PluginDescriptor::from_config_map("data_element", &map)
                    .map_err(|e| store_err(format!("entry {key}: {e}")))?,
                other => return Err(store_err(format!("entry {key}: expected a descriptor, got {other}"))),
            };
            Ok((ElementKey::new(key), resolve_element(plugins, &descriptor)?))
        })
        .collect()
}
