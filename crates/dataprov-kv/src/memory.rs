use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use dataprov_element::DataElement;
use dataprov_plugin::{BoxError, Configurable, Plugin, PluginDescriptor, Plugins};
use dataprov_types::{ConfigMap, Key, Value};
use serde_json::json;
use tracing::debug;

use crate::error::{KvError, KvResult};
use crate::traits::KeyValueStore;

type Table = BTreeMap<Key, Value>;

/// Key-value store held in memory.
///
/// With a cache element the whole table is written to it as JSON after every
/// mutation and read back at construction, so a file-backed cache element
/// makes the store durable. A cache element that is not writable makes the
/// store read-only. Single process only: two instances over the same cache
/// element overwrite each other.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    table: RwLock<Table>,
    cache_element: Option<Arc<dyn DataElement>>,
}

impl MemoryKeyValueStore {
    /// An empty store that lives only as long as the process.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store persisted into `element`, loading any table it already holds.
    pub fn with_cache_element(element: Arc<dyn DataElement>) -> KvResult<Self> {
        let table = load_table(element.as_ref())?;
        debug!(entries = table.len(), cache = %element.locator(), "loaded key-value table");
        Ok(Self {
            table: RwLock::new(table),
            cache_element: Some(element),
        })
    }

    pub fn cache_element(&self) -> Option<&Arc<dyn DataElement>> {
        self.cache_element.as_ref()
    }

    /// Apply `f` to the table and persist the result. On failure the table
    /// is left unchanged.
    fn mutate<R>(&self, f: impl FnOnce(&mut Table) -> KvResult<R>) -> KvResult<R> {
        self.ensure_writable()?;
        let mut table = self.table.write().expect("lock poisoned");
        let Some(element) = &self.cache_element else {
            return f(&mut *table);
        };
        let mut next = table.clone();
        let out = f(&mut next)?;
        element.set_bytes(&encode_table(&next))?;
        *table = next;
        Ok(out)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn count(&self) -> KvResult<usize> {
        Ok(self.table.read().expect("lock poisoned").len())
    }

    fn keys(&self) -> KvResult<Vec<Key>> {
        Ok(self.table.read().expect("lock poisoned").keys().cloned().collect())
    }

    fn is_read_only(&self) -> bool {
        self.cache_element.as_ref().is_some_and(|e| !e.writable())
    }

    fn lookup(&self, key: &Key) -> KvResult<Option<Value>> {
        Ok(self.table.read().expect("lock poisoned").get(key).cloned())
    }

    fn set(&self, key: Key, value: Value) -> KvResult<()> {
        self.mutate(|table| {
            table.insert(key, value);
            Ok(())
        })
    }

    fn set_many(&self, entries: Vec<(Key, Value)>) -> KvResult<()> {
        self.mutate(|table| {
            table.extend(entries);
            Ok(())
        })
    }

    fn remove(&self, key: &Key) -> KvResult<()> {
        self.mutate(|table| {
            table
                .remove(key)
                .map(drop)
                .ok_or_else(|| KvError::KeyNotFound(key.clone()))
        })
    }

    fn remove_many(&self, keys: &[Key]) -> KvResult<()> {
        self.mutate(|table| {
            if let Some(missing) = keys.iter().find(|k| !table.contains_key(*k)) {
                return Err(KvError::KeyNotFound(missing.clone()));
            }
            for key in keys {
                table.remove(key);
            }
            Ok(())
        })
    }

    fn clear(&self) -> KvResult<()> {
        self.mutate(|table| {
            table.clear();
            Ok(())
        })
    }
}

impl Configurable for MemoryKeyValueStore {
    fn plugin_name(&self) -> &'static str {
        <Self as Plugin<dyn KeyValueStore>>::NAME
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

impl Plugin<dyn KeyValueStore> for MemoryKeyValueStore {
    const NAME: &'static str = "MemoryKeyValueStore";

    fn default_config() -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("cache_element".into(), json!({ "type": null }));
        config
    }

    fn from_config(config: &ConfigMap, plugins: &Plugins) -> Result<Self, BoxError> {
        match plugins.resolve_optional::<dyn DataElement>(config.get("cache_element"))? {
            Some(element) => Ok(Self::with_cache_element(Arc::from(element))?),
            None => Ok(Self::new()),
        }
    }

    fn into_contract(self) -> Box<dyn KeyValueStore> {
        Box::new(self)
    }
}

/// Serialize as a list of `[key, value]` pairs; JSON object keys would have
/// to be strings.
fn encode_table(table: &Table) -> Vec<u8> {
    let pairs: Vec<(&Key, &Value)> = table.iter().collect();
    serde_json::to_vec(&pairs).unwrap_or_else(|_| unreachable!("keys and values always serialize"))
}

fn load_table(element: &dyn DataElement) -> KvResult<Table> {
    let bytes = element.get_bytes()?;
    if bytes.is_empty() {
        return Ok(Table::new());
    }
    let pairs: Vec<(Key, Value)> = serde_json::from_slice(&bytes).map_err(|e| KvError::Store {
        store: element.locator(),
        reason: format!("cache element does not hold a key-value table: {e}"),
    })?;
    Ok(pairs.into_iter().collect())
}
