use std::sync::Arc;

use dataprov_element::{resolve_element, DataElement};
use dataprov_kv::{KeyValueStore, KvError, MemoryKeyValueStore};
use dataprov_plugin::{BoxError, Configurable, Plugin, PluginDescriptor, Plugins};
use dataprov_types::{ConfigMap, ElementKey, Key, Value};
use serde_json::json;

use crate::error::{SetError, SetResult};
use crate::traits::DataSet;

/// Data set stored in any [`KeyValueStore`].
///
/// Each element's descriptor is stored under its key; `get` rebuilds the
/// element through the element registry. Only handles are stored, so
/// elements whose content lives elsewhere stay there.
pub struct KvsDataSet {
    kvstore: Arc<dyn KeyValueStore>,
    plugins: Plugins,
}

impl KvsDataSet {
    pub fn new(kvstore: Arc<dyn KeyValueStore>, plugins: Plugins) -> Self {
        Self { kvstore, plugins }
    }

    pub fn kvstore(&self) -> &Arc<dyn KeyValueStore> {
        &self.kvstore
    }

    fn map_kv_err(&self, err: KvError) -> SetError {
        match err {
            KvError::ReadOnly { store } => SetError::ReadOnly {
                set: format!("KvsDataSet over {store}"),
            },
            other => SetError::Kv(other),
        }
    }
}

impl std::fmt::Debug for KvsDataSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvsDataSet").field("kvstore", &self.kvstore).finish()
    }
}

impl DataSet for KvsDataSet {
    fn count(&self) -> SetResult<usize> {
        Ok(self.keys()?.len())
    }

    fn keys(&self) -> SetResult<Vec<ElementKey>> {
        let mut keys: Vec<ElementKey> = self
            .kvstore
            .keys()
            .map_err(|e| self.map_kv_err(e))?
            .into_iter()
            .filter_map(|k| match k {
                Key::Str(s) => Some(ElementKey::new(s)),
                _ => None,
            })
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn has_key(&self, key: &ElementKey) -> SetResult<bool> {
        self.kvstore.has(&Key::from(key)).map_err(|e| self.map_kv_err(e))
    }

    fn add_many(&self, elements: Vec<Arc<dyn DataElement>>) -> SetResult<()> {
        let entries = elements
            .iter()
            .map(|e| -> SetResult<(Key, Value)> { Ok((Key::from(&e.uuid()?), e.to_descriptor().to_value())) })
            .collect::<SetResult<Vec<_>>>()?;
        self.kvstore.set_many(entries).map_err(|e| self.map_kv_err(e))
    }

    fn get(&self, key: &ElementKey) -> SetResult<Arc<dyn DataElement>> {
        let value = self
            .kvstore
            .lookup(&Key::from(key))
            .map_err(|e| self.map_kv_err(e))?
            .ok_or_else(|| SetError::KeyNotFound(key.clone()))?;
        let descriptor = match value {
            Value::Object(map) => PluginDescriptor::from_config_map("data_element", &map),
            other => {
                return Err(SetError::Store {
                    set: "KvsDataSet".into(),
                    reason: format!("entry {key} is not a descriptor: {other}"),
                })
            }
        }
        .map_err(|e| SetError::Store {
            set: "KvsDataSet".into(),
            reason: format!("entry {key}: {e}"),
        })?;
        Ok(resolve_element(&self.plugins, &descriptor)?)
    }

    fn remove(&self, key: &ElementKey) -> SetResult<()> {
        match self.kvstore.remove(&Key::from(key)) {
            Err(KvError::KeyNotFound(_)) => Err(SetError::KeyNotFound(key.clone())),
            other => other.map_err(|e| self.map_kv_err(e)),
        }
    }
}

impl Configurable for KvsDataSet {
    fn plugin_name(&self) -> &'static str {
        <Self as Plugin<dyn DataSet>>::NAME
    }

    fn get_config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("kvstore".into(), self.kvstore.to_descriptor().to_value());
        config
    }
}

impl Plugin<dyn DataSet> for KvsDataSet {
    const NAME: &'static str = "KvsDataSet";

    fn default_config() -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert(
            "kvstore".into(),
            json!({
                "type": <MemoryKeyValueStore as Plugin<dyn KeyValueStore>>::NAME,
                <MemoryKeyValueStore as Plugin<dyn KeyValueStore>>::NAME: MemoryKeyValueStore::default_config(),
            }),
        );
        config
    }

    fn from_config(config: &ConfigMap, plugins: &Plugins) -> Result<Self, BoxError> {
        let kvstore = plugins
            .resolve_optional::<dyn KeyValueStore>(config.get("kvstore"))?
            .ok_or("\"kvstore\" must select a key-value store")?;
        Ok(Self::new(Arc::from(kvstore), plugins.clone()))
    }

    fn into_contract(self) -> Box<dyn DataSet> {
        Box::new(self)
    }
}
