use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use dataprov_element::{resolve_element, DataElement};
use dataprov_kv::{resolve_kv_store, KeyValueStore};
use dataprov_plugin::{Contract, Discovery, PluginConfig, PluginDescriptor, Plugins};
use dataprov_set::{resolve_data_set, DataSet};
use tracing::debug;

use crate::builtin::builtin_plugins;
use crate::error::{ProviderError, ProviderResult};

/// High-level entry point: a plugin table plus the configuration selecting
/// one implementation per contract.
#[derive(Debug, Clone)]
pub struct Provider {
    plugins: Plugins,
    config: PluginConfig,
}

impl Provider {
    /// A provider over the built-in plugins.
    pub fn new(config: PluginConfig) -> Self {
        Self::with_plugins(builtin_plugins(), config)
    }

    /// A provider over a custom plugin table.
    pub fn with_plugins(plugins: Plugins, config: PluginConfig) -> Self {
        Self { plugins, config }
    }

    /// Load the configuration from a `.json` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = PluginConfig::load(path)
            .with_context(|| format!("failed to load provider configuration from {}", path.display()))?;
        debug!(path = %path.display(), contracts = ?config.contracts().collect::<Vec<_>>(), "loaded provider configuration");
        Ok(Self::new(config))
    }

    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Template configuration listing every usable plugin's defaults for
    /// every contract, with nothing selected.
    pub fn default_config(&self) -> ProviderResult<PluginConfig> {
        let mut config = PluginConfig::new();
        config
            .insert(
                <dyn DataElement as Contract>::NAME,
                self.plugins.make_default_config::<dyn DataElement>()?,
            )
            .insert(<dyn DataSet as Contract>::NAME, self.plugins.make_default_config::<dyn DataSet>()?)
            .insert(
                <dyn KeyValueStore as Contract>::NAME,
                self.plugins.make_default_config::<dyn KeyValueStore>()?,
            );
        Ok(config)
    }

    /// Discovery reports for every contract.
    pub fn discover(&self) -> ProviderResult<Vec<Discovery>> {
        Ok(vec![
            self.plugins.discover::<dyn DataElement>()?,
            self.plugins.discover::<dyn DataSet>()?,
            self.plugins.discover::<dyn KeyValueStore>()?,
        ])
    }

    /// The configured data element.
    pub fn element(&self) -> ProviderResult<Arc<dyn DataElement>> {
        Ok(resolve_element(&self.plugins, self.section::<dyn DataElement>()?)?)
    }

    /// The configured data set.
    pub fn data_set(&self) -> ProviderResult<Arc<dyn DataSet>> {
        Ok(resolve_data_set(&self.plugins, self.section::<dyn DataSet>()?)?)
    }

    /// The configured key-value store.
    pub fn kv_store(&self) -> ProviderResult<Arc<dyn KeyValueStore>> {
        Ok(resolve_kv_store(&self.plugins, self.section::<dyn KeyValueStore>()?)?)
    }

    /// Build an element from a URI using the built-in resolvers.
    pub fn element_from_uri(&self, uri: &str) -> ProviderResult<Arc<dyn DataElement>> {
        Ok(Arc::from(dataprov_element::from_uri(uri)?))
    }

    fn section<C: Contract + ?Sized>(&self) -> ProviderResult<&PluginDescriptor> {
        self.config
            .get(C::NAME)
            .ok_or(ProviderError::Unconfigured { contract: C::NAME })
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::new(PluginConfig::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataprov_element::{ElementError, MemoryElement};
    use dataprov_kv::KvError;
    use dataprov_plugin::{Configurable, PluginError};
    use dataprov_types::Key;
    use serde_json::json;

    fn provider(json: &str) -> Provider {
        Provider::new(PluginConfig::from_json_str(json).unwrap())
    }

    // ----------------------------------------------------------------
    // Scenarios
    // ----------------------------------------------------------------

    #[test]
    fn read_only_hello_element() {
        let e = MemoryElement::read_only(b"hello".to_vec(), None);
        assert_eq!(e.sha1().unwrap().to_hex(), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        assert!(matches!(e.set_bytes(b"x"), Err(ElementError::ReadOnly { .. })));
        assert_eq!(e.get_bytes().unwrap(), b"hello");
    }

    #[test]
    fn empty_memory_kv_store() {
        let p = provider(r#"{"key_value_store": {"type": "MemoryKeyValueStore"}}"#);
        let kv = p.kv_store().unwrap();
        assert!(matches!(kv.get(&Key::from("x")), Err(KvError::KeyNotFound(_))));
        assert_eq!(kv.get_or(&Key::from("x"), json!(0)).unwrap(), json!(0));
        kv.set(Key::from("x"), json!(5)).unwrap();
        assert_eq!(kv.get(&Key::from("x")).unwrap(), json!(5));
    }

    #[test]
    fn data_set_double_add_keeps_count() {
        let p = provider(r#"{"data_set": {"type": "MemoryDataSet"}}"#);
        let set = p.data_set().unwrap();
        let e: Arc<dyn DataElement> = Arc::new(MemoryElement::new(b"abc".to_vec(), None));
        set.add(e.clone()).unwrap();
        set.add(e).unwrap();
        assert_eq!(set.count().unwrap(), 1);
        assert_eq!(set.keys().unwrap().len(), set.count().unwrap());
    }

    // ----------------------------------------------------------------
    // Resolution
    // ----------------------------------------------------------------

    #[test]
    fn resolves_every_contract_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data.bin");
        std::fs::write(&data, b"on disk").unwrap();
        let config_path = dir.path().join("provider.toml");
        std::fs::write(
            &config_path,
            format!(
                r#"
[data_element]
type = "FileElement"
[data_element.FileElement]
filepath = "{}"

[data_set]
type = "FileDataSet"
[data_set.FileDataSet]
root_directory = "{}"
sha1_chunk = 4

[key_value_store]
type = "MemoryKeyValueStore"
"#,
                data.display(),
                dir.path().join("set").display()
            ),
        )
        .unwrap();

        let p = Provider::load(&config_path).unwrap();
        let element = p.element().unwrap();
        assert_eq!(element.get_bytes().unwrap(), b"on disk");
        assert_eq!(element.plugin_name(), "FileElement");

        let set = p.data_set().unwrap();
        set.add(element.clone()).unwrap();
        assert!(set.contains(element.as_ref()).unwrap());
        assert_eq!(p.kv_store().unwrap().count().unwrap(), 0);
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = Provider::load(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("nope.json"));
    }

    #[test]
    fn missing_section_is_unconfigured() {
        let p = Provider::default();
        assert!(matches!(p.element(), Err(ProviderError::Unconfigured { contract: "data_element" })));
    }

    #[test]
    fn unknown_plugin_lists_available() {
        let p = provider(r#"{"data_set": {"type": "NoSuchSet"}}"#);
        match p.data_set() {
            Err(ProviderError::Plugin(PluginError::NotFound { available, .. })) => {
                assert!(available.iter().any(|name| name == "MemoryDataSet"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn elements_from_uris() {
        let p = Provider::default();
        let e = p.element_from_uri("base64://aGVsbG8=").unwrap();
        assert_eq!(e.get_bytes().unwrap(), b"hello");
        assert!(p.element_from_uri("gopher://nowhere").is_err());
    }

    // ----------------------------------------------------------------
    // Discovery and templates
    // ----------------------------------------------------------------

    #[test]
    fn discovery_covers_every_contract() {
        let reports = Provider::default().discover().unwrap();
        let contracts: Vec<_> = reports.iter().map(|d| d.contract).collect();
        assert_eq!(contracts, ["data_element", "data_set", "key_value_store"]);
        assert!(reports.iter().all(|d| d.rejected.is_empty()));
    }

    #[test]
    fn default_config_selects_nothing_and_roundtrips() {
        let p = Provider::default();
        let config = p.default_config().unwrap();
        let sets = config.get("data_set").unwrap();
        assert_eq!(sets.selected(), None);
        assert!(sets.implementations().any(|name| name == "KvsDataSet"));

        let flat = config.to_flat().unwrap();
        assert_eq!(PluginConfig::from_flat(&flat).unwrap(), config);
    }

    #[test]
    fn selecting_from_the_template_resolves() {
        let p = Provider::default();
        let mut config = p.default_config().unwrap();
        let template = config.get("data_set").unwrap().clone();
        config.insert("data_set", template.select("KvsDataSet"));

        let set = Provider::new(config).data_set().unwrap();
        assert_eq!(set.plugin_name(), "KvsDataSet");
        assert_eq!(set.get_config()["kvstore"]["type"], json!("MemoryKeyValueStore"));
    }
}
