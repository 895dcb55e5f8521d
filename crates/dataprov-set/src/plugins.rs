use std::sync::Arc;

use dataprov_plugin::{PluginDescriptor, PluginResult, Plugins, PluginsBuilder};

use crate::file::FileDataSet;
use crate::kvstore::KvsDataSet;
use crate::memory::MemoryDataSet;
use crate::traits::DataSet;

/// Register every built-in data set plugin.
///
/// Stored elements are rebuilt through the element registry, so the
/// element plugins must be registered on the same builder.
pub fn register_plugins(builder: &mut PluginsBuilder) -> &mut PluginsBuilder {
    builder
        .register::<dyn DataSet, MemoryDataSet>()
        .register::<dyn DataSet, KvsDataSet>()
        .register::<dyn DataSet, FileDataSet>()
}

/// Resolve a data set descriptor into a shareable handle.
pub fn resolve_data_set(plugins: &Plugins, descriptor: &PluginDescriptor) -> PluginResult<Arc<dyn DataSet>> {
    plugins.resolve::<dyn DataSet>(descriptor).map(Arc::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataprov_element::{DataElement, MemoryElement};
    use dataprov_plugin::{Configurable, PluginError};
    use dataprov_types::ConfigMap;
    use serde_json::json;

    fn plugins() -> Plugins {
        let mut builder = Plugins::builder();
        dataprov_element::register_plugins(&mut builder);
        dataprov_kv::register_plugins(&mut builder);
        register_plugins(&mut builder);
        builder.build()
    }

    #[test]
    fn discovery_lists_builtin_sets() {
        let discovery = plugins().discover::<dyn DataSet>().unwrap();
        assert_eq!(discovery.available, ["MemoryDataSet", "KvsDataSet", "FileDataSet"]);
    }

    #[test]
    fn resolves_kvs_set_from_descriptor() {
        let plugins = plugins();
        let descriptor = PluginDescriptor::selecting("KvsDataSet", ConfigMap::new());
        let set = resolve_data_set(&plugins, &descriptor).unwrap();
        assert_eq!(set.plugin_name(), "KvsDataSet");

        let e: Arc<dyn DataElement> = Arc::new(MemoryElement::new(b"hi".to_vec(), None));
        set.add(e.clone()).unwrap();
        assert!(set.contains(e.as_ref()).unwrap());
    }

    #[test]
    fn descriptor_roundtrip_rebuilds_file_set() {
        let dir = tempfile::tempdir().unwrap();
        let plugins = plugins();
        let mut params = ConfigMap::new();
        params.insert("root_directory".into(), json!(dir.path().to_string_lossy()));
        let set = resolve_data_set(&plugins, &PluginDescriptor::selecting("FileDataSet", params)).unwrap();
        set.add(Arc::new(MemoryElement::new(b"kept".to_vec(), None))).unwrap();

        let rebuilt = resolve_data_set(&plugins, &set.to_descriptor()).unwrap();
        assert_eq!(rebuilt.keys().unwrap(), set.keys().unwrap());
    }

    #[test]
    fn file_set_without_root_fails_construction() {
        let err = resolve_data_set(&plugins(), &PluginDescriptor::selecting("FileDataSet", ConfigMap::new()))
            .unwrap_err();
        assert!(matches!(err, PluginError::Construction { .. }));
    }
}
