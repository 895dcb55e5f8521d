use dataprov_plugin::{Plugins, PluginsBuilder};

/// Register every built-in plugin of every contract.
pub fn register_builtin_plugins(builder: &mut PluginsBuilder) -> &mut PluginsBuilder {
    dataprov_element::register_plugins(builder);
    dataprov_kv::register_plugins(builder);
    dataprov_set::register_plugins(builder)
}

/// The plugin table with every built-in plugin registered.
pub fn builtin_plugins() -> Plugins {
    let mut builder = Plugins::builder();
    register_builtin_plugins(&mut builder);
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataprov_element::DataElement;
    use dataprov_kv::KeyValueStore;
    use dataprov_set::DataSet;

    #[test]
    fn registers_every_contract() {
        let plugins = builtin_plugins();
        assert_eq!(plugins.contracts(), ["data_element", "data_set", "key_value_store"]);
        assert!(plugins.registry::<dyn DataElement>().is_some());
        assert!(plugins.registry::<dyn DataSet>().is_some());
        assert!(plugins.registry::<dyn KeyValueStore>().is_some());
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn url_element_is_excluded_without_http() {
        let discovery = builtin_plugins().discover::<dyn DataElement>().unwrap();
        assert_eq!(discovery.available, ["MemoryElement", "FileElement", "BackendElement"]);
        assert_eq!(discovery.unusable.len(), 1);
        assert_eq!(discovery.unusable[0].0, "UrlElement");
        assert!(discovery.rejected.is_empty());
    }
}
