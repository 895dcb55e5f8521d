use std::sync::Arc;

use dataprov_plugin::{PluginDescriptor, PluginResult, Plugins, PluginsBuilder};

use crate::backend::{BackendElement, ByteBackend, InMemoryBackend, DEFAULT_BACKEND};
use crate::file::FileElement;
use crate::memory::MemoryElement;
use crate::traits::DataElement;
use crate::url::UrlElement;

/// Register every built-in element plugin, plus the default in-memory
/// [`ByteBackend`] under [`DEFAULT_BACKEND`].
pub fn register_plugins(builder: &mut PluginsBuilder) -> &mut PluginsBuilder {
    let backend: Arc<dyn ByteBackend> = Arc::new(InMemoryBackend::new());
    builder
        .register::<dyn DataElement, MemoryElement>()
        .register::<dyn DataElement, FileElement>()
        .register::<dyn DataElement, BackendElement>()
        .register::<dyn DataElement, UrlElement>()
        .collaborator(DEFAULT_BACKEND, backend)
}

/// Resolve an element descriptor into a shareable handle.
pub fn resolve_element(plugins: &Plugins, descriptor: &PluginDescriptor) -> PluginResult<Arc<dyn DataElement>> {
    plugins.resolve::<dyn DataElement>(descriptor).map(Arc::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataprov_plugin::Configurable;

    fn plugins() -> Plugins {
        let mut builder = Plugins::builder();
        register_plugins(&mut builder);
        builder.build()
    }

    #[test]
    fn discovery_lists_builtin_elements() {
        let discovery = plugins().discover::<dyn DataElement>().unwrap();
        assert!(discovery.rejected.is_empty());
        for name in ["MemoryElement", "FileElement", "BackendElement"] {
            assert!(discovery.is_available(name), "{name}");
        }
        let url_listed = discovery.is_available("UrlElement");
        assert_eq!(url_listed, cfg!(feature = "http"));
        if !url_listed {
            assert_eq!(discovery.unusable[0].0, "UrlElement");
        }
    }

    #[test]
    fn descriptor_roundtrip_rebuilds_handle() {
        let plugins = plugins();
        let original = MemoryElement::read_only(b"hello".to_vec(), Some("text/plain".into()));
        let rebuilt = resolve_element(&plugins, &original.to_descriptor()).unwrap();
        assert!(rebuilt.content_eq(&original).unwrap());
        assert!(!rebuilt.writable());
    }

    #[test]
    fn backend_element_uses_registered_default_backend() {
        let plugins = plugins();
        let descriptor: PluginDescriptor = serde_json::from_value(serde_json::json!({
            "type": "BackendElement",
            "BackendElement": {"locator": "a/b"}
        }))
        .unwrap();
        let writer = resolve_element(&plugins, &descriptor).unwrap();
        writer.set_bytes(b"shared").unwrap();
        let reader = resolve_element(&plugins, &descriptor).unwrap();
        assert_eq!(reader.get_bytes().unwrap(), b"shared");
    }

    #[test]
    fn default_config_template_has_no_selection() {
        let template = plugins().make_default_config::<dyn DataElement>().unwrap();
        assert_eq!(template.selected(), None);
        assert!(template.params("MemoryElement").is_some());
        assert!(template.params("FileElement").unwrap().contains_key("filepath"));
    }
}
