use std::sync::Arc;

use dataprov_plugin::{PluginDescriptor, PluginResult, Plugins, PluginsBuilder};

use crate::memory::MemoryKeyValueStore;
use crate::traits::KeyValueStore;

/// Register every built-in key-value store plugin.
pub fn register_plugins(builder: &mut PluginsBuilder) -> &mut PluginsBuilder {
    builder.register::<dyn KeyValueStore, MemoryKeyValueStore>()
}

/// Resolve a key-value store descriptor into a shareable handle.
pub fn resolve_kv_store(plugins: &Plugins, descriptor: &PluginDescriptor) -> PluginResult<Arc<dyn KeyValueStore>> {
    plugins.resolve::<dyn KeyValueStore>(descriptor).map(Arc::from)
}
