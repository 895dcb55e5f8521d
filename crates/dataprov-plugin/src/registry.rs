use dataprov_types::{flatten_config, merge_config, ConfigMap};
use tracing::{debug, warn};

use crate::descriptor::{PluginDescriptor, TYPE_KEY};
use crate::error::{BoxError, PluginError, PluginResult};
use crate::plugin::{Contract, Plugin, Usability};
use crate::plugins::Plugins;

type Constructor<C> = fn(&ConfigMap, &Plugins) -> Result<Box<C>, BoxError>;

/// One registered plugin type, erased to function pointers.
struct Registration<C: ?Sized> {
    name: &'static str,
    usability: fn() -> Usability,
    default_config: fn() -> ConfigMap,
    construct: Constructor<C>,
}

fn construct<C, P>(config: &ConfigMap, plugins: &Plugins) -> Result<Box<C>, BoxError>
where
    C: Contract + ?Sized,
    P: Plugin<C>,
{
    P::from_config(config, plugins).map(P::into_contract)
}

/// Outcome of discovering the plugins of one contract.
#[derive(Debug)]
pub struct Discovery {
    /// Contract that was discovered.
    pub contract: &'static str,
    /// Valid, usable plugins in registration order.
    pub available: Vec<&'static str>,
    /// Valid plugins that declared themselves unusable, with the reason.
    pub unusable: Vec<(&'static str, String)>,
    /// Registrations that failed validation.
    pub rejected: Vec<PluginError>,
}

impl Discovery {
    /// Returns `true` if `name` is available for use.
    pub fn is_available(&self, name: &str) -> bool {
        self.available.iter().any(|n| *n == name)
    }
}

/// All registered implementations of contract `C`.
pub struct Registry<C: Contract + ?Sized> {
    registrations: Vec<Registration<C>>,
}

impl<C: Contract + ?Sized> Registry<C> {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Register plugin type `P`. Validation is deferred to discovery.
    pub fn register<P: Plugin<C>>(&mut self) -> &mut Self {
        self.registrations.push(Registration {
            name: P::NAME,
            usability: P::usability,
            default_config: P::default_config,
            construct: construct::<C, P>,
        });
        self
    }

    /// Number of registrations, valid or not.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Every registered name in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|r| r.name).collect()
    }

    /// Enumerate the contract's plugins.
    ///
    /// Each registration is checked on its own: an invalid or unusable plugin
    /// is reported and skipped, never failing discovery of the others.
    pub fn discover(&self) -> Discovery {
        let mut discovery = Discovery {
            contract: C::NAME,
            available: Vec::new(),
            unusable: Vec::new(),
            rejected: Vec::new(),
        };
        for (index, registration) in self.registrations.iter().enumerate() {
            if let Err(err) = self.validate(index) {
                warn!(contract = C::NAME, plugin = registration.name, error = %err, "rejecting plugin");
                discovery.rejected.push(err);
                continue;
            }
            match (registration.usability)() {
                Usability::Usable => discovery.available.push(registration.name),
                Usability::Unusable(reason) => {
                    debug!(contract = C::NAME, plugin = registration.name, %reason, "plugin unusable; excluded");
                    discovery.unusable.push((registration.name, reason));
                }
            }
        }
        debug!(
            contract = C::NAME,
            available = discovery.available.len(),
            unusable = discovery.unusable.len(),
            rejected = discovery.rejected.len(),
            "plugin discovery complete"
        );
        discovery
    }

    /// Descriptor template listing the defaults of every available plugin,
    /// with nothing selected.
    pub fn make_default_config(&self) -> PluginDescriptor {
        let discovery = self.discover();
        self.registrations
            .iter()
            .filter(|r| discovery.is_available(r.name))
            .fold(PluginDescriptor::new(), |d, r| d.with_params(r.name, (r.default_config)()))
    }

    /// Default parameters of a named plugin.
    pub fn default_config(&self, name: &str) -> PluginResult<ConfigMap> {
        let index = self.find(name)?;
        Ok((self.registrations[index].default_config)())
    }

    /// Construct the named plugin with `params` merged over its defaults.
    pub fn instantiate(&self, name: &str, params: &ConfigMap, plugins: &Plugins) -> PluginResult<Box<C>> {
        let index = self.find(name)?;
        self.validate(index)?;
        let registration = &self.registrations[index];
        if let Usability::Unusable(reason) = (registration.usability)() {
            return Err(PluginError::Unusable {
                contract: C::NAME,
                name: name.to_string(),
                reason,
            });
        }

        let config = merge_config(&(registration.default_config)(), params);
        debug!(contract = C::NAME, plugin = name, "instantiating plugin");
        (registration.construct)(&config, plugins).map_err(|source| PluginError::Construction {
            contract: C::NAME,
            name: name.to_string(),
            source,
        })
    }

    /// Resolve a descriptor into an instance.
    pub fn resolve(&self, descriptor: &PluginDescriptor, plugins: &Plugins) -> PluginResult<Box<C>> {
        let (name, params) = descriptor.selection(C::NAME)?;
        self.instantiate(name, &params, plugins)
    }

    fn find(&self, name: &str) -> PluginResult<usize> {
        self.registrations
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| PluginError::NotFound {
                contract: C::NAME,
                name: name.to_string(),
                available: self.discover().available.iter().map(|n| n.to_string()).collect(),
            })
    }

    fn validate(&self, index: usize) -> PluginResult<()> {
        let registration = &self.registrations[index];
        let name = registration.name;
        let reject = |reason: String| PluginError::Validation {
            contract: C::NAME,
            name: name.to_string(),
            reason,
        };

        if !is_identifier(name) {
            return Err(reject("name must start with a letter and contain only letters, digits, or '_'".into()));
        }
        if name == TYPE_KEY {
            return Err(reject(format!("{TYPE_KEY:?} is reserved for the descriptor selector")));
        }
        if self.registrations[..index].iter().any(|r| r.name == name) {
            return Err(reject("name already registered for this contract".into()));
        }
        let defaults = (registration.default_config)();
        if defaults.contains_key(TYPE_KEY) {
            return Err(reject(format!("default configuration must not use the reserved {TYPE_KEY:?} key")));
        }
        flatten_config(&defaults).map_err(|e| reject(format!("default configuration is not portable: {e}")))?;
        Ok(())
    }
}

impl<C: Contract + ?Sized> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Contract + ?Sized> std::fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("contract", &C::NAME)
            .field("plugins", &self.names())
            .finish()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};

    pub trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    impl Contract for dyn Greeter {
        const NAME: &'static str = "greeter";
    }

    pub struct Hello {
        pub name: String,
    }

    impl Greeter for Hello {
        fn greet(&self) -> String {
            format!("hello {}", self.name)
        }
    }

    impl Plugin<dyn Greeter> for Hello {
        const NAME: &'static str = "Hello";

        fn default_config() -> ConfigMap {
            let mut m = ConfigMap::new();
            m.insert("name".into(), json!("world"));
            m
        }

        fn from_config(config: &ConfigMap, _plugins: &Plugins) -> Result<Self, BoxError> {
            let name = config
                .get("name")
                .and_then(Value::as_str)
                .ok_or("name must be a string")?;
            Ok(Self { name: name.to_string() })
        }

        fn into_contract(self) -> Box<dyn Greeter> {
            Box::new(self)
        }
    }

    struct NeedsOptionalDep;

    impl Greeter for NeedsOptionalDep {
        fn greet(&self) -> String {
            unreachable!("never constructed")
        }
    }

    impl Plugin<dyn Greeter> for NeedsOptionalDep {
        const NAME: &'static str = "NeedsOptionalDep";

        fn usability() -> Usability {
            Usability::Unusable("optional dependency `fancy` not installed".into())
        }

        fn default_config() -> ConfigMap {
            ConfigMap::new()
        }

        fn from_config(_config: &ConfigMap, _plugins: &Plugins) -> Result<Self, BoxError> {
            Ok(Self)
        }

        fn into_contract(self) -> Box<dyn Greeter> {
            Box::new(self)
        }
    }

    struct BadName;

    impl Greeter for BadName {
        fn greet(&self) -> String {
            String::new()
        }
    }

    impl Plugin<dyn Greeter> for BadName {
        const NAME: &'static str = "bad.name";

        fn default_config() -> ConfigMap {
            ConfigMap::new()
        }

        fn from_config(_config: &ConfigMap, _plugins: &Plugins) -> Result<Self, BoxError> {
            Ok(Self)
        }

        fn into_contract(self) -> Box<dyn Greeter> {
            Box::new(self)
        }
    }

    struct DottedDefaults;

    impl Greeter for DottedDefaults {
        fn greet(&self) -> String {
            String::new()
        }
    }

    impl Plugin<dyn Greeter> for DottedDefaults {
        const NAME: &'static str = "DottedDefaults";

        fn default_config() -> ConfigMap {
            let mut m = ConfigMap::new();
            m.insert("a.b".into(), json!(1));
            m
        }

        fn from_config(_config: &ConfigMap, _plugins: &Plugins) -> Result<Self, BoxError> {
            Ok(Self)
        }

        fn into_contract(self) -> Box<dyn Greeter> {
            Box::new(self)
        }
    }

    fn registry() -> Registry<dyn Greeter> {
        let mut r = Registry::new();
        r.register::<Hello>()
            .register::<NeedsOptionalDep>()
            .register::<BadName>()
            .register::<DottedDefaults>()
            .register::<Hello>();
        r
    }

    fn params(v: Value) -> ConfigMap {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    #[test]
    fn discovery_isolates_unusable_and_invalid_plugins() {
        let d = registry().discover();
        assert_eq!(d.contract, "greeter");
        assert_eq!(d.available, vec!["Hello"]);
        assert_eq!(d.unusable.len(), 1);
        assert_eq!(d.unusable[0].0, "NeedsOptionalDep");
        assert!(d.unusable[0].1.contains("fancy"));

        let rejected: Vec<_> = d.rejected.iter().filter_map(|e| e.plugin_name()).collect();
        assert_eq!(rejected, vec!["bad.name", "DottedDefaults", "Hello"]);
        assert!(d.rejected.iter().all(|e| matches!(e, PluginError::Validation { .. })));
    }

    #[test]
    fn empty_registry_discovers_nothing() {
        let r: Registry<dyn Greeter> = Registry::new();
        assert!(r.is_empty());
        let d = r.discover();
        assert!(d.available.is_empty() && d.unusable.is_empty() && d.rejected.is_empty());
    }

    #[test]
    fn default_config_template_lists_available_plugins_only() {
        let template = registry().make_default_config();
        assert_eq!(template.selected(), None);
        let names: Vec<_> = template.implementations().collect();
        assert_eq!(names, vec!["Hello"]);
        assert_eq!(template.params("Hello").unwrap()["name"], json!("world"));
    }

    // -----------------------------------------------------------------------
    // Instantiation
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_merges_defaults() {
        let plugins = Plugins::builder().build();
        let r = registry();
        let g = r
            .resolve(&PluginDescriptor::new().select("Hello"), &plugins)
            .unwrap();
        assert_eq!(g.greet(), "hello world");

        let g = r
            .resolve(
                &PluginDescriptor::selecting("Hello", params(json!({"name": "rust"}))),
                &plugins,
            )
            .unwrap();
        assert_eq!(g.greet(), "hello rust");
    }

    #[test]
    fn construction_failure_is_distinct_from_validation() {
        let plugins = Plugins::builder().build();
        let err = registry()
            .instantiate("Hello", &params(json!({"name": 3})), &plugins)
            .err()
            .unwrap();
        match err {
            PluginError::Construction { contract, name, source } => {
                assert_eq!(contract, "greeter");
                assert_eq!(name, "Hello");
                assert!(source.to_string().contains("name must be a string"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn explicitly_requested_invalid_plugin_fails_validation() {
        let plugins = Plugins::builder().build();
        let err = registry()
            .instantiate("DottedDefaults", &ConfigMap::new(), &plugins)
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::Validation { .. }));
    }

    #[test]
    fn explicitly_requested_unusable_plugin_fails() {
        let plugins = Plugins::builder().build();
        let err = registry()
            .instantiate("NeedsOptionalDep", &ConfigMap::new(), &plugins)
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::Unusable { .. }));
        assert!(err.to_string().contains("fancy"));
    }

    #[test]
    fn unknown_plugin_lists_available() {
        let plugins = Plugins::builder().build();
        let err = registry()
            .instantiate("Nope", &ConfigMap::new(), &plugins)
            .err()
            .unwrap();
        match err {
            PluginError::NotFound { name, available, .. } => {
                assert_eq!(name, "Nope");
                assert_eq!(available, vec!["Hello".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn descriptor_without_selection_is_a_config_error() {
        let plugins = Plugins::builder().build();
        let err = registry()
            .resolve(&PluginDescriptor::new(), &plugins)
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::Config(_)));
    }

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("MemoryElement"));
        assert!(is_identifier("a_1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("has space"));
        assert!(!is_identifier("dot.ted"));
    }
}
