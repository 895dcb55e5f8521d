use dataprov_types::ConfigMap;

use crate::descriptor::PluginDescriptor;
use crate::error::BoxError;
use crate::plugins::Plugins;

/// Marker for a contract trait object that plugins can implement.
///
/// Implemented for `dyn DataElement`, `dyn DataSet`, and `dyn KeyValueStore`
/// in their respective crates.
pub trait Contract: 'static {
    /// Contract name used in configuration files and error messages.
    const NAME: &'static str;
}

/// Whether a plugin can be used in this build/environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Usability {
    Usable,
    /// Not usable; the reason names what is missing.
    Unusable(String),
}

impl Usability {
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Usable)
    }
}

/// Handle serialization: every contract instance can describe how to
/// reconstruct itself.
///
/// The configuration holds locators and parameters, never content that lives
/// in a backend.
pub trait Configurable {
    /// Registered name of the implementation.
    fn plugin_name(&self) -> &'static str;

    /// Parameters that rebuild an equivalent handle via [`Plugin::from_config`].
    fn get_config(&self) -> ConfigMap;

    /// Descriptor selecting this implementation with its current parameters.
    fn to_descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::selecting(self.plugin_name(), self.get_config())
    }
}

/// A constructible implementation of contract `C`.
///
/// `into_contract` is the conformance check: it only compiles when the type
/// implements every operation of `C`.
pub trait Plugin<C: Contract + ?Sized>: Sized + 'static {
    /// Name under which the plugin registers; also the descriptor key.
    const NAME: &'static str;

    /// Report missing optional dependencies. Unusable plugins are excluded
    /// from discovery instead of failing it.
    fn usability() -> Usability {
        Usability::Usable
    }

    /// Default constructor parameters.
    fn default_config() -> ConfigMap;

    /// Construct from parameters already merged over [`default_config`](Self::default_config).
    ///
    /// `plugins` resolves nested descriptors (for example a cache element).
    fn from_config(config: &ConfigMap, plugins: &Plugins) -> Result<Self, BoxError>;

    /// Box as the contract trait object.
    fn into_contract(self) -> Box<C>;
}
