use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use dataprov_types::{ConfigMap, Value};
use tracing::debug;

use crate::descriptor::PluginDescriptor;
use crate::error::{ConfigError, PluginError, PluginResult};
use crate::plugin::{Contract, Plugin};
use crate::registry::{Discovery, Registry};

type AnyBox = Box<dyn Any + Send + Sync>;

#[derive(Default)]
struct Tables {
    /// `TypeId::of::<Registry<C>>()` to `(C::NAME, Registry<C>)`.
    registries: HashMap<TypeId, (&'static str, AnyBox)>,
    /// Named shared values keyed by their concrete type.
    collaborators: HashMap<(TypeId, String), AnyBox>,
}

/// Every contract's [`Registry`] plus named collaborators, shared by all
/// plugin constructors.
///
/// Cloning is cheap. Constructors receive a `&Plugins` so a data set can
/// resolve its cache element and a backend element can look up its byte
/// backend by name.
#[derive(Clone, Default)]
pub struct Plugins {
    tables: Arc<Tables>,
}

impl Plugins {
    pub fn builder() -> PluginsBuilder {
        PluginsBuilder::default()
    }

    /// The registry for contract `C`, if anything registered into it.
    pub fn registry<C: Contract + ?Sized>(&self) -> Option<&Registry<C>> {
        self.tables
            .registries
            .get(&TypeId::of::<Registry<C>>())
            .and_then(|(_, registry)| registry.downcast_ref::<Registry<C>>())
    }

    /// Names of contracts with a registry.
    pub fn contracts(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.tables.registries.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names
    }

    /// Discover the plugins of contract `C`.
    pub fn discover<C: Contract + ?Sized>(&self) -> PluginResult<Discovery> {
        Ok(self.require::<C>()?.discover())
    }

    /// Default descriptor template for contract `C`.
    pub fn make_default_config<C: Contract + ?Sized>(&self) -> PluginResult<PluginDescriptor> {
        Ok(self.require::<C>()?.make_default_config())
    }

    /// Resolve a descriptor into a boxed instance of contract `C`.
    pub fn resolve<C: Contract + ?Sized>(&self, descriptor: &PluginDescriptor) -> PluginResult<Box<C>> {
        let registry = self.require::<C>()?;
        debug!(contract = C::NAME, plugin = ?descriptor.selected(), "resolving descriptor");
        registry.resolve(descriptor, self)
    }

    /// Resolve an optional nested descriptor.
    ///
    /// A missing value, `null`, or a descriptor with a `null` type yields
    /// `Ok(None)`.
    pub fn resolve_optional<C: Contract + ?Sized>(&self, value: Option<&Value>) -> PluginResult<Option<Box<C>>> {
        match PluginDescriptor::from_optional_value(C::NAME, value)? {
            Some(descriptor) => self.resolve::<C>(&descriptor).map(Some),
            None => Ok(None),
        }
    }

    /// Construct a named plugin with explicit parameters.
    pub fn instantiate<C: Contract + ?Sized>(&self, name: &str, params: &ConfigMap) -> PluginResult<Box<C>> {
        self.require::<C>()?.instantiate(name, params, self)
    }

    /// Look up a named collaborator registered with
    /// [`PluginsBuilder::collaborator`].
    pub fn collaborator<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Option<T> {
        self.tables
            .collaborators
            .get(&(TypeId::of::<T>(), name.to_string()))
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Like [`collaborator`](Self::collaborator) but failing with a
    /// configuration error naming what is missing.
    pub fn require_collaborator<T: Clone + Send + Sync + 'static>(&self, name: &str) -> PluginResult<T> {
        self.collaborator(name).ok_or_else(|| {
            PluginError::Config(ConfigError::Malformed(format!(
                "no {} collaborator named {name:?}",
                std::any::type_name::<T>()
            )))
        })
    }

    fn require<C: Contract + ?Sized>(&self) -> PluginResult<&Registry<C>> {
        self.registry::<C>().ok_or(PluginError::UnknownContract(C::NAME))
    }
}

impl std::fmt::Debug for Plugins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugins")
            .field("contracts", &self.contracts())
            .field("collaborators", &self.tables.collaborators.len())
            .finish()
    }
}

/// Collects registrations before freezing them into [`Plugins`].
#[derive(Default)]
pub struct PluginsBuilder {
    tables: Tables,
}

impl PluginsBuilder {
    /// Register plugin `P` as an implementation of contract `C`.
    pub fn register<C, P>(&mut self) -> &mut Self
    where
        C: Contract + ?Sized,
        P: Plugin<C>,
    {
        self.registry_mut::<C>().register::<P>();
        self
    }

    /// Make a shared value available to constructors under `name`.
    pub fn collaborator<T: Clone + Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) -> &mut Self {
        self.tables
            .collaborators
            .insert((TypeId::of::<T>(), name.into()), Box::new(value));
        self
    }

    pub fn build(self) -> Plugins {
        Plugins {
            tables: Arc::new(self.tables),
        }
    }

    fn registry_mut<C: Contract + ?Sized>(&mut self) -> &mut Registry<C> {
        let (_, registry) = self
            .tables
            .registries
            .entry(TypeId::of::<Registry<C>>())
            .or_insert_with(|| (C::NAME, Box::new(Registry::<C>::new())));
        registry
            .downcast_mut::<Registry<C>>()
            .unwrap_or_else(|| unreachable!("registry table is keyed by its own TypeId"))
    }
}
