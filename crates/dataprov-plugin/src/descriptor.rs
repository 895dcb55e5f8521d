use std::collections::BTreeMap;
use std::path::Path;

use dataprov_types::{flatten_config, unflatten_config, ConfigMap, FlatConfig, Value};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Key that selects the implementation inside a descriptor.
pub const TYPE_KEY: &str = "type";

/// Configuration record selecting one implementation of a contract.
///
/// The JSON shape is
///
/// ```json
/// {
///   "type": "MemoryElement",
///   "MemoryElement": { "bytes": null, "content_type": null, "readonly": false },
///   "FileElement": { "filepath": "" }
/// }
/// ```
///
/// `type` names the selected implementation (or is `null` for a template
/// listing defaults); every other key holds one implementation's parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigMap", into = "ConfigMap")]
pub struct PluginDescriptor {
    selected: Option<String>,
    params: BTreeMap<String, ConfigMap>,
}

impl PluginDescriptor {
    /// An empty descriptor with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// A descriptor selecting `name` with the given parameters.
    pub fn selecting(name: impl Into<String>, params: ConfigMap) -> Self {
        let name = name.into();
        let mut descriptor = Self::new();
        descriptor.params.insert(name.clone(), params);
        descriptor.selected = Some(name);
        descriptor
    }

    /// Select an implementation by name.
    pub fn select(mut self, name: impl Into<String>) -> Self {
        self.selected = Some(name.into());
        self
    }

    /// Set the parameters for one implementation.
    pub fn with_params(mut self, name: impl Into<String>, params: ConfigMap) -> Self {
        self.params.insert(name.into(), params);
        self
    }

    /// The selected implementation name, if any.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Parameters recorded for an implementation.
    pub fn params(&self, name: &str) -> Option<&ConfigMap> {
        self.params.get(name)
    }

    /// Names of all implementations with recorded parameters.
    pub fn implementations(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// The selected name and its parameters (empty if none were recorded).
    pub fn selection(&self, contract: &str) -> ConfigResult<(&str, ConfigMap)> {
        let name = self.selected().ok_or_else(|| ConfigError::MissingType {
            contract: contract.to_string(),
        })?;
        Ok((name, self.params.get(name).cloned().unwrap_or_default()))
    }

    /// Parse a descriptor from a JSON object, naming `contract` in errors.
    pub fn from_config_map(contract: &str, map: &ConfigMap) -> ConfigResult<Self> {
        let mut descriptor = Self::new();
        for (key, value) in map {
            if key == TYPE_KEY {
                descriptor.selected = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => {
                        return Err(ConfigError::InvalidType {
                            contract: contract.to_string(),
                            found: other.to_string(),
                        })
                    }
                };
                continue;
            }
            match value {
                Value::Object(params) => {
                    descriptor.params.insert(key.clone(), params.clone());
                }
                // A null section is an implementation with nothing configured.
                Value::Null => {
                    descriptor.params.insert(key.clone(), ConfigMap::new());
                }
                other => {
                    return Err(ConfigError::NotAnObject {
                        contract: contract.to_string(),
                        name: key.clone(),
                        found: other.to_string(),
                    })
                }
            }
        }
        Ok(descriptor)
    }

    /// Parse a descriptor from any JSON value.
    ///
    /// Returns `Ok(None)` for `null`, for a missing value, and for a
    /// descriptor whose `type` is `null`: all three mean "not configured".
    pub fn from_optional_value(contract: &str, value: Option<&Value>) -> ConfigResult<Option<Self>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => {
                let descriptor = Self::from_config_map(contract, map)?;
                Ok(descriptor.selected().is_some().then_some(descriptor))
            }
            Some(other) => Err(ConfigError::Malformed(format!(
                "{contract}: expected a descriptor object, got {other}"
            ))),
        }
    }

    /// Render as a JSON object.
    pub fn to_config_map(&self) -> ConfigMap {
        let mut map = ConfigMap::new();
        map.insert(
            TYPE_KEY.to_string(),
            self.selected.clone().map(Value::String).unwrap_or(Value::Null),
        );
        for (name, params) in &self.params {
            map.insert(name.clone(), Value::Object(params.clone()));
        }
        map
    }

    /// Render as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_config_map())
    }
}

impl TryFrom<ConfigMap> for PluginDescriptor {
    type Error = ConfigError;

    fn try_from(map: ConfigMap) -> Result<Self, Self::Error> {
        Self::from_config_map("plugin", &map)
    }
}

impl From<PluginDescriptor> for ConfigMap {
    fn from(descriptor: PluginDescriptor) -> Self {
        descriptor.to_config_map()
    }
}

/// Plugin configuration for several contracts at once.
///
/// Maps a contract name (`data_element`, `data_set`, `key_value_store`) to
/// the descriptor for that contract. Round-trips through JSON, TOML, and a
/// flat dotted-key map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PluginConfig {
    sections: BTreeMap<String, PluginDescriptor>,
}

impl PluginConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for a contract.
    pub fn get(&self, contract: &str) -> Option<&PluginDescriptor> {
        self.sections.get(contract)
    }

    /// Set the descriptor for a contract.
    pub fn insert(&mut self, contract: impl Into<String>, descriptor: PluginDescriptor) -> &mut Self {
        self.sections.insert(contract.into(), descriptor);
        self
    }

    /// Contract names present in this configuration.
    pub fn contracts(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Parse the nested `{contract: descriptor}` mapping.
    pub fn from_config_map(map: &ConfigMap) -> ConfigResult<Self> {
        let mut config = Self::new();
        for (contract, value) in map {
            let Value::Object(section) = value else {
                return Err(ConfigError::Malformed(format!(
                    "section {contract:?} must be an object, got {value}"
                )));
            };
            config
                .sections
                .insert(contract.clone(), PluginDescriptor::from_config_map(contract, section)?);
        }
        Ok(config)
    }

    /// Render as the nested `{contract: descriptor}` mapping.
    pub fn to_config_map(&self) -> ConfigMap {
        self.sections
            .iter()
            .map(|(contract, descriptor)| (contract.clone(), descriptor.to_value()))
            .collect()
    }

    /// Flatten into dotted keys such as `data_set.MemoryDataSet.cache_element.type`.
    pub fn to_flat(&self) -> ConfigResult<FlatConfig> {
        Ok(flatten_config(&self.to_config_map())?)
    }

    /// Rebuild from dotted keys produced by [`to_flat`](Self::to_flat).
    pub fn from_flat(flat: &FlatConfig) -> ConfigResult<Self> {
        Self::from_config_map(&unflatten_config(flat)?)
    }

    pub fn from_json_str(s: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(s).map_err(|e| ConfigError::Format {
            format: "json",
            reason: e.to_string(),
        })?;
        Self::from_value(value)
    }

    pub fn to_json_string(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(&Value::Object(self.to_config_map())).map_err(|e| ConfigError::Format {
            format: "json",
            reason: e.to_string(),
        })
    }

    /// Parse TOML. TOML has no null, so an absent `type` means "unselected".
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let value: Value = toml::from_str(s).map_err(|e| ConfigError::Format {
            format: "toml",
            reason: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Render as TOML. Null values are dropped since TOML cannot express them.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        let value = strip_nulls(Value::Object(self.to_config_map()));
        toml::to_string_pretty(&value).map_err(|e| ConfigError::Format {
            format: "toml",
            reason: e.to_string(),
        })
    }

    /// Load from a `.json` or `.toml` file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(ConfigError::Malformed(format!(
                "unsupported configuration file extension {other:?} for {}",
                path.display()
            ))),
        }
    }

    /// Write to a `.json` or `.toml` file, chosen by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let text = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => self.to_toml_string()?,
            Some("json") => self.to_json_string()?,
            other => {
                return Err(ConfigError::Malformed(format!(
                    "unsupported configuration file extension {other:?} for {}",
                    path.display()
                )))
            }
        };
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_value(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Object(map) => Self::from_config_map(&map),
            other => Err(ConfigError::Malformed(format!(
                "top-level configuration must be an object, got {other}"
            ))),
        }
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
