//! Plain configuration values shared by every plugin.
//!
//! Plugin parameters are JSON objects ([`ConfigMap`]). Nested objects may be
//! flattened into dotted keys ([`FlatConfig`]) for storage systems that only
//! hold flat key/value pairs, and expanded back without loss.

use std::collections::BTreeMap;

use crate::error::TypeError;

pub use serde_json::Value;

/// JSON object holding plugin parameters.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Flat view of a configuration: dotted path to leaf value.
pub type FlatConfig = BTreeMap<String, Value>;

const SEPARATOR: char = '.';

/// Deep-merge `overlay` on top of `base`.
///
/// Nested objects are merged key by key; any other overlay value replaces the
/// base value outright.
pub fn merge_config(base: &ConfigMap, overlay: &ConfigMap) -> ConfigMap {
    let mut merged = base.clone();
    for (key, value) in overlay {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (merged.get_mut(key), value) {
            let nested = merge_config(existing, incoming);
            *existing = nested;
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Flatten a nested configuration into dotted keys.
///
/// Empty objects are kept as leaves so the structure survives a round trip.
/// Keys that are empty or contain `.` cannot be represented and are rejected.
pub fn flatten_config(config: &ConfigMap) -> Result<FlatConfig, TypeError> {
    let mut flat = FlatConfig::new();
    flatten_into(&mut flat, None, config)?;
    Ok(flat)
}

fn flatten_into(flat: &mut FlatConfig, prefix: Option<&str>, config: &ConfigMap) -> Result<(), TypeError> {
    for (key, value) in config {
        if key.is_empty() || key.contains(SEPARATOR) {
            return Err(TypeError::InvalidConfigKey {
                key: key.clone(),
                reason: format!("keys must be non-empty and must not contain '{SEPARATOR}'"),
            });
        }
        let path = match prefix {
            Some(p) => format!("{p}{SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(flat, Some(&path), nested)?,
            leaf => {
                flat.insert(path, leaf.clone());
            }
        }
    }
    Ok(())
}

/// Expand dotted keys back into a nested configuration.
pub fn unflatten_config(flat: &FlatConfig) -> Result<ConfigMap, TypeError> {
    let mut root = ConfigMap::new();
    for (path, value) in flat {
        let mut segments: Vec<&str> = path.split(SEPARATOR).collect();
        let Some(leaf) = segments.pop() else {
            continue;
        };
        let mut node = &mut root;
        for segment in segments {
            let entry = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(ConfigMap::new()));
            node = match entry {
                Value::Object(map) => map,
                _ => return Err(TypeError::FlatConflict(path.clone())),
            };
        }
        match node.get(leaf) {
            Some(Value::Object(existing)) if !existing.is_empty() => {
                return Err(TypeError::FlatConflict(path.clone()));
            }
            _ => {
                node.insert(leaf.to_string(), value.clone());
            }
        }
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> ConfigMap {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn merge_overlays_nested_objects() {
        let base = obj(json!({"a": 1, "nested": {"x": 1, "y": 2}}));
        let overlay = obj(json!({"nested": {"y": 3, "z": 4}, "b": true}));
        let merged = merge_config(&base, &overlay);
        assert_eq!(
            Value::Object(merged),
            json!({"a": 1, "b": true, "nested": {"x": 1, "y": 3, "z": 4}})
        );
    }

    #[test]
    fn merge_replaces_non_object_values() {
        let base = obj(json!({"nested": {"x": 1}}));
        let overlay = obj(json!({"nested": null}));
        assert_eq!(Value::Object(merge_config(&base, &overlay)), json!({"nested": null}));
    }

    #[test]
    fn flatten_produces_dotted_keys() {
        let config = obj(json!({
            "type": "MemoryDataSet",
            "MemoryDataSet": {"cache_element": {"type": null}},
            "empty": {},
            "list": [1, 2]
        }));
        let flat = flatten_config(&config).unwrap();
        assert_eq!(flat.get("type"), Some(&json!("MemoryDataSet")));
        assert_eq!(flat.get("MemoryDataSet.cache_element.type"), Some(&json!(null)));
        assert_eq!(flat.get("empty"), Some(&json!({})));
        assert_eq!(flat.get("list"), Some(&json!([1, 2])));
    }

    #[test]
    fn flatten_then_unflatten_is_identity() {
        let config = obj(json!({
            "data_set": {"type": "KvsDataSet", "KvsDataSet": {"kvstore": {"type": "MemoryKeyValueStore"}}},
            "empty": {},
            "n": 3
        }));
        let flat = flatten_config(&config).unwrap();
        assert_eq!(unflatten_config(&flat).unwrap(), config);
    }

    #[test]
    fn dotted_keys_cannot_be_flattened() {
        let config = obj(json!({"a.b": 1}));
        assert!(matches!(
            flatten_config(&config),
            Err(TypeError::InvalidConfigKey { .. })
        ));
    }

    #[test]
    fn unflatten_detects_leaf_prefix_conflict() {
        let mut flat = FlatConfig::new();
        flat.insert("a".into(), json!(1));
        flat.insert("a.b".into(), json!(2));
        assert!(matches!(unflatten_config(&flat), Err(TypeError::FlatConflict(_))));
    }
}
