use std::fmt;

use dataprov_plugin::{Configurable, Contract};
use dataprov_types::{Key, Value};

use crate::error::{KvError, KvResult};

/// Generic mapping from [`Key`] to JSON [`Value`].
///
/// All implementations must satisfy these invariants:
/// - Keys are unique; `set` upserts.
/// - `has`/`get`/`set`/`remove` on one key are linearizable within a single
///   instance. Cross-process atomicity is documented per implementation.
/// - Keys and values survive the store's persistence without loss.
/// - Mutations on a read-only store fail with [`KvError::ReadOnly`].
pub trait KeyValueStore: Configurable + Send + Sync + fmt::Debug {
    /// Number of entries.
    fn count(&self) -> KvResult<usize>;

    /// Every key, freshly read from current state.
    fn keys(&self) -> KvResult<Vec<Key>>;

    /// Whether mutations are refused.
    fn is_read_only(&self) -> bool;

    /// The backend query: the value under `key`, or `Ok(None)` if absent.
    fn lookup(&self, key: &Key) -> KvResult<Option<Value>>;

    /// Insert or replace the value under `key`.
    fn set(&self, key: Key, value: Value) -> KvResult<()>;

    /// Remove `key`, failing with [`KvError::KeyNotFound`] if absent.
    fn remove(&self, key: &Key) -> KvResult<()>;

    /// Remove every entry.
    fn clear(&self) -> KvResult<()>;

    /// Insert or replace several entries.
    ///
    /// Default implementation calls `set()` for each entry. Stores may
    /// override to persist once.
    fn set_many(&self, entries: Vec<(Key, Value)>) -> KvResult<()> {
        self.ensure_writable()?;
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Remove several keys. Nothing is removed if any key is missing.
    fn remove_many(&self, keys: &[Key]) -> KvResult<()> {
        self.ensure_writable()?;
        for key in keys {
            if !self.has(key)? {
                return Err(KvError::KeyNotFound(key.clone()));
            }
        }
        keys.iter().try_for_each(|k| self.remove(k))
    }

    /// Returns `true` if `key` is present. Backend failures are errors, not
    /// absence.
    fn has(&self, key: &Key) -> KvResult<bool> {
        Ok(self.lookup(key)?.is_some())
    }

    /// The value under `key`, failing with [`KvError::KeyNotFound`] if absent.
    fn get(&self, key: &Key) -> KvResult<Value> {
        self.lookup(key)?
            .ok_or_else(|| KvError::KeyNotFound(key.clone()))
    }

    /// The value under `key`, or `default` if absent.
    fn get_or(&self, key: &Key, default: Value) -> KvResult<Value> {
        Ok(self.lookup(key)?.unwrap_or(default))
    }

    /// Values for several keys in order, failing on the first missing key.
    fn get_many(&self, keys: &[Key]) -> KvResult<Vec<Value>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    /// Every value, in [`keys`](Self::keys) order.
    fn values(&self) -> KvResult<Vec<Value>> {
        self.get_many(&self.keys()?)
    }

    /// Fail with [`KvError::ReadOnly`] if the store refuses mutations.
    fn ensure_writable(&self) -> KvResult<()> {
        if self.is_read_only() {
            return Err(KvError::ReadOnly {
                store: self.plugin_name().to_string(),
            });
        }
        Ok(())
    }
}

impl Contract for dyn KeyValueStore {
    const NAME: &'static str = "key_value_store";
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataprov_types::ConfigMap;

    /// Store whose backend is unreachable.
    #[derive(Debug)]
    struct Unreachable;

    impl Unreachable {
        fn timeout() -> KvError {
            KvError::Store {
                store: "Unreachable".into(),
                reason: "timeout".into(),
            }
        }
    }

    impl Configurable for Unreachable {
        fn plugin_name(&self) -> &'static str {
            "Unreachable"
        }

        fn get_config(&self) -> ConfigMap {
            ConfigMap::new()
        }
    }

    impl KeyValueStore for Unreachable {
        fn count(&self) -> KvResult<usize> {
            Err(Self::timeout())
        }

        fn keys(&self) -> KvResult<Vec<Key>> {
            Err(Self::timeout())
        }

        fn is_read_only(&self) -> bool {
            false
        }

        fn lookup(&self, _key: &Key) -> KvResult<Option<Value>> {
            Err(Self::timeout())
        }

        fn set(&self, _key: Key, _value: Value) -> KvResult<()> {
            Err(Self::timeout())
        }

        fn remove(&self, _key: &Key) -> KvResult<()> {
            Err(Self::timeout())
        }

        fn clear(&self) -> KvResult<()> {
            Err(Self::timeout())
        }
    }

    #[test]
    fn backend_failures_are_not_absence() {
        let store = Unreachable;
        let key = Key::from("x");
        assert!(matches!(store.has(&key), Err(KvError::Store { .. })));
        assert!(matches!(store.get(&key), Err(KvError::Store { .. })));
        assert!(matches!(store.get_or(&key, Value::Null), Err(KvError::Store { .. })));
        assert!(matches!(store.values(), Err(KvError::Store { .. })));
    }

    #[test]
    fn remove_many_surfaces_backend_failure() {
        let err = Unreachable.remove_many(&[Key::from("x")]).unwrap_err();
        assert!(matches!(err, KvError::Store { ref reason, .. } if reason == "timeout"));
    }
}
