use std::fmt;
use std::sync::Arc;

use dataprov_element::DataElement;
use dataprov_plugin::{Configurable, Contract};
use dataprov_types::ElementKey;

use crate::error::SetResult;

/// Keyed collection of data elements.
///
/// All implementations must satisfy these invariants:
/// - Elements are keyed by [`DataElement::uuid`]; one entry per key.
/// - Re-adding an element whose key is present overwrites that entry.
/// - `count()` always equals `keys().len()`.
/// - Removing an entry never deletes the element's underlying content.
/// - Iteration order is stable within a process (sorted by key for the
///   built-in sets).
pub trait DataSet: Configurable + Send + Sync + fmt::Debug {
    /// Number of elements.
    fn count(&self) -> SetResult<usize>;

    /// Every key, freshly read from current state.
    fn keys(&self) -> SetResult<Vec<ElementKey>>;

    /// Returns `true` if an element is stored under `key`.
    fn has_key(&self, key: &ElementKey) -> SetResult<bool>;

    /// Add elements, overwriting entries with the same key.
    fn add_many(&self, elements: Vec<Arc<dyn DataElement>>) -> SetResult<()>;

    /// The element stored under `key`, or [`SetError::KeyNotFound`](crate::SetError::KeyNotFound).
    fn get(&self, key: &ElementKey) -> SetResult<Arc<dyn DataElement>>;

    /// Remove the entry under `key`, or fail with
    /// [`SetError::KeyNotFound`](crate::SetError::KeyNotFound).
    fn remove(&self, key: &ElementKey) -> SetResult<()>;

    /// Add one element.
    fn add(&self, element: Arc<dyn DataElement>) -> SetResult<()> {
        self.add_many(vec![element])
    }

    /// Returns `true` if an element with the same key is present.
    fn contains(&self, element: &dyn DataElement) -> SetResult<bool> {
        self.has_key(&element.uuid()?)
    }

    /// Every element, in [`keys`](Self::keys) order.
    fn elements(&self) -> SetResult<Vec<Arc<dyn DataElement>>> {
        self.keys()?.iter().map(|k| self.get(k)).collect()
    }

    fn is_empty(&self) -> SetResult<bool> {
        Ok(self.count()? == 0)
    }
}

impl Contract for dyn DataSet {
    const NAME: &'static str = "data_set";
}
