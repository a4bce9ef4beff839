//! Class-data side table
//!
//! Values live here, keyed by class *name* and attribute name, never inside
//! a class object. Replacing a class in the registry therefore cannot touch
//! its data; the accessor entry points a replacement wipes are recreated
//! lazily from this table.
//!
//! The store knows nothing about the class hierarchy: inheritance-aware
//! lookups take a precomputed linearized chain and scan it first-match, so
//! resolution is a pure function of the table's current contents and the
//! chain it is handed.

use crate::value::Value;
use rustc_hash::FxHashMap;

/// Two-level side table: class name → attribute name → value.
///
/// Entries are added when an attribute is first given a value and updated on
/// accessor writes. There is no deletion operation; the table lives as long
/// as its runtime.
#[derive(Debug, Clone)]
pub struct ClassDataStore {
    slots: FxHashMap<String, FxHashMap<String, Value>>,
}

impl ClassDataStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            slots: FxHashMap::default(),
        }
    }

    /// Write a value into a class's own slot.
    ///
    /// Always writes under `class` exactly; overriding an inherited
    /// attribute creates the subclass's own entry rather than mutating the
    /// ancestor's.
    pub fn set(&mut self, class: &str, attribute: &str, value: Value) {
        self.slots
            .entry(class.to_string())
            .or_default()
            .insert(attribute.to_string(), value);
    }

    /// Read a class's own slot, ignoring ancestors.
    pub fn get(&self, class: &str, attribute: &str) -> Option<&Value> {
        self.slots.get(class).and_then(|attrs| attrs.get(attribute))
    }

    /// Check whether a class's own slot holds the attribute.
    pub fn has(&self, class: &str, attribute: &str) -> bool {
        self.get(class, attribute).is_some()
    }

    /// First-match lookup along a linearized chain.
    ///
    /// Returns the nearest-ancestor-or-self value for the attribute, or
    /// `None` if no chain member holds one. Absence is a normal outcome,
    /// not an error.
    pub fn resolve<'a>(&'a self, chain: &[String], attribute: &str) -> Option<&'a Value> {
        chain
            .iter()
            .find_map(|class| self.get(class, attribute))
    }

    /// Find the owner: the first chain member whose own slot holds the
    /// attribute.
    pub fn find_owner<'a>(&self, chain: &'a [String], attribute: &str) -> Option<&'a str> {
        chain
            .iter()
            .find(|class| self.has(class, attribute))
            .map(String::as_str)
    }

    /// All attribute names visible along a chain, sorted and deduplicated.
    pub fn attribute_names(&self, chain: &[String]) -> Vec<String> {
        let mut names: Vec<String> = chain
            .iter()
            .filter_map(|class| self.slots.get(class))
            .flat_map(|attrs| attrs.keys().cloned())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Number of classes with at least one stored attribute
    pub fn class_count(&self) -> usize {
        self.slots.len()
    }

    /// Check if nothing has been stored yet
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for ClassDataStore {
    fn default() -> Self {
        Self::new()
    }
}
