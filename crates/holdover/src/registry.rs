//! Class registry for managing runtime class metadata
//!
//! Classes are stored by name. Inserting a class whose name is already
//! present replaces the previous definition; the registry itself keeps no
//! other state, so replacement is exactly what an in-place reload looks
//! like from the outside.

use crate::object::Class;
use crate::{RuntimeError, RuntimeResult};
use rustc_hash::{FxHashMap, FxHashSet};

/// Class registry keyed by class name
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    classes: FxHashMap<String, Class>,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            classes: FxHashMap::default(),
        }
    }

    /// Register a class, replacing any previous definition of the same name.
    ///
    /// Returns the replaced class, if there was one.
    pub fn insert(&mut self, class: Class) -> Option<Class> {
        self.classes.insert(class.name.clone(), class)
    }

    /// Get a class by name
    pub fn get(&self, name: &str) -> Option<&Class> {
        self.classes.get(name)
    }

    /// Get a mutable class by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Class> {
        self.classes.get_mut(name)
    }

    /// Check whether a class is registered
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Registered class names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Compute the linearized ancestor chain for a class.
    ///
    /// The chain starts with the class itself, then traverses declared
    /// parents depth-first, left to right, keeping only the first occurrence
    /// of each name. Attribute resolution and fallback forwarding both scan
    /// this order.
    ///
    /// The chain is recomputed on every call: re-registration may change a
    /// class's parents, and the seen-set keeps even a re-registration-induced
    /// cycle from hanging the walk.
    pub fn linearize(&self, name: &str) -> RuntimeResult<Vec<String>> {
        let mut order = Vec::new();
        let mut seen = FxHashSet::default();
        self.walk(name, &mut order, &mut seen)?;
        Ok(order)
    }

    fn walk(
        &self,
        name: &str,
        order: &mut Vec<String>,
        seen: &mut FxHashSet<String>,
    ) -> RuntimeResult<()> {
        if !seen.insert(name.to_string()) {
            return Ok(());
        }
        let class = self
            .classes
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownClass(name.to_string()))?;
        order.push(name.to_string());
        for parent in &class.parents {
            self.walk(parent, order, seen)?;
        }
        Ok(())
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
