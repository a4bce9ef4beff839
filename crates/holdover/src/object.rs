//! Object model and class system
//!
//! Classes are runtime entities keyed by name. A class owns a name-keyed
//! method table whose entries are either host-provided native functions or
//! generated class-data accessors. Re-registering a class under the same
//! name replaces the class object (and therefore its table) wholesale; that
//! replacement is the "reload" this crate is built to survive.

use crate::runtime::Runtime;
use crate::value::Value;
use crate::RuntimeResult;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique object IDs
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique object ID
fn generate_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A host-provided method body.
///
/// Receives the runtime, the receiver's class name, and the call arguments.
pub type NativeFn = fn(&mut Runtime, &str, &[Value]) -> RuntimeResult<Value>;

/// A missing-method handler registered by a class.
///
/// Receives the runtime, the receiver's class name, the requested entry-point
/// name, and the original arguments. Returning [`FallbackOutcome::Pass`]
/// defers to the next handler along the receiver's linearized chain.
pub type FallbackFn = fn(&mut Runtime, &str, &str, &[Value]) -> RuntimeResult<FallbackOutcome>;

/// What a missing-method handler did with a call.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackOutcome {
    /// The handler claimed the call and produced a result.
    Handled(Value),
    /// The handler declined; the next handler in chain order is consulted.
    Pass,
}

/// A named entry point in a class's method table.
#[derive(Debug, Clone)]
pub enum Method {
    /// Host-provided function
    Native(NativeFn),
    /// Generated class-data accessor, bound to one attribute name.
    ///
    /// Accessors hold no values; reads and writes go through the runtime's
    /// class-data store.
    Accessor {
        /// The attribute this accessor reads and writes
        attribute: String,
    },
}

/// Build the decorated alias name for an attribute's accessor.
///
/// Every declared attribute installs two behaviorally identical entry
/// points: the attribute name itself and this alias.
pub fn accessor_alias(attribute: &str) -> String {
    format!("_{attribute}_accessor")
}

/// Extract the attribute name from a decorated alias, if `name` is one.
///
/// Inverse of [`accessor_alias`]: `_DataFile_accessor` yields `DataFile`.
/// Names that do not carry the decoration yield `None`.
pub fn alias_attribute(name: &str) -> Option<&str> {
    let inner = name.strip_prefix('_')?.strip_suffix("_accessor")?;
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

/// Name-keyed method table
#[derive(Debug, Clone)]
pub struct MethodTable {
    entries: FxHashMap<String, Method>,
}

impl MethodTable {
    /// Create a new empty method table
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Insert an entry, returning the one it displaced (if any).
    ///
    /// Same-name entries are silently overwritten; declaring an attribute
    /// whose name collides with an existing method replaces that method.
    pub fn insert(&mut self, name: impl Into<String>, method: Method) -> Option<Method> {
        self.entries.insert(name.into(), method)
    }

    /// Get an entry by name
    pub fn get(&self, name: &str) -> Option<&Method> {
        self.entries.get(name)
    }

    /// Remove an entry by name, returning it if present
    pub fn remove(&mut self, name: &str) -> Option<Method> {
        self.entries.remove(name)
    }

    /// Check whether an entry exists
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for MethodTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Class definition metadata
#[derive(Debug, Clone)]
pub struct Class {
    /// Class name (registry key; survives redefinition)
    pub name: String,
    /// Declared parent class names, in declaration order
    pub parents: Vec<String>,
    /// Named entry points (native methods and generated accessors)
    pub methods: MethodTable,
    /// Missing-method handler participating in the fallback chain
    pub fallback: Option<FallbackFn>,
}

impl Class {
    /// Create a new class with no parents
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            methods: MethodTable::new(),
            fallback: None,
        }
    }

    /// Create a new class with parents
    pub fn with_parents(name: impl Into<String>, parents: Vec<String>) -> Self {
        Self {
            name: name.into(),
            parents,
            methods: MethodTable::new(),
            fallback: None,
        }
    }

    /// Add a method to the table
    pub fn add_method(&mut self, name: impl Into<String>, method: Method) {
        self.methods.insert(name, method);
    }

    /// Get a method from the table
    pub fn get_method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Check whether this class's own table has an accessor bound to
    /// `attribute` under the attribute's primary name.
    pub fn has_accessor(&self, attribute: &str) -> bool {
        matches!(
            self.methods.get(attribute),
            Some(Method::Accessor { attribute: bound }) if bound.as_str() == attribute
        )
    }
}

/// Object instance
///
/// Objects carry only their identity and class name; class data is keyed by
/// class, so instances contribute no storage of their own.
#[derive(Debug, Clone)]
pub struct Object {
    /// Unique object ID (assigned on creation)
    pub object_id: u64,
    /// Name of the class this object was instantiated from
    pub class_name: String,
}

impl Object {
    /// Create a new object of the named class.
    ///
    /// Does not check registration; [`Runtime::instantiate`] is the checked
    /// path.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            object_id: generate_object_id(),
            class_name: class_name.into(),
        }
    }
}
