//! Runtime: class registration, dynamic dispatch, and class-data declaration
//!
//! The [`Runtime`] owns the three pieces the rest of the crate defines: a
//! [`ClassRegistry`] of live class objects, a [`ClassDataStore`] keyed by
//! class name, and the dispatcher that ties them together. Classes are
//! registered from [`ClassDef`] descriptions; re-registering a name replaces
//! the class object wholesale, which is how an in-place reload is modeled.
//!
//! Dispatch order for `call`:
//!
//! 1. scan the receiver's linearized chain for a method entry
//! 2. if none matches, try to recreate a wiped accessor from the data store
//!    (install on the owning class, then retry)
//! 3. otherwise offer the call to each `missing_method` handler along the
//!    chain until one handles it
//! 4. error with [`RuntimeError::NoSuchMethod`]
//!
//! Step 2 is what makes stored values reachable after a reload: the data
//! outlives the class object, and the first call through a wiped accessor
//! name rebuilds the method entry from the surviving table.

use crate::object::{
    accessor_alias, alias_attribute, Class, FallbackFn, FallbackOutcome, Method, NativeFn, Object,
};
use crate::registry::ClassRegistry;
use crate::store::ClassDataStore;
use crate::value::Value;
use crate::{RuntimeError, RuntimeResult};

/// Method name the finalization walk looks for on each class in the chain.
pub const FINALIZE_METHOD: &str = "finalize";

/// Runtime construction options
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Print dispatch diagnostics (accessor installs, class replacement,
    /// lazy recreation) to stderr
    pub trace: bool,
}

/// Declarative description of a class, consumed by [`Runtime::register`].
///
/// A `ClassDef` is a plain recipe: parents by name, native methods, class
/// data declarations, and an optional `missing_method` handler. Registering
/// the same name twice replaces the previous class object, so a reload is
/// just a second `register` call with the new definition.
#[derive(Debug, Clone)]
pub struct ClassDef {
    name: String,
    parents: Vec<String>,
    methods: Vec<(String, NativeFn)>,
    class_data: Vec<(String, Option<Value>)>,
    fallback: Option<FallbackFn>,
}

impl ClassDef {
    /// Start a definition for the named class
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            methods: Vec::new(),
            class_data: Vec::new(),
            fallback: None,
        }
    }

    /// Add a parent. Order matters: earlier parents win during resolution.
    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parents.push(name.into());
        self
    }

    /// Add a native method
    pub fn method(mut self, name: impl Into<String>, f: NativeFn) -> Self {
        self.methods.push((name.into(), f));
        self
    }

    /// Declare a class-data attribute, optionally with an initial value.
    ///
    /// The initial value only lands in the store if no class along the
    /// chain already holds the attribute, so redefining a class cannot
    /// clobber data that survived from before the reload.
    pub fn class_data(mut self, attribute: impl Into<String>, initial: Option<Value>) -> Self {
        self.class_data.push((attribute.into(), initial));
        self
    }

    /// Install a handler consulted when dispatch finds no method and no
    /// recreatable accessor
    pub fn missing_method(mut self, f: FallbackFn) -> Self {
        self.fallback = Some(f);
        self
    }

    /// Name this definition registers under
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The class-data runtime.
///
/// Holds every registered class and the side table of class-data values.
/// All state is owned and there are no globals, so two runtimes never
/// observe each other.
#[derive(Debug, Clone)]
pub struct Runtime {
    classes: ClassRegistry,
    store: ClassDataStore,
    options: RuntimeOptions,
}

impl Runtime {
    /// Create a runtime with default options
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    /// Create a runtime with the given options
    pub fn with_options(options: RuntimeOptions) -> Self {
        Self {
            classes: ClassRegistry::new(),
            store: ClassDataStore::new(),
            options,
        }
    }

    /// Current options
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Toggle dispatch tracing at runtime
    pub fn set_trace(&mut self, on: bool) {
        self.options.trace = on;
    }

    // ===== Registration =====

    /// Register a class from its definition, replacing any class already
    /// registered under the same name.
    ///
    /// Parents must already be registered and declared attribute names
    /// must be identifier-shaped; both checks run before the registry is
    /// touched, so a rejected definition leaves any previous registration
    /// as it was. Class-data declarations run after the class object is
    /// installed; see [`Runtime::declare`] for their exact semantics. On
    /// re-registration the old class object is dropped entirely, so its
    /// method table (including installed accessors) is gone, but values in
    /// the data store survive because they are keyed by name.
    pub fn register(&mut self, def: ClassDef) -> RuntimeResult<()> {
        let ClassDef {
            name,
            parents,
            methods,
            class_data,
            fallback,
        } = def;

        for parent in &parents {
            if !self.classes.contains(parent) {
                return Err(RuntimeError::UnknownClass(parent.clone()));
            }
        }
        for (attribute, _) in &class_data {
            if !is_valid_attribute(attribute) {
                return Err(RuntimeError::InvalidAttributeName(attribute.clone()));
            }
        }

        let mut class = Class::with_parents(name.clone(), parents);
        for (method_name, f) in methods {
            class.add_method(method_name, Method::Native(f));
        }
        class.fallback = fallback;

        let replaced = self.classes.insert(class).is_some();
        if replaced {
            self.trace(format_args!("replaced class '{name}'"));
        } else {
            self.trace(format_args!("registered class '{name}'"));
        }

        for (attribute, initial) in class_data {
            self.declare(&name, &attribute, initial)?;
        }
        Ok(())
    }

    /// Check whether a class is registered
    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }

    /// Look up a registered class
    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.get(name)
    }

    /// Look up a registered class for mutation
    pub fn class_mut(&mut self, name: &str) -> Option<&mut Class> {
        self.classes.get_mut(name)
    }

    /// Names of all registered classes, sorted
    pub fn class_names(&self) -> Vec<&str> {
        self.classes.names()
    }

    /// Linearized resolution order for a class: itself first, then parents
    /// depth-first left-to-right with duplicates dropped.
    pub fn linearize(&self, name: &str) -> RuntimeResult<Vec<String>> {
        self.classes.linearize(name)
    }

    /// Create an instance of a registered class
    pub fn instantiate(&self, class: &str) -> RuntimeResult<Object> {
        if !self.classes.contains(class) {
            return Err(RuntimeError::UnknownClass(class.to_string()));
        }
        Ok(Object::new(class))
    }

    // ===== Class data =====

    /// Declare a class-data attribute on a class and return the value now
    /// visible from it.
    ///
    /// Installs the accessor pair (the attribute name plus its decorated
    /// alias) on the class, then writes `initial` to the class's own slot
    /// only if no class along the chain already holds the attribute. If
    /// both the value and the accessor are already present the call is a
    /// no-op that returns the existing value, so declarations are safe to
    /// re-run on every reload.
    pub fn declare(
        &mut self,
        class: &str,
        attribute: &str,
        initial: Option<Value>,
    ) -> RuntimeResult<Option<Value>> {
        if !is_valid_attribute(attribute) {
            return Err(RuntimeError::InvalidAttributeName(attribute.to_string()));
        }
        let chain = self.linearize(class)?;

        let value_exists = self.store.find_owner(&chain, attribute).is_some();
        let accessor_installed = self
            .classes
            .get(class)
            .is_some_and(|c| c.has_accessor(attribute));

        if !(value_exists && accessor_installed) {
            self.install_accessors(class, attribute)?;
            if !value_exists {
                if let Some(value) = initial {
                    self.store.set(class, attribute, value);
                }
            }
        }
        Ok(self.store.resolve(&chain, attribute).cloned())
    }

    /// Write an attribute value directly into a class's own slot.
    ///
    /// The attribute does not need a declared accessor; a later dynamic
    /// call under its name will recreate one from the stored value.
    pub fn set(&mut self, class: &str, attribute: &str, value: Value) -> RuntimeResult<()> {
        if !is_valid_attribute(attribute) {
            return Err(RuntimeError::InvalidAttributeName(attribute.to_string()));
        }
        if !self.classes.contains(class) {
            return Err(RuntimeError::UnknownClass(class.to_string()));
        }
        self.store.set(class, attribute, value);
        Ok(())
    }

    /// Resolve an attribute along a class's chain.
    ///
    /// `Ok(None)` means no class in the chain holds a value; that is the
    /// "no value" outcome, not an error.
    pub fn resolve(&self, class: &str, attribute: &str) -> RuntimeResult<Option<&Value>> {
        let chain = self.linearize(class)?;
        Ok(self.store.resolve(&chain, attribute))
    }

    /// Name of the class whose own slot supplies the attribute for this
    /// class, if any.
    pub fn find_owner(&self, class: &str, attribute: &str) -> RuntimeResult<Option<String>> {
        let chain = self.linearize(class)?;
        Ok(self.store.find_owner(&chain, attribute).map(str::to_string))
    }

    /// All attribute names visible from a class, sorted
    pub fn attribute_names(&self, class: &str) -> RuntimeResult<Vec<String>> {
        let chain = self.linearize(class)?;
        Ok(self.store.attribute_names(&chain))
    }

    // ===== Dispatch =====

    /// Call a method on a class by name.
    ///
    /// Accessor entries read with no arguments (resolving along the chain,
    /// yielding [`Value::Null`] when nothing is stored) and write with one
    /// (into the receiver's own slot, then echoing the value back).
    /// Arguments past the first are ignored by accessors; native methods
    /// see the full slice.
    pub fn call(&mut self, class: &str, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        let chain = self.linearize(class)?;
        if let Some(method) = self.find_method(&chain, name) {
            return self.execute(class, &method, args);
        }
        self.dispatch_missing(class, name, args, &chain)
    }

    /// Call a method on an object's class
    pub fn call_on(&mut self, object: &Object, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        self.call(&object.class_name, name, args)
    }

    /// Run every finalizer along an object's chain once, nearest class
    /// first, and return how many ran. Classes without their own
    /// `finalize` entry are skipped; zero finalizers is not an error.
    pub fn finalize(&mut self, object: &Object) -> RuntimeResult<usize> {
        let chain = self.linearize(&object.class_name)?;
        let mut ran = 0;
        for class in &chain {
            let Some(method) = self
                .classes
                .get(class)
                .and_then(|c| c.get_method(FINALIZE_METHOD))
                .cloned()
            else {
                continue;
            };
            self.execute(&object.class_name, &method, &[])?;
            ran += 1;
        }
        Ok(ran)
    }

    // ===== Internals =====

    /// First method entry for `name` along the chain, cloned out so the
    /// registry borrow ends before the method runs.
    fn find_method(&self, chain: &[String], name: &str) -> Option<Method> {
        chain
            .iter()
            .find_map(|class| self.classes.get(class).and_then(|c| c.get_method(name)))
            .cloned()
    }

    fn execute(&mut self, receiver: &str, method: &Method, args: &[Value]) -> RuntimeResult<Value> {
        match method {
            Method::Native(f) => f(self, receiver, args),
            Method::Accessor { attribute } => {
                if let Some(value) = args.first() {
                    // Override-on-write: the receiver gets its own slot
                    // even when the accessor came from an ancestor.
                    self.store.set(receiver, attribute, value.clone());
                    Ok(value.clone())
                } else {
                    let chain = self.linearize(receiver)?;
                    Ok(self
                        .store
                        .resolve(&chain, attribute)
                        .cloned()
                        .unwrap_or(Value::Null))
                }
            }
        }
    }

    /// No method entry matched. Recreate a wiped accessor if the data
    /// store can vouch for the name, otherwise offer the call to each
    /// `missing_method` handler along the chain.
    fn dispatch_missing(
        &mut self,
        receiver: &str,
        name: &str,
        args: &[Value],
        chain: &[String],
    ) -> RuntimeResult<Value> {
        if let Some((owner, attribute)) = self.lazy_target(chain, name) {
            self.trace(format_args!(
                "recreating accessor '{attribute}' on '{owner}' (called as '{name}' on '{receiver}')"
            ));
            self.install_accessors(&owner, &attribute)?;
            return self.call(receiver, name, args);
        }

        for class in chain {
            let Some(fallback) = self.classes.get(class).and_then(|c| c.fallback) else {
                continue;
            };
            self.trace(format_args!(
                "offering '{name}' on '{receiver}' to handler on '{class}'"
            ));
            match fallback(self, receiver, name, args)? {
                FallbackOutcome::Handled(value) => return Ok(value),
                FallbackOutcome::Pass => continue,
            }
        }

        self.trace(format_args!("no handler claimed '{name}' on '{receiver}'"));
        Err(RuntimeError::NoSuchMethod {
            class: receiver.to_string(),
            name: name.to_string(),
        })
    }

    /// Decide whether a missing method name denotes a recreatable accessor.
    ///
    /// The plain attribute name is tried first, then the name with alias
    /// decoration stripped. Either way the accessor is reinstalled on the
    /// owning class, not the receiver, so every subclass regains it at
    /// once through inheritance.
    fn lazy_target(&self, chain: &[String], name: &str) -> Option<(String, String)> {
        if let Some(owner) = self.store.find_owner(chain, name) {
            return Some((owner.to_string(), name.to_string()));
        }
        let attribute = alias_attribute(name)?;
        let owner = self.store.find_owner(chain, attribute)?;
        Some((owner.to_string(), attribute.to_string()))
    }

    /// Install the accessor pair for an attribute on a class: the plain
    /// name and its decorated alias, both bound to the same slot.
    fn install_accessors(&mut self, class: &str, attribute: &str) -> RuntimeResult<()> {
        let alias = accessor_alias(attribute);
        let entry = self
            .classes
            .get_mut(class)
            .ok_or_else(|| RuntimeError::UnknownClass(class.to_string()))?;
        entry.add_method(
            attribute,
            Method::Accessor {
                attribute: attribute.to_string(),
            },
        );
        entry.add_method(
            alias,
            Method::Accessor {
                attribute: attribute.to_string(),
            },
        );
        self.trace(format_args!(
            "installed accessor pair for '{attribute}' on '{class}'"
        ));
        Ok(())
    }

    fn trace(&self, args: std::fmt::Arguments<'_>) {
        if self.options.trace {
            eprintln!("[holdover] {args}");
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Attribute names must be identifier-shaped: a letter or underscore, then
/// letters, digits, or underscores (Unicode identifier rules).
fn is_valid_attribute(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if first != '_' && !unicode_xid::UnicodeXID::is_xid_start(first) {
        return false;
    }
    chars.all(|c| c == '_' || unicode_xid::UnicodeXID::is_xid_continue(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_def_builder() {
        fn noop(_rt: &mut Runtime, _receiver: &str, _args: &[Value]) -> RuntimeResult<Value> {
            Ok(Value::Null)
        }

        let def = ClassDef::new("Widget")
            .parent("Base")
            .method("poke", noop)
            .class_data("skin", Some(Value::from("default")));
        assert_eq!(def.name(), "Widget");
        assert_eq!(def.parents, vec!["Base".to_string()]);
        assert_eq!(def.methods.len(), 1);
        assert_eq!(def.class_data.len(), 1);
        assert!(def.fallback.is_none());
    }

    #[test]
    fn test_register_unknown_parent_rejected() {
        let mut rt = Runtime::new();
        let err = rt
            .register(ClassDef::new("Child").parent("Missing"))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownClass(name) if name == "Missing"));
        assert!(!rt.has_class("Child"));
    }

    #[test]
    fn test_register_and_instantiate() {
        let mut rt = Runtime::new();
        rt.register(ClassDef::new("Stuff")).unwrap();
        assert!(rt.has_class("Stuff"));

        let obj = rt.instantiate("Stuff").unwrap();
        assert_eq!(obj.class_name, "Stuff");
        assert!(matches!(
            rt.instantiate("Nope"),
            Err(RuntimeError::UnknownClass(_))
        ));
    }

    #[test]
    fn test_declare_installs_accessor_pair() {
        let mut rt = Runtime::new();
        rt.register(ClassDef::new("Stuff")).unwrap();
        rt.declare("Stuff", "DataFile", Some(Value::from("/etc/stuff/data")))
            .unwrap();

        let class = rt.class("Stuff").unwrap();
        assert!(class.has_accessor("DataFile"));
        assert!(class.methods.contains("DataFile"));
        assert!(class.methods.contains("_DataFile_accessor"));
    }

    #[test]
    fn test_declare_rejects_bad_names() {
        let mut rt = Runtime::new();
        rt.register(ClassDef::new("Stuff")).unwrap();

        for bad in ["", "9lives", "has space", "dash-ed", "dot.ted"] {
            let err = rt.declare("Stuff", bad, None).unwrap_err();
            assert!(
                matches!(err, RuntimeError::InvalidAttributeName(_)),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn test_register_rejects_bad_attribute_names() {
        let mut rt = Runtime::new();
        let err = rt
            .register(ClassDef::new("Fresh").class_data("bad name", None))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidAttributeName(name) if name == "bad name"));
        assert!(!rt.has_class("Fresh"));
    }

    #[test]
    fn test_attribute_name_validation() {
        assert!(is_valid_attribute("DataFile"));
        assert!(is_valid_attribute("_private"));
        assert!(is_valid_attribute("retries2"));
        assert!(is_valid_attribute("café"));
        assert!(!is_valid_attribute(""));
        assert!(!is_valid_attribute("2fast"));
        assert!(!is_valid_attribute("a b"));
    }

    #[test]
    fn test_set_requires_known_class() {
        let mut rt = Runtime::new();
        assert!(matches!(
            rt.set("Ghost", "x", Value::Int(1)),
            Err(RuntimeError::UnknownClass(_))
        ));
    }

    #[test]
    fn test_set_then_resolve() {
        let mut rt = Runtime::new();
        rt.register(ClassDef::new("Stuff")).unwrap();
        rt.set("Stuff", "retries", Value::Int(3)).unwrap();
        assert_eq!(
            rt.resolve("Stuff", "retries").unwrap(),
            Some(&Value::Int(3))
        );
        assert_eq!(rt.resolve("Stuff", "unset").unwrap(), None);
    }

    #[test]
    fn test_trace_toggle() {
        let mut rt = Runtime::with_options(RuntimeOptions { trace: true });
        assert!(rt.options().trace);
        rt.set_trace(false);
        assert!(!rt.options().trace);
    }

    #[test]
    fn test_linearize_via_runtime() {
        let mut rt = Runtime::new();
        rt.register(ClassDef::new("A")).unwrap();
        rt.register(ClassDef::new("B").parent("A")).unwrap();
        rt.register(ClassDef::new("C").parent("A")).unwrap();
        rt.register(ClassDef::new("D").parent("B").parent("C"))
            .unwrap();

        assert_eq!(rt.linearize("D").unwrap(), vec!["D", "B", "A", "C"]);
    }
}
