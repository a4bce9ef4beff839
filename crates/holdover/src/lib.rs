//! Inheritable class data that survives in-place class redefinition
//!
//! Class-level values normally die with the class object that holds them:
//! redefine the class (a hot reload, a plugin upgrade, a test harness
//! rebuilding fixtures) and every accessor and every stored value is gone.
//! This crate keeps the values in a side table owned by the [`Runtime`] and
//! keyed by class *name*, so replacing a class object cannot touch its data.
//! Accessors the replacement wiped are recreated lazily: the first call to a
//! missing method whose name the data store can vouch for reinstalls the
//! accessor on the owning class and retries the call.
//!
//! Attributes are inherited through a linearized chain (the class itself,
//! then its parents depth-first left-to-right) and resolve to the nearest
//! value. Writing through an accessor gives the writing class its own slot,
//! so subclass overrides never touch the ancestor's value. Reading an
//! attribute nothing in the chain holds yields [`Value::Null`] from the
//! dynamic path and `None` from the typed one; absence is never an error.
//!
//! # Example
//!
//! ```
//! use holdover::{ClassDef, Runtime, Value};
//!
//! let mut rt = Runtime::new();
//! rt.register(
//!     ClassDef::new("Stuff").class_data("DataFile", Some(Value::from("/etc/stuff/data"))),
//! )?;
//! assert_eq!(rt.call("Stuff", "DataFile", &[])?, Value::from("/etc/stuff/data"));
//!
//! // Redefine the class in place. The replacement has an empty method
//! // table: both accessor entries are gone.
//! rt.register(ClassDef::new("Stuff"))?;
//! assert!(rt.class("Stuff").is_some_and(|c| c.methods.is_empty()));
//!
//! // The value survived in the side table, and the first call back through
//! // the accessor name rebuilds the method entry on the fly.
//! assert_eq!(rt.call("Stuff", "DataFile", &[])?, Value::from("/etc/stuff/data"));
//! # Ok::<(), holdover::RuntimeError>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Object model: classes, method tables, accessors, and instances
pub mod object;

/// Class registry and inheritance linearization
pub mod registry;

/// The runtime: registration, class data, and method dispatch
pub mod runtime;

/// Side table holding class-data values keyed by class name
pub mod store;

/// Dynamic values stored in class data
pub mod value;

pub use object::{
    accessor_alias, alias_attribute, Class, FallbackFn, FallbackOutcome, Method, MethodTable,
    NativeFn, Object,
};
pub use registry::ClassRegistry;
pub use runtime::{ClassDef, Runtime, RuntimeOptions, FINALIZE_METHOD};
pub use store::ClassDataStore;
pub use value::Value;

use thiserror::Error;

/// Errors surfaced by the runtime.
///
/// Missing class-data values are deliberately not represented here; an
/// attribute nothing in the chain holds resolves to a sentinel (`None` or
/// [`Value::Null`]) rather than an error.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Dispatch exhausted the method tables, the recreatable-accessor
    /// check, and every missing-method handler along the chain
    #[error("no such method '{name}' on class '{class}'")]
    NoSuchMethod {
        /// Class the call was made on
        class: String,
        /// Method name that failed to resolve
        name: String,
    },

    /// Attribute name is not identifier-shaped
    #[error("invalid attribute name: '{0}'")]
    InvalidAttributeName(String),

    /// Named class is not registered
    #[error("unknown class: '{0}'")]
    UnknownClass(String),
}

/// Result alias used throughout the crate
pub type RuntimeResult<T> = Result<T, RuntimeError>;
