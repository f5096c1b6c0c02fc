//! Capability composition for dynamically typed values.
//!
//! Named sets of methods, fields and getters are registered per type. At call
//! time `compose` resolves a value's lineage through the declared type
//! hierarchy and stacks one view per registered ancestor over the value, so
//! that the most-derived definition of a name wins and every method observes
//! the original value as its receiver. Null-like values and values without
//! any applicable set come back unchanged.
//!
//! The registry is an explicit value handed to every entry point; there is
//! no process-wide state. Additional types and field capabilities can be
//! loaded from JSON manifests validated against
//! `schema/extend_manifest.schema.json`.

use std::env;
use std::path::PathBuf;

pub mod catalog;
pub mod compose;
pub mod error;
pub mod logging;
pub mod reference;
pub(crate) mod schema_loader;
pub mod stdext;
pub mod value;
pub mod view;

pub use catalog::{
    Capability, CapabilityManifest, CapabilityRegistry, CapabilitySet, Receiver, TypeChain,
    TypeHierarchy, TypeName, chain, identify, load_manifest_from_path,
};
pub use compose::{compose, compose_as};
pub use error::{ExtendError, ExtendResult};
pub use reference::{SELF_REFERENCE, Target};
pub use value::{FunctionRef, ObjectRef, RegExp, Symbol, Value};
pub use view::{BoundMethod, Composite, CompositeView, Member, PrimitiveBox, Subject};

/// Environment variable listing manifest files to load.
pub const MANIFESTS_ENV: &str = "EXTENDKIT_MANIFESTS";

/// Split comma- or whitespace-delimited configuration lists into tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Manifest paths named by `EXTENDKIT_MANIFESTS`, in listed order.
pub fn manifest_paths_from_env() -> Vec<PathBuf> {
    env::var(MANIFESTS_ENV)
        .map(|raw| split_list(&raw).into_iter().map(PathBuf::from).collect())
        .unwrap_or_default()
}
