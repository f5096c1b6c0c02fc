//! Type identification, lineage and capability registration.
//!
//! `identity` names values, `index` answers lineage questions from the
//! declared hierarchy, `model` defines capability sets, `repository` holds
//! them per type, and `manifest` loads declarative additions from JSON.

pub mod identity;
pub mod index;
pub mod manifest;
pub mod model;
pub mod repository;

pub use identity::{NULL_OBJECT, OBJECT, TypeName, constructor_name, identify, runtime_category};
pub use index::{TypeChain, TypeHierarchy, chain};
pub use manifest::{
    CapabilityManifest, MANIFEST_SCHEMA_VERSION, TypeDeclaration, load_manifest_from_path,
    parse_manifest,
};
pub use model::{Capability, CapabilitySet, GetterFn, MethodFn, Receiver};
pub use repository::CapabilityRegistry;
