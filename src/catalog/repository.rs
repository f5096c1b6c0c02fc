//! Registry of capability sets keyed by type name.
//!
//! Built once at startup (by code, manifests, or both) and then handed by
//! shared reference to every composition call. Composite views borrow the
//! registry, so it cannot change while any view is alive.

use crate::catalog::identity::TypeName;
use crate::catalog::index::{TypeChain, TypeHierarchy, chain};
use crate::catalog::manifest::{CapabilityManifest, load_manifest_from_path};
use crate::catalog::model::CapabilitySet;
use crate::error::ExtendResult;
use crate::value::Value;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Type hierarchy plus one capability set per type name.
#[derive(Clone, Debug)]
pub struct CapabilityRegistry {
    hierarchy: TypeHierarchy,
    sets: BTreeMap<TypeName, CapabilitySet>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::with_hierarchy(TypeHierarchy::standard())
    }
}

impl CapabilityRegistry {
    /// Empty registry over the standard type hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hierarchy(hierarchy: TypeHierarchy) -> Self {
        Self {
            hierarchy,
            sets: BTreeMap::new(),
        }
    }

    /// Register `set` for `type_name`. Last write wins; the replaced set is
    /// returned.
    pub fn register(
        &mut self,
        type_name: impl Into<TypeName>,
        set: CapabilitySet,
    ) -> Option<CapabilitySet> {
        let type_name = type_name.into();
        debug!(type_name = %type_name, members = set.len(), "registering capability set");
        let previous = self.sets.insert(type_name.clone(), set);
        if previous.is_some() {
            warn!(type_name = %type_name, "capability set replaced an existing registration");
        }
        previous
    }

    /// Merge `set` into whatever is registered for `type_name`, registering it
    /// when nothing is.
    pub fn extend_set(&mut self, type_name: impl Into<TypeName>, set: CapabilitySet) {
        let type_name = type_name.into();
        match self.sets.get_mut(&type_name) {
            Some(existing) => {
                debug!(type_name = %type_name, members = set.len(), "merging capability set");
                existing.merge(set);
            }
            None => {
                self.register(type_name, set);
            }
        }
    }

    /// Register a copy of `existing`'s set under `alias`. Returns false when
    /// `existing` has no set.
    pub fn register_alias(&mut self, alias: impl Into<TypeName>, existing: &str) -> bool {
        let alias = alias.into();
        match self.sets.get(existing).cloned() {
            Some(set) => {
                self.register(alias, set);
                true
            }
            None => {
                warn!(alias = %alias, existing, "alias target has no capability set");
                false
            }
        }
    }

    /// Capability set registered for `type_name`. Absence means the type
    /// contributes nothing.
    pub fn lookup(&self, type_name: &str) -> Option<&CapabilitySet> {
        self.sets.get(type_name)
    }

    /// Like `lookup`, also returning the registry's own key.
    pub fn entry(&self, type_name: &str) -> Option<(&TypeName, &CapabilitySet)> {
        self.sets.get_key_value(type_name)
    }

    /// Registered type names in stable order.
    pub fn type_names(&self) -> impl Iterator<Item = &TypeName> {
        self.sets.keys()
    }

    pub fn declare_type(&mut self, name: impl Into<TypeName>, parent: Option<&str>) -> ExtendResult<()> {
        self.hierarchy.declare(name, parent)
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    /// Lineage of `value` under this registry's hierarchy.
    pub fn chain_of(&self, value: &Value) -> TypeChain {
        chain(&self.hierarchy, value)
    }

    /// Declare the manifest's types, then merge its capability fields.
    pub fn apply_manifest(&mut self, manifest: &CapabilityManifest) -> Result<()> {
        for decl in &manifest.types {
            self.hierarchy
                .declare(decl.name.clone(), decl.parent.as_ref().map(TypeName::as_str))
                .with_context(|| format!("declaring type {}", decl.name))?;
        }
        for (type_name, set) in manifest.capability_sets() {
            self.extend_set(type_name, set);
        }
        Ok(())
    }

    /// Load, validate and apply a manifest file.
    pub fn load_manifest(&mut self, path: &Path) -> Result<()> {
        let manifest = load_manifest_from_path(path)?;
        self.apply_manifest(&manifest)
            .with_context(|| format!("applying manifest {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::Capability;

    #[test]
    fn last_registration_wins() {
        let mut registry = CapabilityRegistry::new();
        assert!(registry.register("Number", CapabilitySet::new().field("v", 1)).is_none());
        let previous = registry.register("Number", CapabilitySet::new().field("v", 2));
        assert!(previous.is_some());
        assert!(matches!(
            registry.lookup("Number").and_then(|set| set.get("v")),
            Some(Capability::Field(v)) if *v == Value::from(2)
        ));
    }

    #[test]
    fn missing_sets_are_absent_not_errors() {
        let registry = CapabilityRegistry::new();
        assert!(registry.lookup("Number").is_none());
        assert_eq!(registry.type_names().count(), 0);
    }

    #[test]
    fn aliases_copy_the_existing_set() {
        let mut registry = CapabilityRegistry::new();
        registry.register("Document", CapabilitySet::new().field("kind", "doc"));
        assert!(registry.register_alias("ShadowRoot", "Document"));
        assert!(registry.lookup("ShadowRoot").unwrap().contains("kind"));
        assert!(!registry.register_alias("Other", "Missing"));
        assert!(registry.lookup("Other").is_none());
    }

    #[test]
    fn extend_set_merges_into_existing_registrations() {
        let mut registry = CapabilityRegistry::new();
        registry.register("String", CapabilitySet::new().field("a", 1));
        registry.extend_set("String", CapabilitySet::new().field("b", 2));
        registry.extend_set("Number", CapabilitySet::new().field("c", 3));
        let strings = registry.lookup("String").unwrap();
        assert!(strings.contains("a") && strings.contains("b"));
        assert!(registry.lookup("Number").unwrap().contains("c"));
    }

    #[test]
    fn chain_of_uses_declared_types() {
        let mut registry = CapabilityRegistry::new();
        registry.declare_type("Dog", Some("Animal")).unwrap();
        let dog = Value::from(crate::value::ObjectRef::new("Dog"));
        assert_eq!(registry.chain_of(&dog).names(), vec!["Object", "Animal", "Dog"]);
    }
}
