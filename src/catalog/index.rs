//! Declared type hierarchy and lineage lookup.
//!
//! Every declared type has a single parent; `Object` is the implicit root.
//! Lineages are computed when types are declared, so answering "what are the
//! ancestors of this value" is a map lookup rather than a walk.

use crate::catalog::identity::{OBJECT, TypeName, constructor_name};
use crate::error::{ExtendError, ExtendResult};
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// Ancestor type names of a value, root-most first, most-derived last.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TypeChain(Vec<TypeName>);

impl TypeChain {
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TypeName> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value's own type.
    pub fn most_specific(&self) -> Option<&TypeName> {
        self.0.last()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|entry| entry == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(TypeName::as_str).collect()
    }
}

impl<'a> IntoIterator for &'a TypeChain {
    type Item = &'a TypeName;
    type IntoIter = std::slice::Iter<'a, TypeName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// Built-in types and their parents, in declaration order.
const STANDARD_TYPES: &[(&str, &str)] = &[
    ("Boolean", OBJECT),
    ("Number", OBJECT),
    ("String", OBJECT),
    ("Symbol", OBJECT),
    ("Function", OBJECT),
    ("Array", OBJECT),
    ("RegExp", OBJECT),
    ("Location", OBJECT),
    ("Response", OBJECT),
    ("NodeList", OBJECT),
    ("EventTarget", OBJECT),
    ("Node", "EventTarget"),
    ("Element", "Node"),
    ("HTMLElement", "Element"),
    ("HTMLImageElement", "HTMLElement"),
    ("Document", "Node"),
    ("DocumentFragment", "Node"),
    ("ShadowRoot", "DocumentFragment"),
];

/// Single-inheritance type table with precomputed lineages.
#[derive(Clone, Debug)]
pub struct TypeHierarchy {
    parents: BTreeMap<TypeName, Option<TypeName>>,
    lineages: BTreeMap<TypeName, TypeChain>,
}

impl Default for TypeHierarchy {
    fn default() -> Self {
        let root = TypeName::from(OBJECT);
        Self {
            parents: BTreeMap::from([(root.clone(), None)]),
            lineages: BTreeMap::from([(root.clone(), TypeChain(vec![root]))]),
        }
    }
}

impl TypeHierarchy {
    /// Hierarchy holding only the `Object` root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hierarchy pre-populated with the built-in value and DOM types.
    pub fn standard() -> Self {
        let mut hierarchy = Self::new();
        for (name, parent) in STANDARD_TYPES {
            // The table is acyclic and never redeclares the root.
            let _ = hierarchy.declare(*name, Some(*parent));
        }
        hierarchy
    }

    /// Declare `name` as a direct child of `parent` (or of `Object`).
    ///
    /// An undeclared parent is first declared as a child of `Object`.
    /// Redeclaring a type moves it, and its declared descendants, under the
    /// new parent. Declarations that would make a type its own ancestor, or
    /// give the root a parent, are rejected.
    pub fn declare(&mut self, name: impl Into<TypeName>, parent: Option<&str>) -> ExtendResult<()> {
        let name = name.into();
        let parent = TypeName::from(parent.unwrap_or(OBJECT));

        if name.as_str().is_empty() {
            return Err(ExtendError::InvalidType {
                name: name.0,
                reason: "type names must not be empty".to_string(),
            });
        }
        if name == OBJECT {
            return Err(ExtendError::InvalidType {
                name: name.0,
                reason: "the root type cannot have a parent".to_string(),
            });
        }
        if parent == name || self.lineage(parent.as_str()).contains(name.as_str()) {
            return Err(ExtendError::InvalidType {
                reason: format!("'{}' already descends from it", parent),
                name: name.0,
            });
        }

        if !self.parents.contains_key(&parent) {
            self.parents
                .insert(parent.clone(), Some(TypeName::from(OBJECT)));
        }
        self.parents.insert(name, Some(parent));
        self.rebuild_lineages();
        Ok(())
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    pub fn parent_of(&self, name: &str) -> Option<&TypeName> {
        self.parents.get(name).and_then(Option::as_ref)
    }

    /// Root-first lineage of `name`. Undeclared names are treated as direct
    /// children of `Object`.
    pub fn lineage(&self, name: &str) -> TypeChain {
        if let Some(chain) = self.lineages.get(name) {
            return chain.clone();
        }
        TypeChain(vec![TypeName::from(OBJECT), TypeName::from(name)])
    }

    /// Declared type names in stable order.
    pub fn types(&self) -> impl Iterator<Item = &TypeName> {
        self.parents.keys()
    }

    fn rebuild_lineages(&mut self) {
        let mut lineages = BTreeMap::new();
        for name in self.parents.keys() {
            let mut chain = vec![name.clone()];
            let mut current = name;
            while let Some(Some(parent)) = self.parents.get(current) {
                chain.push(parent.clone());
                current = parent;
            }
            chain.reverse();
            lineages.insert(name.clone(), TypeChain(chain));
        }
        self.lineages = lineages;
    }
}

/// Lineage of `value`'s constructing type, root-most first.
///
/// Null-likes and null-prototype objects have no lineage and yield an empty
/// chain.
pub fn chain(hierarchy: &TypeHierarchy, value: &Value) -> TypeChain {
    match constructor_name(value) {
        Some(name) => hierarchy.lineage(name.as_str()),
        None => TypeChain::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FunctionRef, ObjectRef};

    #[test]
    fn standard_lineages_are_root_first() {
        let hierarchy = TypeHierarchy::standard();
        assert_eq!(
            hierarchy.lineage("HTMLImageElement").names(),
            vec![
                "Object",
                "EventTarget",
                "Node",
                "Element",
                "HTMLElement",
                "HTMLImageElement"
            ]
        );
        assert_eq!(hierarchy.lineage("Object").names(), vec!["Object"]);
    }

    #[test]
    fn undeclared_types_hang_off_the_root() {
        let hierarchy = TypeHierarchy::new();
        assert_eq!(hierarchy.lineage("Widget").names(), vec!["Object", "Widget"]);
    }

    #[test]
    fn declaring_an_unknown_parent_declares_it_too() {
        let mut hierarchy = TypeHierarchy::new();
        hierarchy.declare("Dog", Some("Animal")).unwrap();
        assert!(hierarchy.is_declared("Animal"));
        assert_eq!(hierarchy.lineage("Dog").names(), vec!["Object", "Animal", "Dog"]);
    }

    #[test]
    fn redeclaring_moves_descendants() {
        let mut hierarchy = TypeHierarchy::new();
        hierarchy.declare("B", Some("A")).unwrap();
        hierarchy.declare("C", Some("B")).unwrap();
        hierarchy.declare("B", Some("Z")).unwrap();
        assert_eq!(hierarchy.lineage("C").names(), vec!["Object", "Z", "B", "C"]);
        assert_eq!(hierarchy.parent_of("B"), Some(&TypeName::from("Z")));
    }

    #[test]
    fn cycles_and_root_parents_are_rejected() {
        let mut hierarchy = TypeHierarchy::new();
        hierarchy.declare("B", Some("A")).unwrap();
        assert!(hierarchy.declare("A", Some("B")).is_err());
        assert!(hierarchy.declare("A", Some("A")).is_err());
        assert!(hierarchy.declare("Object", Some("A")).is_err());
        assert!(hierarchy.declare("", None).is_err());
        assert_eq!(hierarchy.lineage("B").names(), vec!["Object", "A", "B"]);
    }

    #[test]
    fn chain_follows_the_constructor_not_the_function_name() {
        let hierarchy = TypeHierarchy::standard();
        let named = FunctionRef::new("render", |_, _| Ok(Value::Undefined));
        assert_eq!(
            chain(&hierarchy, &Value::from(named)).names(),
            vec!["Object", "Function"]
        );
        assert_eq!(chain(&hierarchy, &Value::from(42)).names(), vec!["Object", "Number"]);
        assert!(chain(&hierarchy, &Value::Null).is_empty());
        assert!(chain(&hierarchy, &Value::from(ObjectRef::null_prototype())).is_empty());
    }

    #[test]
    fn chain_is_deterministic() {
        let hierarchy = TypeHierarchy::standard();
        let a = Value::from(ObjectRef::new("HTMLElement"));
        let b = Value::from(ObjectRef::new("HTMLElement"));
        assert_eq!(chain(&hierarchy, &a), chain(&hierarchy, &b));
        assert_eq!(chain(&hierarchy, &a), chain(&hierarchy, &a));
    }
}
