//! Capability sets: the per-type bundles of methods, fields and getters that
//! composite views layer over values.

use crate::catalog::repository::CapabilityRegistry;
use crate::compose::{compose, compose_as};
use crate::error::ExtendResult;
use crate::reference::Target;
use crate::value::Value;
use crate::view::Composite;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Body of a capability method. Receives the anchored value and the call
/// arguments.
pub type MethodFn = dyn Fn(&Receiver<'_>, &[Value]) -> ExtendResult<Value>;

/// Body of a computed capability property.
pub type GetterFn = dyn Fn(&Receiver<'_>) -> Value;

/// One entry of a capability set.
#[derive(Clone)]
pub enum Capability {
    Method(Rc<MethodFn>),
    Field(Value),
    Getter(Rc<GetterFn>),
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Method(_) => f.write_str("Method"),
            Capability::Field(value) => f.debug_tuple("Field").field(value).finish(),
            Capability::Getter(_) => f.write_str("Getter"),
        }
    }
}

/// Named capabilities contributed for a single type.
#[derive(Clone, Debug, Default)]
pub struct CapabilitySet {
    members: BTreeMap<String, Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Receiver<'_>, &[Value]) -> ExtendResult<Value> + 'static,
    {
        self.members
            .insert(name.into(), Capability::Method(Rc::new(body)));
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members
            .insert(name.into(), Capability::Field(value.into()));
        self
    }

    pub fn getter<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Receiver<'_>) -> Value + 'static,
    {
        self.members
            .insert(name.into(), Capability::Getter(Rc::new(body)));
        self
    }

    /// Insert or replace a single capability.
    pub fn insert(&mut self, name: impl Into<String>, capability: Capability) -> Option<Capability> {
        self.members.insert(name.into(), capability)
    }

    /// Copy every member of `other` into this set, replacing same-named ones.
    pub fn merge(&mut self, other: CapabilitySet) {
        self.members.extend(other.members);
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.members.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The implicit receiver of a capability call.
///
/// `value` is always the value originally handed to `compose`, never a layer
/// or a box. The registry is carried along so a capability can extend other
/// values (or itself) with the same registry.
#[derive(Clone, Copy)]
pub struct Receiver<'a> {
    value: &'a Value,
    registry: &'a CapabilityRegistry,
}

impl<'a> Receiver<'a> {
    pub fn new(value: &'a Value, registry: &'a CapabilityRegistry) -> Self {
        Self { value, registry }
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn registry(&self) -> &'a CapabilityRegistry {
        self.registry
    }

    /// Compose the receiver itself, e.g. to call a sibling capability.
    pub fn extended(&self) -> Composite<'a> {
        compose(self.registry, self.value)
    }

    /// Compose another value with the receiver's registry.
    pub fn extend(&self, value: &Value) -> Composite<'a> {
        compose(self.registry, value)
    }

    pub fn extend_as(&self, value: &Value, type_name: &str) -> Composite<'a> {
        compose_as(self.registry, value, type_name)
    }

    /// Interpret a reference argument against this receiver.
    pub fn resolve(&self, target: &Target) -> Value {
        target.resolve(self.value)
    }
}

impl fmt::Debug for Receiver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver").field("value", self.value).finish()
    }
}
