//! Composite views: capability layers stacked over a value.
//!
//! Each `CompositeView` owns one capability set reference, the anchor (the
//! value originally passed to `compose`) and the next thing inward: either
//! another view or the `Subject`. Reads check the layer's own set first and
//! otherwise delegate inward; every callable handed out, whether it came from
//! a capability set or from the value itself, is bound to the anchor. Writes
//! always go to the subject.

pub mod subject;

pub use subject::{PrimitiveBox, Subject};

use crate::catalog::identity::TypeName;
use crate::catalog::model::{Capability, CapabilitySet, MethodFn, Receiver};
use crate::catalog::repository::CapabilityRegistry;
use crate::error::{ExtendError, ExtendResult};
use crate::value::{FunctionRef, Value};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// What a view delegates to when its own set lacks a name.
pub enum Inner<'r> {
    Subject(Subject),
    View(Box<CompositeView<'r>>),
}

/// One capability layer.
pub struct CompositeView<'r> {
    type_name: TypeName,
    capabilities: &'r CapabilitySet,
    anchor: Value,
    registry: &'r CapabilityRegistry,
    inner: Inner<'r>,
}

impl<'r> CompositeView<'r> {
    /// Layer `capabilities` (registered for `type_name`) over `target`.
    /// Callables resolve against `anchor`.
    pub fn build(
        registry: &'r CapabilityRegistry,
        target: Inner<'r>,
        type_name: TypeName,
        capabilities: &'r CapabilitySet,
        anchor: Value,
    ) -> Self {
        Self {
            type_name,
            capabilities,
            anchor,
            registry,
            inner: target,
        }
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    pub fn anchor(&self) -> &Value {
        &self.anchor
    }

    pub fn inner(&self) -> &Inner<'r> {
        &self.inner
    }

    /// The subject at the bottom of the stack.
    pub fn subject(&self) -> &Subject {
        match &self.inner {
            Inner::Subject(subject) => subject,
            Inner::View(view) => view.subject(),
        }
    }

    pub fn get(&self, name: &str) -> Member<'r> {
        if let Some(capability) = self.capabilities.get(name) {
            let origin = Some(self.type_name.clone());
            return match capability {
                Capability::Method(body) => Member::method(
                    name,
                    origin,
                    BoundMethod::capability(body.clone(), self.anchor.clone(), self.registry),
                ),
                Capability::Field(value) => bind(name, origin, value.clone(), &self.anchor),
                Capability::Getter(body) => {
                    let value = body(&Receiver::new(&self.anchor, self.registry));
                    Member::value(name, origin, value)
                }
            };
        }

        match &self.inner {
            Inner::View(view) => view.get(name),
            Inner::Subject(subject) => {
                trace!(property = name, layer = %self.type_name, "delegating to subject");
                bind(name, None, subject.get(name), &self.anchor)
            }
        }
    }

    pub fn set(&self, name: &str, value: Value) {
        match &self.inner {
            Inner::View(view) => view.set(name, value),
            Inner::Subject(subject) => subject.set(name, value),
        }
    }

    /// Type names of this layer and every layer inside it, outermost first.
    pub fn layers(&self) -> Vec<TypeName> {
        let mut names = vec![self.type_name.clone()];
        let mut current = &self.inner;
        while let Inner::View(view) = current {
            names.push(view.type_name.clone());
            current = &view.inner;
        }
        names
    }

    /// Capability names visible through this stack, in precedence order.
    /// A name shadowed by an outer layer is listed once, for the outer layer.
    pub fn shadowed(&self) -> Vec<(String, TypeName)> {
        let mut seen = Vec::<(String, TypeName)>::new();
        let mut layer = Some(self);
        while let Some(view) = layer {
            for name in view.capabilities.names() {
                if !seen.iter().any(|(existing, _)| existing == name) {
                    seen.push((name.to_string(), view.type_name.clone()));
                }
            }
            layer = match &view.inner {
                Inner::View(inner) => Some(inner.as_ref()),
                Inner::Subject(_) => None,
            };
        }
        seen
    }
}

impl fmt::Debug for CompositeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeView")
            .field("layers", &self.layers())
            .field("anchor", &self.anchor)
            .finish()
    }
}

fn bind<'r>(name: &str, origin: Option<TypeName>, value: Value, anchor: &Value) -> Member<'r> {
    match value {
        Value::Function(function) => {
            Member::method(name, origin, BoundMethod::native(function, anchor.clone()))
        }
        other => Member::value(name, origin, other),
    }
}

/// A callable bound to the anchor.
#[derive(Clone)]
pub struct BoundMethod<'r> {
    anchor: Value,
    callee: Callee<'r>,
}

#[derive(Clone)]
enum Callee<'r> {
    Capability {
        body: Rc<MethodFn>,
        registry: &'r CapabilityRegistry,
    },
    Native(FunctionRef),
}

impl<'r> BoundMethod<'r> {
    fn capability(body: Rc<MethodFn>, anchor: Value, registry: &'r CapabilityRegistry) -> Self {
        Self {
            anchor,
            callee: Callee::Capability { body, registry },
        }
    }

    fn native(function: FunctionRef, anchor: Value) -> Self {
        Self {
            anchor,
            callee: Callee::Native(function),
        }
    }

    /// The receiver every call observes.
    pub fn receiver(&self) -> &Value {
        &self.anchor
    }

    pub fn is_capability(&self) -> bool {
        matches!(self.callee, Callee::Capability { .. })
    }

    pub fn call(&self, args: &[Value]) -> ExtendResult<Value> {
        match &self.callee {
            Callee::Capability { body, registry } => {
                body(&Receiver::new(&self.anchor, registry), args)
            }
            Callee::Native(function) => function.call(&self.anchor, args),
        }
    }
}

impl fmt::Debug for BoundMethod<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.callee {
            Callee::Capability { .. } => "capability",
            Callee::Native(function) => function.name(),
        };
        f.debug_struct("BoundMethod")
            .field("callee", &kind)
            .field("receiver", &self.anchor)
            .finish()
    }
}

/// Result of reading a property through a composite.
#[derive(Clone, Debug)]
pub struct Member<'r> {
    name: String,
    origin: Option<TypeName>,
    resolved: Resolved<'r>,
}

#[derive(Clone, Debug)]
enum Resolved<'r> {
    Value(Value),
    Method(BoundMethod<'r>),
}

impl<'r> Member<'r> {
    fn value(name: &str, origin: Option<TypeName>, value: Value) -> Self {
        Self {
            name: name.to_string(),
            origin,
            resolved: Resolved::Value(value),
        }
    }

    fn method(name: &str, origin: Option<TypeName>, method: BoundMethod<'r>) -> Self {
        Self {
            name: name.to_string(),
            origin,
            resolved: Resolved::Method(method),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type whose capability set supplied the member; `None` when it came
    /// from the value itself.
    pub fn origin(&self) -> Option<&TypeName> {
        self.origin.as_ref()
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.resolved, Resolved::Method(_))
    }

    /// `undefined` reads as "no such property".
    pub fn is_undefined(&self) -> bool {
        matches!(self.resolved, Resolved::Value(Value::Undefined))
    }

    /// Plain value, if the member is not callable.
    pub fn as_value(&self) -> Option<&Value> {
        match &self.resolved {
            Resolved::Value(value) => Some(value),
            Resolved::Method(_) => None,
        }
    }

    pub fn as_method(&self) -> Option<&BoundMethod<'r>> {
        match &self.resolved {
            Resolved::Method(method) => Some(method),
            Resolved::Value(_) => None,
        }
    }

    /// Plain value, or `undefined` for callables.
    pub fn into_value(self) -> Value {
        match self.resolved {
            Resolved::Value(value) => value,
            Resolved::Method(_) => Value::Undefined,
        }
    }

    pub fn call(&self, args: &[Value]) -> ExtendResult<Value> {
        match &self.resolved {
            Resolved::Method(method) => method.call(args),
            Resolved::Value(_) => Err(ExtendError::NotCallable {
                name: self.name.clone(),
            }),
        }
    }
}

/// What `compose` hands back: the value itself when nothing applies, or the
/// outermost capability layer.
#[derive(Debug)]
pub enum Composite<'r> {
    Bare(Value),
    Layered(CompositeView<'r>),
}

impl<'r> Composite<'r> {
    pub fn get(&self, name: &str) -> Member<'r> {
        match self {
            Composite::Bare(value) => bind(name, None, value.get_property(name), value),
            Composite::Layered(view) => view.get(name),
        }
    }

    pub fn set(&self, name: &str, value: Value) {
        match self {
            Composite::Bare(target) => {
                if !target.set_property(name, value) {
                    trace!(property = name, "write on a primitive has no effect");
                }
            }
            Composite::Layered(view) => view.set(name, value),
        }
    }

    /// Read `name` and call it.
    pub fn invoke(&self, name: &str, args: &[Value]) -> ExtendResult<Value> {
        self.get(name).call(args)
    }

    /// The original value.
    pub fn value(&self) -> &Value {
        match self {
            Composite::Bare(value) => value,
            Composite::Layered(view) => view.anchor(),
        }
    }

    pub fn is_layered(&self) -> bool {
        matches!(self, Composite::Layered(_))
    }

    /// Number of capability layers.
    pub fn depth(&self) -> usize {
        self.layers().len()
    }

    /// Layer type names, outermost (most specific) first.
    pub fn layers(&self) -> Vec<TypeName> {
        match self {
            Composite::Bare(_) => Vec::new(),
            Composite::Layered(view) => view.layers(),
        }
    }

    /// Capability names in effect and the layer supplying each.
    pub fn shadowed(&self) -> Vec<(String, TypeName)> {
        match self {
            Composite::Bare(_) => Vec::new(),
            Composite::Layered(view) => view.shadowed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;

    fn layer<'r>(
        registry: &'r CapabilityRegistry,
        type_name: &str,
        inner: Inner<'r>,
        anchor: &Value,
    ) -> CompositeView<'r> {
        let (name, set) = registry.entry(type_name).expect("registered");
        CompositeView::build(registry, inner, name.clone(), set, anchor.clone())
    }

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry.register(
            "Object",
            CapabilitySet::new().field("shared", "outer?").field("base", 1),
        );
        registry.register(
            "Array",
            CapabilitySet::new()
                .field("shared", "array")
                .getter("first", |this| {
                    this.value()
                        .as_object()
                        .and_then(|obj| obj.item(0))
                        .unwrap_or_default()
                }),
        );
        registry
    }

    #[test]
    fn outer_layer_answers_first() {
        let registry = registry();
        let anchor = Value::from(ObjectRef::array(vec![Value::from("x")]));
        let inner = layer(&registry, "Object", Inner::Subject(Subject::of(anchor.clone())), &anchor);
        let outer = layer(&registry, "Array", Inner::View(Box::new(inner)), &anchor);

        assert_eq!(outer.get("shared").into_value(), Value::from("array"));
        assert_eq!(outer.get("base").origin(), Some(&TypeName::from("Object")));
        assert_eq!(outer.get("first").into_value(), Value::from("x"));
        assert_eq!(outer.get("length").into_value(), Value::from(1));
        assert_eq!(outer.layers(), vec![TypeName::from("Array"), TypeName::from("Object")]);
        assert_eq!(outer.subject().value(), &anchor);
    }

    #[test]
    fn shadowed_names_list_the_winning_layer_once() {
        let registry = registry();
        let anchor = Value::from(ObjectRef::array(Vec::new()));
        let inner = layer(&registry, "Object", Inner::Subject(Subject::of(anchor.clone())), &anchor);
        let outer = layer(&registry, "Array", Inner::View(Box::new(inner)), &anchor);

        let shadowed = outer.shadowed();
        let shared: Vec<_> = shadowed.iter().filter(|(name, _)| name == "shared").collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].1, TypeName::from("Array"));
        assert_eq!(shadowed.len(), 3);
    }

    #[test]
    fn bare_composites_still_bind_native_methods() {
        let value = Value::from("abc");
        let composite = Composite::Bare(value.clone());
        let member = composite.get("toUpperCase");
        assert_eq!(member.as_method().map(BoundMethod::receiver), Some(&value));
        assert!(!member.as_method().is_some_and(BoundMethod::is_capability));
        assert_eq!(member.call(&[]).unwrap(), Value::from("ABC"));
        assert_eq!(composite.depth(), 0);
    }
}
