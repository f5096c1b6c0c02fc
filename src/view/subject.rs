//! The value at the bottom of a stack of composite views.

use crate::value::Value;
use tracing::trace;

/// Carrier for a primitive so it can sit underneath a view.
///
/// Lives for one composition call and is never shared between calls.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveBox {
    value: Value,
}

impl PrimitiveBox {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// The carried primitive.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the carried primitive.
    pub fn set(&mut self, value: Value) {
        self.value = value;
    }
}

/// What the innermost view wraps: an object-like value directly, or a boxed
/// primitive.
#[derive(Clone, Debug, PartialEq)]
pub enum Subject {
    Reference(Value),
    Primitive(PrimitiveBox),
}

impl Subject {
    /// Box `value` unless it can hold properties itself.
    pub fn of(value: Value) -> Self {
        if value.is_object_like() {
            Subject::Reference(value)
        } else {
            Subject::Primitive(PrimitiveBox::new(value))
        }
    }

    /// The unwrapped value.
    pub fn value(&self) -> &Value {
        match self {
            Subject::Reference(value) => value,
            Subject::Primitive(boxed) => boxed.value(),
        }
    }

    pub fn is_boxed(&self) -> bool {
        matches!(self, Subject::Primitive(_))
    }

    pub fn get(&self, name: &str) -> Value {
        self.value().get_property(name)
    }

    /// Write through to the unwrapped value. Primitives hold no properties,
    /// so writes against a boxed primitive are accepted and dropped.
    pub fn set(&self, name: &str, value: Value) {
        if !self.value().set_property(name, value) {
            trace!(property = name, "write on a primitive subject has no effect");
        }
    }
}
