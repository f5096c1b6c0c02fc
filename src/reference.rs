//! Reference arguments that may point back at the value being extended.
//!
//! Capabilities that take a position or fallback argument accept either a
//! concrete value or "the receiver itself". Callers express the latter by
//! passing `Target::SelfReference.to_value()` (the reserved `self` symbol);
//! the capability turns its argument back into a `Target` and decides what
//! self-reference means for it. The engine never inspects these arguments.

use crate::value::{Symbol, Value};

/// Reserved symbol standing for "the value currently being extended".
pub const SELF_REFERENCE: Symbol = Symbol::reserved(0, "self");

#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    Explicit(Value),
    SelfReference,
}

impl Target {
    /// Classify a raw argument.
    pub fn from_argument(value: &Value) -> Self {
        match value {
            Value::Symbol(sym) if *sym == SELF_REFERENCE => Target::SelfReference,
            other => Target::Explicit(other.clone()),
        }
    }

    pub fn is_self(&self) -> bool {
        matches!(self, Target::SelfReference)
    }

    /// The referenced value, given the receiver self-references stand for.
    pub fn resolve(&self, receiver: &Value) -> Value {
        match self {
            Target::Explicit(value) => value.clone(),
            Target::SelfReference => receiver.clone(),
        }
    }

    /// Argument form of this target.
    pub fn to_value(&self) -> Value {
        match self {
            Target::Explicit(value) => value.clone(),
            Target::SelfReference => Value::Symbol(SELF_REFERENCE),
        }
    }
}

impl From<Value> for Target {
    fn from(value: Value) -> Self {
        Target::from_argument(&value)
    }
}
