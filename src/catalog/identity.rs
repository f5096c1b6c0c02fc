//! Type names and type identification.
//!
//! `identify` computes the canonical type name of any value; capability sets
//! are registered and looked up under these names.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Name of the implicit root of every lineage.
pub const OBJECT: &str = "Object";

/// Type name reported for objects created without a prototype.
pub const NULL_OBJECT: &str = "NullObject";

/// Canonical name of a type (e.g., `Number`, `HTMLElement`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(pub String);

impl TypeName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        TypeName(value.to_string())
    }
}

impl From<String> for TypeName {
    fn from(value: String) -> Self {
        TypeName(value)
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TypeName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TypeName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Canonical type name of `value`.
///
/// Resolution order: null-likes by name, named functions by their own name,
/// then the constructing type, then the string tag, then `NullObject` for
/// objects without a constructor, and finally the runtime category.
pub fn identify(value: &Value) -> TypeName {
    match value {
        Value::Undefined => return "undefined".into(),
        Value::Null => return "null".into(),
        Value::Function(f) if !f.name().is_empty() => return f.name().into(),
        _ => {}
    }

    if let Some(name) = constructor_name(value) {
        return name;
    }

    if let Value::Object(obj) = value {
        if let Some(tag) = obj.string_tag().filter(|tag| !tag.is_empty()) {
            return tag.into();
        }
        if obj.class().is_none() {
            return NULL_OBJECT.into();
        }
    }

    runtime_category(value).into()
}

/// Name of the type that constructed `value`, which is where its lineage
/// starts. Functions are all constructed by `Function`, whatever their name.
pub fn constructor_name(value: &Value) -> Option<TypeName> {
    let name = match value {
        Value::Undefined | Value::Null => return None,
        Value::Bool(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Symbol(_) => "Symbol",
        Value::Function(_) => "Function",
        Value::Object(obj) => {
            return obj.class().filter(|class| !class.is_empty()).map(TypeName);
        }
    };
    Some(name.into())
}

/// Coarse runtime category, as reported by `typeof`.
pub fn runtime_category(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Null => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Symbol(_) => "symbol",
        Value::Object(_) => "object",
        Value::Function(_) => "function",
    }
}
