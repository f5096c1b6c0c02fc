//! Conversion between `Value` and JSON documents.
//!
//! JSON objects become objects of class `Object`. A few reserved keys shape
//! the decoded object: `"$class"` names the constructing type (`null` means a
//! null-prototype object), `"$tag"` sets the string tag and `"$items"` makes
//! the object array-like. JSON arrays decode to `Array` objects. Key order is
//! preserved in both directions.

use super::{ObjectRef, Value};
use serde_json::{Map, Number, Value as Json};
use std::collections::BTreeSet;

pub const CLASS_KEY: &str = "$class";
pub const TAG_KEY: &str = "$tag";
pub const ITEMS_KEY: &str = "$items";

// Integral numbers up to 2^53 - 1 render as JSON integers.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Value {
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => {
                Value::Object(ObjectRef::array(items.iter().map(Value::from_json).collect()))
            }
            Json::Object(map) => Value::Object(object_from_json(map)),
        }
    }

    /// JSON rendering for reports. Functions and symbols render as strings,
    /// `undefined` as `null`, and cycles as `"[Circular]"`.
    pub fn to_json(&self) -> Json {
        let mut visiting = BTreeSet::new();
        to_json_inner(self, &mut visiting)
    }
}

fn object_from_json(map: &Map<String, Json>) -> ObjectRef {
    let obj = match map.get(CLASS_KEY) {
        Some(Json::Null) => ObjectRef::null_prototype(),
        Some(Json::String(class)) => ObjectRef::new(class.clone()),
        _ => ObjectRef::plain(),
    };
    let obj = match map.get(TAG_KEY).and_then(Json::as_str) {
        Some(tag) => obj.with_string_tag(tag),
        None => obj,
    };
    let obj = match map.get(ITEMS_KEY).and_then(Json::as_array) {
        Some(items) => obj.with_items(items.iter().map(Value::from_json).collect()),
        None => obj,
    };
    for (key, value) in map {
        if matches!(key.as_str(), CLASS_KEY | TAG_KEY | ITEMS_KEY) {
            continue;
        }
        obj.set(key, Value::from_json(value));
    }
    obj
}

fn to_json_inner(value: &Value, visiting: &mut BTreeSet<usize>) -> Json {
    match value {
        Value::Undefined | Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
            Json::Number(Number::from(*n as i64))
        }
        Value::Number(n) => Number::from_f64(*n)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(value.to_display_string())),
        Value::String(s) => Json::String(s.clone()),
        Value::Symbol(_) | Value::Function(_) => Json::String(value.to_display_string()),
        Value::Object(obj) if obj.as_regexp().is_some() => Json::String(value.to_display_string()),
        Value::Object(obj) => {
            let address = obj.address();
            if !visiting.insert(address) {
                return Json::String("[Circular]".to_string());
            }
            let rendered = match obj.items() {
                Some(items) if obj.class().as_deref() == Some("Array") => Json::Array(
                    items
                        .iter()
                        .map(|item| to_json_inner(item, visiting))
                        .collect(),
                ),
                items => {
                    let mut map = Map::new();
                    if obj.class().as_deref() != Some("Object") {
                        map.insert(
                            CLASS_KEY.to_string(),
                            obj.class().map(Json::String).unwrap_or(Json::Null),
                        );
                    }
                    if let Some(tag) = obj.string_tag() {
                        map.insert(TAG_KEY.to_string(), Json::String(tag));
                    }
                    if let Some(items) = items {
                        map.insert(
                            ITEMS_KEY.to_string(),
                            Json::Array(
                                items
                                    .iter()
                                    .map(|item| to_json_inner(item, visiting))
                                    .collect(),
                            ),
                        );
                    }
                    for (key, value) in obj.entries() {
                        map.insert(key, to_json_inner(&value, visiting));
                    }
                    Json::Object(map)
                }
            };
            visiting.remove(&address);
            rendered
        }
    }
}
