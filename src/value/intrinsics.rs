//! Native members of each value variant.
//!
//! These are what a lookup falls through to once every capability layer has
//! declined a name. Methods are materialized as fresh `FunctionRef`s on each
//! lookup and check their receiver when called, since callers may bind them
//! to any value.

use super::{FunctionRef, ObjectRef, RegExp, Value, format_number};
use crate::error::{ExtendError, ExtendResult};

/// Resolve a native member of `value`, if the variant has one named `name`.
pub fn lookup(value: &Value, name: &str) -> Option<Value> {
    match value {
        Value::Undefined | Value::Null => None,
        Value::Bool(_) => boolean_member(name),
        Value::Number(_) => number_member(name),
        Value::String(s) => string_member(s, name),
        Value::Symbol(sym) => match name {
            "description" => Some(Value::from(sym.description())),
            "toString" => Some(method("toString", |this, _| {
                Ok(Value::from(this.to_display_string()))
            })),
            _ => None,
        },
        Value::Object(obj) => object_member(obj, name),
        Value::Function(f) => match name {
            "name" => Some(Value::from(f.name())),
            _ => None,
        },
    }
}

fn method<F>(name: &str, body: F) -> Value
where
    F: Fn(&Value, &[Value]) -> ExtendResult<Value> + 'static,
{
    Value::Function(FunctionRef::new(name, body))
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn number_receiver(method: &str, this: &Value) -> ExtendResult<f64> {
    this.as_number()
        .ok_or_else(|| ExtendError::receiver(method, "number"))
}

fn string_receiver<'a>(method: &str, this: &'a Value) -> ExtendResult<&'a str> {
    this.as_str()
        .ok_or_else(|| ExtendError::receiver(method, "string"))
}

fn array_receiver(method: &str, this: &Value) -> ExtendResult<ObjectRef> {
    match this {
        Value::Object(obj) if obj.is_array_like() => Ok(obj.clone()),
        _ => Err(ExtendError::receiver(method, "array-like")),
    }
}

fn string_arg(method: &str, args: &[Value], index: usize) -> ExtendResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) if !other.is_nil() => Ok(other.to_display_string()),
        _ => Err(ExtendError::invalid_argument(
            method,
            format!("argument {index} must be a string"),
        )),
    }
}

fn boolean_member(name: &str) -> Option<Value> {
    match name {
        "toString" => Some(method("toString", |this, _| {
            this.as_bool()
                .map(|b| Value::from(b.to_string()))
                .ok_or_else(|| ExtendError::receiver("toString", "boolean"))
        })),
        "valueOf" => Some(method("valueOf", |this, _| {
            this.as_bool()
                .map(Value::from)
                .ok_or_else(|| ExtendError::receiver("valueOf", "boolean"))
        })),
        _ => None,
    }
}

fn number_member(name: &str) -> Option<Value> {
    match name {
        "toFixed" => Some(method("toFixed", |this, args| {
            let n = number_receiver("toFixed", this)?;
            let digits = arg(args, 0).as_number().unwrap_or(0.0);
            if !(0.0..=100.0).contains(&digits) {
                return Err(ExtendError::invalid_argument(
                    "toFixed",
                    "digits must be between 0 and 100",
                ));
            }
            Ok(Value::from(to_fixed(n, digits as usize)))
        })),
        "toString" => Some(method("toString", |this, _| {
            number_receiver("toString", this).map(|n| Value::from(format_number(n)))
        })),
        "valueOf" => Some(method("valueOf", |this, _| {
            number_receiver("valueOf", this).map(Value::from)
        })),
        _ => None,
    }
}

fn string_member(s: &str, name: &str) -> Option<Value> {
    let member = match name {
        "length" => Value::from(s.chars().count()),
        "toUpperCase" => method("toUpperCase", |this, _| {
            string_receiver("toUpperCase", this).map(|s| Value::from(s.to_uppercase()))
        }),
        "toLowerCase" => method("toLowerCase", |this, _| {
            string_receiver("toLowerCase", this).map(|s| Value::from(s.to_lowercase()))
        }),
        "trim" => method("trim", |this, _| {
            string_receiver("trim", this).map(|s| Value::from(s.trim()))
        }),
        "includes" => method("includes", |this, args| {
            let s = string_receiver("includes", this)?;
            let search = string_arg("includes", args, 0)?;
            Ok(Value::from(s.contains(search.as_str())))
        }),
        "startsWith" => method("startsWith", |this, args| {
            let s = string_receiver("startsWith", this)?;
            let search = string_arg("startsWith", args, 0)?;
            Ok(Value::from(s.starts_with(search.as_str())))
        }),
        "endsWith" => method("endsWith", |this, args| {
            let s = string_receiver("endsWith", this)?;
            let search = string_arg("endsWith", args, 0)?;
            Ok(Value::from(s.ends_with(search.as_str())))
        }),
        "padStart" => method("padStart", |this, args| {
            let s = string_receiver("padStart", this)?;
            let target = arg(args, 0).as_number().unwrap_or(0.0).max(0.0) as usize;
            let fill = match arg(args, 1) {
                Value::Undefined => " ".to_string(),
                other => other.to_display_string(),
            };
            Ok(Value::from(pad_start(s, target, &fill)))
        }),
        "replaceAll" => method("replaceAll", |this, args| {
            let s = string_receiver("replaceAll", this)?;
            let from = string_arg("replaceAll", args, 0)?;
            let to = string_arg("replaceAll", args, 1)?;
            Ok(Value::from(s.replace(from.as_str(), &to)))
        }),
        "split" => method("split", |this, args| {
            let s = string_receiver("split", this)?;
            let sep = string_arg("split", args, 0)?;
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::from(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(Value::from).collect()
            };
            Ok(Value::from(ObjectRef::array(parts)))
        }),
        "toString" | "valueOf" => method(name, |this, _| {
            string_receiver("toString", this).map(Value::from)
        }),
        _ => return None,
    };
    Some(member)
}

// Above this, scaled values no longer have an exact integer part.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Fixed-point formatting with ties rounded away from zero.
pub(crate) fn to_fixed(n: f64, digits: usize) -> String {
    if !n.is_finite() || n.abs() >= 1e21 {
        return format_number(n);
    }
    let factor = 10f64.powi(digits as i32);
    let scaled = n.abs() * factor;
    if !scaled.is_finite() || scaled >= EXACT_INTEGER_LIMIT {
        return format!("{n:.digits$}");
    }
    let sign = if n < 0.0 { "-" } else { "" };
    format!("{sign}{:.digits$}", scaled.round() / factor)
}

pub(crate) fn pad_start(s: &str, target: usize, fill: &str) -> String {
    let len = s.chars().count();
    if target <= len || fill.is_empty() {
        return s.to_string();
    }
    let mut padded: String = fill.chars().cycle().take(target - len).collect();
    padded.push_str(s);
    padded
}

fn regexp_member(re: &RegExp, name: &str) -> Option<Value> {
    let member = match name {
        "source" => Value::from(re.source()),
        "flags" => Value::from(re.flags()),
        "global" => Value::from(re.is_global()),
        "ignoreCase" => Value::from(re.is_ignore_case()),
        "test" => method("test", |this, args| {
            let re = this
                .as_regexp()
                .ok_or_else(|| ExtendError::receiver("test", "RegExp"))?;
            let input = arg(args, 0).to_display_string();
            Ok(Value::from(re.regex().is_match(&input)))
        }),
        _ => return None,
    };
    Some(member)
}

fn object_member(obj: &ObjectRef, name: &str) -> Option<Value> {
    if let Some(member) = obj.as_regexp().and_then(|re| regexp_member(&re, name)) {
        return Some(member);
    }
    match name {
        "hasOwnProperty" => {
            return Some(method("hasOwnProperty", |this, args| match this {
                Value::Object(obj) => Ok(Value::from(obj.has(&arg(args, 0).to_display_string()))),
                _ => Ok(Value::from(false)),
            }));
        }
        "toString" => {
            return Some(method("toString", |this, _| {
                Ok(Value::from(this.to_display_string()))
            }));
        }
        _ => {}
    }

    let items = obj.items()?;
    let member = match name {
        "length" => Value::from(items.len()),
        "at" => method("at", |this, args| {
            let list = array_receiver("at", this)?;
            let len = list.items().map(|items| items.len()).unwrap_or(0) as f64;
            let mut index = arg(args, 0).as_number().unwrap_or(0.0).trunc();
            if index < 0.0 {
                index += len;
            }
            if index < 0.0 || index >= len {
                return Ok(Value::Undefined);
            }
            Ok(list.item(index as usize).unwrap_or_default())
        }),
        "push" => method("push", |this, args| {
            let list = array_receiver("push", this)?;
            let mut len = list.items().map(|items| items.len()).unwrap_or(0);
            for value in args {
                len = list.push(value.clone()).unwrap_or(len);
            }
            Ok(Value::from(len))
        }),
        "includes" => method("includes", |this, args| {
            let list = array_receiver("includes", this)?;
            let needle = arg(args, 0);
            let found = list
                .items()
                .unwrap_or_default()
                .iter()
                .any(|item| *item == needle);
            Ok(Value::from(found))
        }),
        "indexOf" => method("indexOf", |this, args| {
            let list = array_receiver("indexOf", this)?;
            let needle = arg(args, 0);
            let position = list
                .items()
                .unwrap_or_default()
                .iter()
                .position(|item| *item == needle);
            Ok(position.map(Value::from).unwrap_or(Value::from(-1)))
        }),
        "join" => method("join", |this, args| {
            let list = array_receiver("join", this)?;
            let sep = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                other => other.to_display_string(),
            };
            let joined = list
                .items()
                .unwrap_or_default()
                .iter()
                .map(|item| {
                    if item.is_nil() {
                        String::new()
                    } else {
                        item.to_display_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(&sep);
            Ok(Value::from(joined))
        }),
        _ => return None,
    };
    Some(member)
}
