//! Standard capability sets for numbers, strings, plain objects and
//! array-likes.
//!
//! These are ordinary clients of the engine: they only use the public
//! registration surface, and call each other through `Receiver::extend`
//! exactly as application code would.

use crate::catalog::model::{CapabilitySet, Receiver};
use crate::catalog::repository::CapabilityRegistry;
use crate::error::{ExtendError, ExtendResult};
use crate::reference::Target;
use crate::value::intrinsics::pad_start;
use crate::value::{FunctionRef, ObjectRef, RegExp, Value, format_number};
use regex::NoExpand;
use std::cmp::Ordering;
use tracing::warn;

/// Register every standard set.
pub fn install(registry: &mut CapabilityRegistry) {
    registry.register("Object", object_capabilities());
    registry.register("Number", number_capabilities());
    registry.register("String", string_capabilities());
    registry.register("Array", array_capabilities());
    registry.register("NodeList", CapabilitySet::new().method("count", count));
}

/// Registry over the standard hierarchy with the standard sets installed.
pub fn standard_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    install(&mut registry);
    registry
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn callback(method: &str, args: &[Value], index: usize) -> ExtendResult<FunctionRef> {
    match args.get(index) {
        Some(Value::Function(f)) => Ok(f.clone()),
        _ => Err(ExtendError::invalid_argument(
            method,
            format!("argument {index} must be a function"),
        )),
    }
}

fn string_or(args: &[Value], index: usize, default: &str) -> String {
    match args.get(index) {
        None | Some(Value::Undefined) => default.to_string(),
        Some(value) => value.to_display_string(),
    }
}

// Number

pub fn number_capabilities() -> CapabilitySet {
    CapabilitySet::new()
        .method("timeFormatted", time_formatted)
        .method("padStart", number_pad_start)
        .method("in", number_in)
}

fn receiver_number(method: &str, this: &Receiver<'_>) -> ExtendResult<f64> {
    this.value()
        .as_number()
        .ok_or_else(|| ExtendError::receiver(method, "number"))
}

/// Seconds as `[h:]mm:ss`.
fn time_formatted(this: &Receiver<'_>, _: &[Value]) -> ExtendResult<Value> {
    let total = receiver_number("timeFormatted", this)?;
    let padded = |n: f64| -> ExtendResult<String> {
        let out = this
            .extend(&Value::from(n))
            .invoke("padStart", &[Value::from(2)])?;
        Ok(out.to_display_string())
    };

    let h = (total / 3600.0).floor();
    let m = ((total % 3600.0) / 60.0).floor();
    let s = total % 60.0;
    let formatted = if total >= 3600.0 {
        format!("{}:{}:{}", format_number(h), padded(m)?, padded(s)?)
    } else {
        format!("{}:{}", format_number(m), padded(s)?)
    };
    Ok(Value::from(formatted))
}

/// Rounds to an integer, then left-pads (default `'0'`).
fn number_pad_start(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    receiver_number("padStart", this)?;
    let rounded = this.extended().invoke("toFixed", &[])?.to_display_string();
    let length = arg(args, 0).as_number().unwrap_or(0.0).max(0.0) as usize;
    let fill = string_or(args, 1, "0");
    Ok(Value::from(pad_start(&rounded, length, &fill)))
}

/// Whether the number lies in `{ min, max }`, inclusive.
fn number_in(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let n = receiver_number("in", this)?;
    let bounds = arg(args, 0).as_object().and_then(|range| {
        let min = range.get("min")?.as_number()?;
        let max = range.get("max")?.as_number()?;
        Some((min, max))
    });
    match bounds {
        Some((min, max)) => Ok(Value::from(n >= min && n <= max)),
        None => {
            warn!("[in] range must be an object with numeric 'min' and 'max'");
            Ok(Value::from(false))
        }
    }
}

// String

pub fn string_capabilities() -> CapabilitySet {
    CapabilitySet::new()
        .method("capitalized", capitalized)
        .method("kebabFromCamelCase", kebab_from_camel_case)
        .method("contains", contains)
        .method("containsOneOf", contains_one_of)
        .method("matches", matches)
        .method("in", string_in)
        .method("parse", parse)
        .method("parseDuration", parse_duration)
        .method("parseRelativeDate", parse_relative_date)
        .method("parseFileSize", parse_file_size)
        .method("replaceMultiple", replace_multiple)
        .method("remove", remove)
}

fn receiver_str<'a>(method: &str, this: &Receiver<'a>) -> ExtendResult<&'a str> {
    this.value()
        .as_str()
        .ok_or_else(|| ExtendError::receiver(method, "string"))
}

/// Search argument of the string helpers: a `RegExp` object, or any other
/// value read as literal text.
enum Pattern {
    Text(String),
    Regex(RegExp),
}

impl Pattern {
    fn from_argument(value: &Value) -> Self {
        match value.as_regexp() {
            Some(re) => Pattern::Regex(re),
            None => Pattern::Text(value.to_display_string()),
        }
    }

    /// Strings are compiled as regex source.
    fn into_regexp(self) -> ExtendResult<RegExp> {
        match self {
            Pattern::Regex(re) => Ok(re),
            Pattern::Text(source) => RegExp::new(&source, ""),
        }
    }
}

enum Replacement {
    Text(String),
    Callback(FunctionRef),
}

impl Replacement {
    fn from_argument(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Function(f)) => Replacement::Callback(f.clone()),
            None | Some(Value::Undefined) | Some(Value::Null) => Replacement::Text(String::new()),
            Some(other) => Replacement::Text(other.to_display_string()),
        }
    }
}

fn capture_value(capture: Option<regex::Match<'_>>) -> Value {
    capture.map(|m| Value::from(m.as_str())).unwrap_or_default()
}

/// Replaces the first match, or every match of a global regex.
fn replace_regex(re: &RegExp, s: &str, replacement: &Replacement) -> ExtendResult<String> {
    let limit = if re.is_global() { usize::MAX } else { 1 };
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in re.regex().captures_iter(s).take(limit) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&s[last..whole.start()]);
        match replacement {
            Replacement::Text(text) => caps.expand(text, &mut out),
            Replacement::Callback(f) => {
                let mut args: Vec<Value> = caps.iter().map(capture_value).collect();
                args.push(Value::from(whole.start()));
                args.push(Value::from(s));
                out.push_str(&f.call(&Value::Undefined, &args)?.to_display_string());
            }
        }
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Ok(out)
}

/// Replaces the first occurrence of literal text.
fn replace_text(search: &str, s: &str, replacement: &Replacement) -> ExtendResult<String> {
    let Some(start) = s.find(search) else {
        return Ok(s.to_string());
    };
    let inserted = match replacement {
        Replacement::Text(text) => text.clone(),
        Replacement::Callback(f) => f
            .call(
                &Value::Undefined,
                &[Value::from(search), Value::from(start), Value::from(s)],
            )?
            .to_display_string(),
    };
    Ok(format!("{}{inserted}{}", &s[..start], &s[start + search.len()..]))
}

/// Every word starting with an uppercase letter.
fn capitalized(this: &Receiver<'_>, _: &[Value]) -> ExtendResult<Value> {
    let s = receiver_str("capitalized", this)?;
    let word_start = RegExp::new(r"(?-u:\b).", "g")?;
    let out = word_start
        .regex()
        .replace_all(s, |caps: &regex::Captures<'_>| caps[0].to_uppercase());
    Ok(Value::from(out.into_owned()))
}

fn kebab_from_camel_case(this: &Receiver<'_>, _: &[Value]) -> ExtendResult<Value> {
    let s = receiver_str("kebabFromCamelCase", this)?;
    let upper = RegExp::new("([A-Z])", "g")?;
    let out = upper
        .regex()
        .replace_all(s, |caps: &regex::Captures<'_>| format!("-{}", caps[1].to_lowercase()));
    Ok(Value::from(out.into_owned()))
}

/// `contains(search, ignoreCase = false)`; a regex search defers to `matches`.
fn contains(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let s = receiver_str("contains", this)?;
    let ignore_case = arg(args, 1).as_bool().unwrap_or(false);
    let found = match Pattern::from_argument(&arg(args, 0)) {
        Pattern::Regex(_) => {
            return this
                .extended()
                .invoke("matches", &[arg(args, 0), Value::from(ignore_case)]);
        }
        Pattern::Text(search) if ignore_case => s.to_lowercase().contains(&search.to_lowercase()),
        Pattern::Text(search) => s.contains(search.as_str()),
    };
    Ok(Value::from(found))
}

/// `containsOneOf([search...], ignoreCase = false)`.
fn contains_one_of(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let searches = arg(args, 0)
        .as_object()
        .and_then(ObjectRef::items)
        .ok_or_else(|| ExtendError::invalid_argument("containsOneOf", "expected an array"))?;
    let ignore_case = arg(args, 1);
    let extended = this.extended();
    for search in searches {
        if extended
            .invoke("contains", &[search, ignore_case.clone()])?
            .is_truthy()
        {
            return Ok(Value::from(true));
        }
    }
    Ok(Value::from(false))
}

/// `matches(regex, forceIgnoreCase = false)`.
fn matches(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let s = receiver_str("matches", this)?;
    let mut re = Pattern::from_argument(&arg(args, 0)).into_regexp()?;
    if arg(args, 1).is_truthy() {
        re = re.ignoring_case()?;
    }
    Ok(Value::from(re.regex().is_match(s)))
}

/// Whether the string is one of the items of an array-like.
fn string_in(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let needle = this.value();
    let items = arg(args, 0)
        .as_object()
        .and_then(ObjectRef::items)
        .ok_or_else(|| ExtendError::invalid_argument("in", "expected an array-like"))?;
    Ok(Value::from(items.iter().any(|item| item == needle)))
}

/// `parse(regex, transform = null, fallback = null)`.
///
/// Without a match the fallback is returned, a self-reference meaning the
/// string itself. With named groups the result is a prototype-less object of
/// the groups, mapped through `mapValues(transform)` when a transform is
/// given. Without named groups the transform receives the whole match and
/// every group as arguments; with no transform the match and groups come back
/// as an array. A global regex yields every whole match.
fn parse(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let s = receiver_str("parse", this)?;
    let re = Pattern::from_argument(&arg(args, 0)).into_regexp()?;
    let transform = match args.get(1) {
        None | Some(Value::Undefined) | Some(Value::Null) => None,
        Some(Value::Function(f)) => Some(f.clone()),
        Some(_) => {
            return Err(ExtendError::invalid_argument(
                "parse",
                "transform must be a function or null",
            ));
        }
    };
    let fallback = match args.get(2) {
        Some(value) => Target::from_argument(value),
        None => Target::Explicit(Value::Null),
    };

    if re.is_global() {
        let found: Vec<Value> = re
            .regex()
            .find_iter(s)
            .map(|m| Value::from(m.as_str()))
            .collect();
        if found.is_empty() {
            return Ok(this.resolve(&fallback));
        }
        return Ok(Value::from(ObjectRef::array(found)));
    }

    let Some(caps) = re.regex().captures(s) else {
        return Ok(this.resolve(&fallback));
    };
    let names = re.group_names();
    if !names.is_empty() {
        let groups = ObjectRef::null_prototype();
        for name in names {
            groups.set(name, capture_value(caps.name(name)));
        }
        let groups = Value::from(groups);
        return match transform {
            Some(transform) => this
                .extend(&groups)
                .invoke("mapValues", &[Value::from(transform)]),
            None => Ok(groups),
        };
    }
    let captures: Vec<Value> = caps.iter().map(capture_value).collect();
    match transform {
        Some(transform) => transform.call(&Value::Undefined, &captures),
        None => Ok(Value::from(ObjectRef::array(captures))),
    }
}

const CLOCK_PATTERN: &str = r"(?:(?<hour>\d*):)?(?<min>\d+):(?<sec>\d\d)";
const UNIT_PATTERN: &str = r"(?<value>-?\d+)(?<unit>(ms|s|m|h|d|wk|mo|y)?)$";

const DURATION_FACTORS: &[(&str, f64)] = &[
    ("ms", 0.001),
    ("s", 1.0),
    ("m", 60.0),
    ("h", 3600.0),
    ("d", 86_400.0),
    ("wk", 604_800.0),
    ("mo", 2_628_000.0),
    ("y", 31_536_000.0),
];

const FILE_SIZE_FACTORS: &[(&str, f64)] = &[
    ("b", 1.0),
    ("kb", 1024.0),
    ("mb", 1_048_576.0),
    ("gb", 1_073_741_824.0),
    ("tb", 1_099_511_627_776.0),
];

fn factor(table: &[(&str, f64)], unit: &str) -> f64 {
    table
        .iter()
        .find(|(name, _)| *name == unit)
        .map_or(1.0, |(_, factor)| *factor)
}

/// `Number(value)` as a callable.
fn number_function() -> FunctionRef {
    FunctionRef::new("Number", |_, args| Ok(Value::from(arg(args, 0).to_number())))
}

/// Seconds from `1:00:55` / `55:01`, plain `3600`, or `<n><unit>` with unit
/// one of ms, s, m, h, d, wk, mo, y. `null` without any digit; NaN when
/// digits are present but no form matches.
fn parse_duration(this: &Receiver<'_>, _: &[Value]) -> ExtendResult<Value> {
    let s = receiver_str("parseDuration", this)?;
    let extended = this.extended();
    if !extended.invoke("matches", &[Value::from(r"\d")])?.is_truthy() {
        return Ok(Value::Null);
    }

    let empty = Value::from(ObjectRef::plain());
    if s.contains(':') {
        let clock = RegExp::new(CLOCK_PATTERN, "")?;
        let parts = extended.invoke(
            "parse",
            &[Value::from(clock), Value::from(number_function()), empty],
        )?;
        let hour = parts.get_property("hour");
        let hour = if hour.is_truthy() { hour.to_number() } else { 0.0 };
        let min = parts.get_property("min").to_number();
        let sec = parts.get_property("sec").to_number();
        return Ok(Value::from(hour * 3600.0 + min * 60.0 + sec));
    }

    let numeric_or_text = FunctionRef::anonymous(|_, args| {
        let raw = arg(args, 0);
        let n = raw.to_number();
        Ok(if n != 0.0 && !n.is_nan() { Value::from(n) } else { raw })
    });
    let with_unit = RegExp::new(UNIT_PATTERN, "")?;
    let parts = extended.invoke(
        "parse",
        &[Value::from(with_unit), Value::from(numeric_or_text), empty],
    )?;
    let unit = parts.get_property("unit");
    let factor = factor(DURATION_FACTORS, unit.as_str().unwrap_or(""));
    Ok(Value::from(parts.get_property("value").to_number() * factor))
}

/// Phrases like `in 5 minutes`, `about a day ago` or `3 weeks ago` as
/// signed seconds.
fn parse_relative_date(this: &Receiver<'_>, _: &[Value]) -> ExtendResult<Value> {
    receiver_str("parseRelativeDate", this)?;
    let rules: &[(&str, bool, &str)] = &[
        ("^in ", true, ""),
        ("about ", false, ""),
        ("^a ", true, "1 "),
        (" seconds?", true, "s"),
        (" minutes?", true, "m"),
        (" hours?", true, "h"),
        (" days?", true, "d"),
        (" weeks?", true, "wk"),
        (" months?", true, "mo"),
        (" years?", true, "y"),
        ("(.+) ago$", true, "-$1"),
    ];
    let pairs = rules
        .iter()
        .map(|(pattern, is_regex, replacement)| -> ExtendResult<Value> {
            let pattern = if *is_regex {
                Value::from(RegExp::new(pattern, "")?)
            } else {
                Value::from(*pattern)
            };
            Ok(Value::from(ObjectRef::array(vec![pattern, Value::from(*replacement)])))
        })
        .collect::<ExtendResult<Vec<_>>>()?;

    let sanitized = this
        .extended()
        .invoke("replaceMultiple", &[Value::from(ObjectRef::array(pairs))])?;
    this.extend(&sanitized).invoke("parseDuration", &[])
}

/// Bytes from `512 B`, `1.5 KB`, `2gb`, ... (binary multiples). `null` when
/// no size is found.
fn parse_file_size(this: &Receiver<'_>, _: &[Value]) -> ExtendResult<Value> {
    let s = receiver_str("parseFileSize", this)?;
    let size = RegExp::new(r"(?<value>-?\d+(\.\d+)?)\s*(?<unit>[KMGT]?B)", "i")?;
    let Some(caps) = size.regex().captures(s) else {
        return Ok(Value::Null);
    };
    let value = capture_value(caps.name("value")).to_number();
    let unit = caps
        .name("unit")
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();
    Ok(Value::from(value * factor(FILE_SIZE_FACTORS, &unit)))
}

/// Applies `[[pattern, replacement?], ...]` in order. Each pair replaces the
/// first occurrence, or every match of a global regex; a missing replacement
/// means removal and a function replacement is called per match.
fn replace_multiple(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let s = receiver_str("replaceMultiple", this)?;
    let pairs = arg(args, 0)
        .as_object()
        .and_then(ObjectRef::items)
        .ok_or_else(|| ExtendError::invalid_argument("replaceMultiple", "expected an array of pairs"))?;

    let mut out = s.to_string();
    for pair in pairs {
        let Some(parts) = pair.as_object().and_then(ObjectRef::items) else {
            return Err(ExtendError::invalid_argument(
                "replaceMultiple",
                "each pair must be an array",
            ));
        };
        let replacement = Replacement::from_argument(parts.get(1));
        out = match Pattern::from_argument(&arg(&parts, 0)) {
            Pattern::Regex(re) => replace_regex(&re, &out, &replacement)?,
            Pattern::Text(search) => replace_text(&search, &out, &replacement)?,
        };
    }
    Ok(Value::from(out))
}

/// Every occurrence of the pattern removed, whether or not a regex is global.
fn remove(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let s = receiver_str("remove", this)?;
    let out = match Pattern::from_argument(&arg(args, 0)) {
        Pattern::Regex(re) => re.regex().replace_all(s, NoExpand("")).into_owned(),
        Pattern::Text(search) if search.is_empty() => s.to_string(),
        Pattern::Text(search) => s.replace(search.as_str(), ""),
    };
    Ok(Value::from(out))
}

// Object

pub fn object_capabilities() -> CapabilitySet {
    CapabilitySet::new()
        .method("forEach", object_for_each)
        .method("mapArray", object_map_array)
        .method("mapKeys", object_map_keys)
        .method("mapValues", object_map_values)
        .method("join", object_join)
}

/// Own enumerable entries: indexed items (or a string's characters) as
/// `"0".."n-1"`, then named properties in insertion order.
fn entries(value: &Value) -> Vec<(String, Value)> {
    let indexed: Vec<Value> = match value {
        Value::Object(obj) => obj.items().unwrap_or_default(),
        Value::String(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
        _ => Vec::new(),
    };
    let named = match value {
        Value::Object(obj) => obj.entries(),
        Value::Function(f) => f.entries(),
        _ => Vec::new(),
    };
    indexed
        .into_iter()
        .enumerate()
        .map(|(index, item)| (index.to_string(), item))
        .chain(named)
        .collect()
}

/// `forEach((key, value, index) => ...)`.
fn object_for_each(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let body = callback("forEach", args, 0)?;
    for (index, (key, value)) in entries(this.value()).into_iter().enumerate() {
        body.call(&Value::Undefined, &[Value::from(key), value, Value::from(index)])?;
    }
    Ok(Value::Undefined)
}

fn object_map_array(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let transform = callback("mapArray", args, 0)?;
    let mapped = entries(this.value())
        .into_iter()
        .enumerate()
        .map(|(index, (key, value))| {
            transform.call(&Value::Undefined, &[Value::from(key), value, Value::from(index)])
        })
        .collect::<ExtendResult<Vec<_>>>()?;
    Ok(Value::from(ObjectRef::array(mapped)))
}

/// New object with keys replaced by `transform(key, value, index)`.
fn object_map_keys(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let transform = callback("mapKeys", args, 0)?;
    let out = ObjectRef::plain();
    for (index, (key, value)) in entries(this.value()).into_iter().enumerate() {
        let new_key = transform.call(
            &Value::Undefined,
            &[Value::from(key), value.clone(), Value::from(index)],
        )?;
        out.set(&new_key.to_display_string(), value);
    }
    Ok(Value::from(out))
}

/// New object with values replaced by `transform(value, key, index)`.
fn object_map_values(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let transform = callback("mapValues", args, 0)?;
    let out = ObjectRef::plain();
    for (index, (key, value)) in entries(this.value()).into_iter().enumerate() {
        let new_value = transform.call(
            &Value::Undefined,
            &[value, Value::from(key.as_str()), Value::from(index)],
        )?;
        out.set(&key, new_value);
    }
    Ok(Value::from(out))
}

/// `join(kvSep = ": ", entrySep = "\n")`.
fn object_join(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let kv_sep = string_or(args, 0, ": ");
    let entry_sep = string_or(args, 1, "\n");
    let joined = entries(this.value())
        .into_iter()
        .map(|(key, value)| format!("{key}{kv_sep}{}", value.to_display_string()))
        .collect::<Vec<_>>()
        .join(&entry_sep);
    Ok(Value::from(joined))
}

// Array

pub fn array_capabilities() -> CapabilitySet {
    CapabilitySet::new()
        .method("last", array_last)
        .method("count", count)
        .method("filterMap", array_filter_map)
        .method("mapObject", array_map_object)
        .method("sortedBy", array_sorted_by)
}

fn receiver_items(method: &str, this: &Receiver<'_>) -> ExtendResult<Vec<Value>> {
    this.value()
        .as_object()
        .and_then(ObjectRef::items)
        .ok_or_else(|| ExtendError::receiver(method, "array-like"))
}

fn array_last(this: &Receiver<'_>, _: &[Value]) -> ExtendResult<Value> {
    let items = receiver_items("last", this)?;
    Ok(items.last().cloned().unwrap_or_default())
}

/// Item count, or the number of items passing `filter(item, index, list)`
/// when one is given.
fn count(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let items = receiver_items("count", this)?;
    let Some(Value::Function(filter)) = args.first() else {
        return Ok(Value::from(items.len()));
    };
    let list = this.value();
    let mut matched = 0usize;
    for (index, item) in items.into_iter().enumerate() {
        if filter
            .call(&Value::Undefined, &[item, Value::from(index), list.clone()])?
            .is_truthy()
        {
            matched += 1;
        }
    }
    Ok(Value::from(matched))
}

/// `filterMap(filter, transform)`: transform of every item passing filter.
fn array_filter_map(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let filter = callback("filterMap", args, 0)?;
    let transform = callback("filterMap", args, 1)?;
    let mut out = Vec::new();
    for item in receiver_items("filterMap", this)? {
        if filter.call(&Value::Undefined, &[item.clone()])?.is_truthy() {
            out.push(transform.call(&Value::Undefined, &[item])?);
        }
    }
    Ok(Value::from(ObjectRef::array(out)))
}

/// Object built from the `[key, value]` pairs `transform` returns per item.
fn array_map_object(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let transform = callback("mapObject", args, 0)?;
    let out = ObjectRef::plain();
    for item in receiver_items("mapObject", this)? {
        let pair = transform.call(&Value::Undefined, &[item])?;
        let Some(parts) = pair.as_object().and_then(ObjectRef::items) else {
            return Err(ExtendError::invalid_argument(
                "mapObject",
                "transform must return a [key, value] array",
            ));
        };
        out.set(&arg(&parts, 0).to_display_string(), arg(&parts, 1));
    }
    Ok(Value::from(out))
}

/// Relational order of two sort keys: strings compare by code point,
/// anything else numerically with NaN after every number.
fn key_order(a: &Value, b: &Value) -> Ordering {
    if let (Value::String(a), Value::String(b)) = (a, b) {
        return a.cmp(b);
    }
    let (a, b) = (a.to_number(), b.to_number());
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}

/// `sortedBy(transform, inverse = false)`: a sorted copy, descending by
/// `transform(item)` unless `inverse`. Equal keys keep their order.
fn array_sorted_by(this: &Receiver<'_>, args: &[Value]) -> ExtendResult<Value> {
    let transform = callback("sortedBy", args, 0)?;
    let inverse = arg(args, 1).is_truthy();
    let mut keyed = receiver_items("sortedBy", this)?
        .into_iter()
        .map(|item| -> ExtendResult<(Value, Value)> {
            Ok((transform.call(&Value::Undefined, &[item.clone()])?, item))
        })
        .collect::<ExtendResult<Vec<(Value, Value)>>>()?;
    keyed.sort_by(|(a, _), (b, _)| {
        let order = key_order(a, b);
        if inverse { order } else { order.reverse() }
    });
    let sorted = keyed.into_iter().map(|(_, item)| item).collect();
    Ok(Value::from(ObjectRef::array(sorted)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;

    fn call(registry: &CapabilityRegistry, value: Value, name: &str, args: &[Value]) -> Value {
        compose(registry, &value).invoke(name, args).expect(name)
    }

    fn closure<F>(body: F) -> Value
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        Value::from(FunctionRef::anonymous(move |_, args| Ok(body(args))))
    }

    #[test]
    fn time_formatting_pads_minutes_and_seconds() {
        let registry = standard_registry();
        assert_eq!(call(&registry, Value::from(265.2), "timeFormatted", &[]), Value::from("4:25"));
        assert_eq!(call(&registry, Value::from(7285), "timeFormatted", &[]), Value::from("2:01:25"));
    }

    #[test]
    fn number_range_checks_bounds_and_config() {
        let registry = standard_registry();
        let range = Value::from(ObjectRef::plain().with_property("min", 0).with_property("max", 10));
        assert_eq!(call(&registry, Value::from(10), "in", &[range.clone()]), Value::from(true));
        assert_eq!(call(&registry, Value::from(11), "in", &[range]), Value::from(false));
        // Malformed ranges are logged and answered with false.
        let broken = Value::from(ObjectRef::plain().with_property("min", 0));
        assert_eq!(call(&registry, Value::from(5), "in", &[broken]), Value::from(false));
    }

    #[test]
    fn string_case_helpers() {
        let registry = standard_registry();
        assert_eq!(
            call(&registry, Value::from("hello big world"), "capitalized", &[]),
            Value::from("Hello Big World")
        );
        assert_eq!(
            call(&registry, Value::from("fontSize"), "kebabFromCamelCase", &[]),
            Value::from("font-size")
        );
    }

    #[test]
    fn string_search_helpers() {
        let registry = standard_registry();
        let s = Value::from("FooBar123");
        assert_eq!(
            call(&registry, s.clone(), "contains", &[Value::from("foo"), Value::from(true)]),
            Value::from(true)
        );
        assert_eq!(call(&registry, s.clone(), "contains", &[Value::from("foo")]), Value::from(false));
        let searches = Value::from(ObjectRef::array(vec![Value::from("zzz"), Value::from("bar")]));
        assert_eq!(
            call(&registry, s, "containsOneOf", &[searches, Value::from(true)]),
            Value::from(true)
        );
        let list = Value::from(ObjectRef::array(vec![Value::from("a"), Value::from("b")]));
        assert_eq!(call(&registry, Value::from("b"), "in", &[list]), Value::from(true));
    }

    #[test]
    fn searches_accept_any_pattern() {
        let registry = standard_registry();
        let s = Value::from("FooBar123");
        // Non-string searches are read as text.
        assert_eq!(call(&registry, s.clone(), "contains", &[Value::from(1)]), Value::from(true));
        assert_eq!(call(&registry, s.clone(), "contains", &[regex(r"\d+", "")]), Value::from(true));
        assert_eq!(
            call(&registry, s.clone(), "contains", &[regex("foo", ""), Value::from(true)]),
            Value::from(true)
        );
        assert_eq!(call(&registry, s.clone(), "matches", &[Value::from("^Foo")]), Value::from(true));
        assert_eq!(call(&registry, s.clone(), "matches", &[Value::from("^foo")]), Value::from(false));
        assert_eq!(
            call(&registry, s, "matches", &[Value::from("^foo"), Value::from(true)]),
            Value::from(true)
        );
    }

    #[test]
    fn removal_and_replacement_take_regexes() {
        let registry = standard_registry();
        let s = Value::from("a1b22c333");
        assert_eq!(call(&registry, s.clone(), "remove", &[regex(r"\d+", "")]), Value::from("abc"));
        assert_eq!(
            call(&registry, Value::from("x-y-z"), "remove", &[Value::from("-")]),
            Value::from("xyz")
        );

        let first_only = list(vec![regex(r"\d", ""), Value::from("#")]);
        let global = list(vec![regex(r"[a-c]", "g"), Value::from("<$0>")]);
        let shout = closure(|args| Value::from(args[0].to_display_string().to_uppercase()));
        let callback = list(vec![Value::from("<b>"), shout]);
        let pairs = list(vec![first_only, global, callback]);
        assert_eq!(
            call(&registry, s, "replaceMultiple", &[pairs]),
            Value::from("<a>#<B>22<c>333")
        );
    }

    #[test]
    fn replace_multiple_applies_pairs_in_order() {
        let registry = standard_registry();
        let pairs = Value::from(ObjectRef::array(vec![
            Value::from(ObjectRef::array(vec![Value::from(" days"), Value::from("d")])),
            Value::from(ObjectRef::array(vec![Value::from("about ")])),
        ]));
        assert_eq!(
            call(&registry, Value::from("about 3 days"), "replaceMultiple", &[pairs]),
            Value::from("3d")
        );
    }

    fn regex(source: &str, flags: &str) -> Value {
        Value::from(RegExp::new(source, flags).unwrap())
    }

    fn list(items: Vec<Value>) -> Value {
        Value::from(ObjectRef::array(items))
    }

    #[test]
    fn durations_parse_clock_and_unit_forms() {
        let registry = standard_registry();
        let parse = |s: &str| call(&registry, Value::from(s), "parseDuration", &[]);
        assert_eq!(parse("1:00:55"), Value::from(3655));
        assert_eq!(parse("55:01"), Value::from(3301));
        assert_eq!(parse("00:19"), Value::from(19));
        assert_eq!(parse("3600"), Value::from(3600));
        assert_eq!(parse("60m"), Value::from(3600));
        assert_eq!(parse("-2h"), Value::from(-7200));
        assert_eq!(parse("500ms"), Value::from(0.5));
        assert_eq!(parse("2wk"), Value::from(1_209_600));
        assert_eq!(parse("soon"), Value::Null);
    }

    #[test]
    fn durations_match_inside_longer_strings() {
        let registry = standard_registry();
        let parse = |s: &str| call(&registry, Value::from(s), "parseDuration", &[]);
        // Only the trailing integer and its unit are read.
        assert_eq!(parse("1.5h"), Value::from(18_000));
        assert_eq!(parse("length 4:05 total"), Value::from(245));
        let unmatched = parse("1:2").as_number().unwrap();
        assert!(unmatched.is_nan());
    }

    #[test]
    fn relative_dates_become_signed_seconds() {
        let registry = standard_registry();
        let parse = |s: &str| call(&registry, Value::from(s), "parseRelativeDate", &[]);
        assert_eq!(parse("in 5 minutes"), Value::from(300));
        assert_eq!(parse("about a day ago"), Value::from(-86_400));
        assert_eq!(parse("3 weeks ago"), Value::from(-1_814_400));
        assert_eq!(parse("2 months"), Value::from(5_256_000));
        assert_eq!(parse("yesterday"), Value::Null);
    }

    #[test]
    fn file_sizes_use_binary_multiples() {
        let registry = standard_registry();
        let parse = |s: &str| call(&registry, Value::from(s), "parseFileSize", &[]);
        assert_eq!(parse("512 B"), Value::from(512));
        assert_eq!(parse("1.5 KB"), Value::from(1536));
        assert_eq!(parse("size: 2gb"), Value::from(2_147_483_648.0));
        assert_eq!(parse("no size"), Value::Null);
    }

    #[test]
    fn parse_returns_groups_captures_or_fallback() {
        let registry = standard_registry();
        let s = Value::from("v12-3");
        let number = Value::from(FunctionRef::new("Number", |_, args| {
            Ok(Value::from(args[0].to_number()))
        }));

        let groups = call(
            &registry,
            s.clone(),
            "parse",
            &[regex(r"v(?<major>\d+)-(?<minor>\d+)", ""), number],
        );
        let groups = groups.as_object().unwrap();
        assert_eq!(groups.keys(), vec!["major", "minor"]);
        assert_eq!(groups.get("major"), Some(Value::from(12)));

        let sum = closure(|args| Value::from(args[1].to_number() + args[2].to_number()));
        assert_eq!(
            call(&registry, s.clone(), "parse", &[regex(r"(\d+)-(\d+)", ""), sum]),
            Value::from(15)
        );

        let captures = call(&registry, s.clone(), "parse", &[Value::from(r"(\d+)(x)?")]);
        assert_eq!(captures.to_display_string(), "12,12,");

        let all = call(&registry, s.clone(), "parse", &[regex(r"\d+", "g")]);
        assert_eq!(all.to_display_string(), "12,3");

        let none = regex("zzz", "");
        assert_eq!(call(&registry, s.clone(), "parse", &[none.clone()]), Value::Null);
        assert_eq!(
            call(&registry, s.clone(), "parse", &[none.clone(), Value::Null, Value::from(0)]),
            Value::from(0)
        );
        assert_eq!(
            call(&registry, s.clone(), "parse", &[none, Value::Null, Target::SelfReference.to_value()]),
            s
        );
    }

    #[test]
    fn object_helpers_walk_entries_in_key_order() {
        let registry = standard_registry();
        let obj = Value::from(ObjectRef::plain().with_property("a", 1).with_property("b", 2));
        assert_eq!(
            call(&registry, obj.clone(), "join", &[Value::from("="), Value::from("&")]),
            Value::from("a=1&b=2")
        );

        let upper = closure(|args| Value::from(args[0].to_display_string().to_uppercase()));
        let mapped = call(&registry, obj.clone(), "mapKeys", &[upper]);
        assert_eq!(mapped.as_object().unwrap().keys(), vec!["A", "B"]);

        let doubled = closure(|args| Value::from(args[0].as_number().unwrap_or(0.0) * 2.0));
        let mapped = call(&registry, obj, "mapValues", &[doubled]);
        assert_eq!(mapped.as_object().unwrap().get("b"), Some(Value::from(4)));
    }

    #[test]
    fn array_items_are_entries_before_properties() {
        let registry = standard_registry();
        let arr = ObjectRef::array(vec![Value::from("a"), Value::from("b")]).with_property("tag", "t");
        assert_eq!(
            call(&registry, Value::from(arr), "join", &[Value::from("="), Value::from("&")]),
            Value::from("0=a&1=b&tag=t")
        );
        let keys = closure(|args| args[0].clone());
        let mapped = call(&registry, Value::from("hi"), "mapArray", &[keys]);
        assert_eq!(mapped.to_display_string(), "0,1");
    }

    #[test]
    fn array_helpers() {
        let registry = standard_registry();
        let list = Value::from(ObjectRef::array(vec![Value::from(1), Value::from(2), Value::from(3)]));
        assert_eq!(call(&registry, list.clone(), "last", &[]), Value::from(3));
        assert_eq!(call(&registry, list.clone(), "count", &[]), Value::from(3));

        let odd = closure(|args| Value::from(args[0].as_number().unwrap_or(0.0) % 2.0 == 1.0));
        assert_eq!(call(&registry, list.clone(), "count", &[odd.clone()]), Value::from(2));

        let square = closure(|args| {
            let n = args[0].as_number().unwrap_or(0.0);
            Value::from(n * n)
        });
        let filtered = call(&registry, list.clone(), "filterMap", &[odd, square]);
        assert_eq!(filtered.to_display_string(), "1,9");

        // Filters see the item, its index and the list.
        let sees_list = closure(|args| {
            let len = args[2].as_object().and_then(ObjectRef::items).map_or(0, |items| items.len());
            Value::from(args[1].as_number() == Some(0.0) && len == 3)
        });
        assert_eq!(call(&registry, list, "count", &[sees_list]), Value::from(1));
    }

    #[test]
    fn sorted_by_is_descending_and_stable() {
        let registry = standard_registry();
        let item = |name: &str, rank: i32| {
            Value::from(ObjectRef::plain().with_property("name", name).with_property("rank", rank))
        };
        let items = list(vec![item("a", 1), item("b", 3), item("c", 1), item("d", 2)]);
        let rank = closure(|args| args[0].get_property("rank"));
        let names = |sorted: Value| {
            sorted
                .as_object()
                .and_then(ObjectRef::items)
                .unwrap()
                .iter()
                .map(|v| v.get_property("name").to_display_string())
                .collect::<Vec<_>>()
                .join("")
        };
        let sorted = call(&registry, items.clone(), "sortedBy", &[rank.clone()]);
        assert_eq!(names(sorted), "bdac");
        let sorted = call(&registry, items.clone(), "sortedBy", &[rank, Value::from(true)]);
        assert_eq!(names(sorted), "acdb");
        // The receiver is left untouched.
        assert_eq!(names(items), "abcd");
    }

    #[test]
    fn pad_start_rounds_half_away_from_zero() {
        let registry = standard_registry();
        assert_eq!(call(&registry, Value::from(0.5), "padStart", &[Value::from(2)]), Value::from("01"));
        assert_eq!(call(&registry, Value::from(30.5), "timeFormatted", &[]), Value::from("0:31"));
    }

    #[test]
    fn node_lists_only_gain_count() {
        let registry = standard_registry();
        let nodes = Value::from(
            ObjectRef::new("NodeList").with_items(vec![Value::from(1), Value::from(2)]),
        );
        let composite = compose(&registry, &nodes);
        assert_eq!(composite.invoke("count", &[]).unwrap(), Value::from(2));
        assert!(!composite.get("last").is_callable());
    }

    #[test]
    fn callbacks_are_required_where_documented() {
        let registry = standard_registry();
        let obj = Value::from(ObjectRef::plain());
        let err = compose(&registry, &obj)
            .invoke("mapKeys", &[Value::from(1)])
            .unwrap_err();
        assert!(matches!(err, ExtendError::InvalidArgument { .. }));
    }
}
