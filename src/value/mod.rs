//! Runtime values the composition engine operates on.
//!
//! `Value` is a closed tagged union: primitives are stored inline, while
//! objects and functions are shared references compared by identity. Objects
//! record the name of the type that constructed them (`None` for objects
//! created without a prototype), an optional string tag, named properties and
//! an optional list of indexed items for array-likes. Properties keep their
//! insertion order.

pub mod intrinsics;
pub mod json;
pub mod regexp;

pub use regexp::RegExp;

use crate::error::ExtendResult;
use indexmap::IndexMap;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Signature of native functions. The first argument is the receiver.
pub type NativeFn = dyn Fn(&Value, &[Value]) -> ExtendResult<Value>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Symbol(Symbol),
    Object(ObjectRef),
    Function(FunctionRef),
}

impl Value {
    /// `null` or `undefined`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Objects and functions can hold properties; everything else is a
    /// primitive and has to be boxed before a view can wrap it.
    pub fn is_object_like(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Function(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The regular expression carried by a `RegExp` object.
    pub fn as_regexp(&self) -> Option<RegExp> {
        self.as_object().and_then(ObjectRef::as_regexp)
    }

    /// Numeric conversion (`Number(value)`): strings are trimmed and parsed,
    /// with the empty string reading as 0; anything unparseable is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_numeric(s.trim()),
            Value::Symbol(_) | Value::Function(_) => f64::NAN,
            Value::Object(_) => parse_numeric(self.to_display_string().trim()),
        }
    }

    /// Truthiness as used by filter callbacks.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Symbol(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Reads a property the way the underlying value exposes it: own
    /// properties first, then the native members of the value's variant.
    /// Missing properties read as `Undefined`.
    pub fn get_property(&self, name: &str) -> Value {
        let own = match self {
            Value::Object(obj) => obj.get(name),
            Value::Function(f) => f.get(name),
            _ => None,
        };
        own.or_else(|| intrinsics::lookup(self, name))
            .unwrap_or_default()
    }

    /// Writes an own property. Returns false when the value cannot hold
    /// properties (primitives).
    pub fn set_property(&self, name: &str, value: Value) -> bool {
        match self {
            Value::Object(obj) => obj.set(name, value),
            Value::Function(f) => f.set(name, value),
            _ => return false,
        }
        true
    }

    /// Plain string conversion (`String(value)`).
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Symbol(sym) => format!("Symbol({})", sym.description()),
            Value::Object(obj) => {
                if let Some(re) = obj.as_regexp() {
                    return re.to_string();
                }
                if let Some(items) = obj.items() {
                    return items
                        .iter()
                        .map(|item| {
                            if item.is_nil() {
                                String::new()
                            } else {
                                item.to_display_string()
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(",");
                }
                let tag = obj
                    .string_tag()
                    .or_else(|| obj.class())
                    .unwrap_or_else(|| "Object".to_string());
                format!("[object {tag}]")
            }
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
        }
    }
}

/// Number to string conversion: shortest round-trip digits, no trailing
/// `.0`, and exponent notation outside `[1e-6, 1e21)`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        return format!("{sign}Infinity");
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }
    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exp,
    }
}

fn parse_numeric(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts spellings such as "inf" and "nan" that are not numbers here.
        _ if s.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) => f64::NAN,
        _ => s.parse().unwrap_or(f64::NAN),
    }
}

/// Strict equality: primitives by value, references by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Symbol(sym) => write!(f, "{sym:?}"),
            Value::Object(obj) => write!(f, "{obj:?}"),
            Value::Function(func) => write!(f, "{func:?}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<FunctionRef> for Value {
    fn from(f: FunctionRef) -> Self {
        Value::Function(f)
    }
}

impl From<RegExp> for Value {
    fn from(re: RegExp) -> Self {
        Value::Object(ObjectRef::from_regexp(re))
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        Value::Symbol(sym)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

// Id 0 is reserved for the self-reference symbol.
static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// Unique token compared by identity, never by description.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Cow<'static, str>,
}

impl Symbol {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: Cow::Owned(description.into()),
        }
    }

    pub(crate) const fn reserved(id: u64, description: &'static str) -> Self {
        Self {
            id,
            description: Cow::Borrowed(description),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

#[derive(Debug, Default)]
struct ObjectData {
    class: Option<String>,
    string_tag: Option<String>,
    properties: IndexMap<String, Value>,
    items: Option<Vec<Value>>,
    regexp: Option<RegExp>,
}

/// Shared, interior-mutable object. Clones alias the same object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<ObjectData>>);

impl ObjectRef {
    /// New object constructed by `class`.
    pub fn new(class: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(ObjectData {
            class: Some(class.into()),
            ..ObjectData::default()
        })))
    }

    /// Plain `Object` instance.
    pub fn plain() -> Self {
        Self::new("Object")
    }

    /// Object without a prototype, and therefore without a constructor.
    pub fn null_prototype() -> Self {
        Self(Rc::new(RefCell::new(ObjectData::default())))
    }

    /// `Array` instance holding `items`.
    pub fn array(items: Vec<Value>) -> Self {
        Self::new("Array").with_items(items)
    }

    /// `RegExp` instance wrapping `re`.
    pub fn from_regexp(re: RegExp) -> Self {
        let obj = Self::new("RegExp");
        obj.0.borrow_mut().regexp = Some(re);
        obj
    }

    pub fn with_property(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0
            .borrow_mut()
            .properties
            .insert(name.into(), value.into());
        self
    }

    pub fn with_string_tag(self, tag: impl Into<String>) -> Self {
        self.0.borrow_mut().string_tag = Some(tag.into());
        self
    }

    /// Turns the object into an array-like holding `items`.
    pub fn with_items(self, items: Vec<Value>) -> Self {
        self.0.borrow_mut().items = Some(items);
        self
    }

    pub fn class(&self) -> Option<String> {
        self.0.borrow().class.clone()
    }

    pub fn string_tag(&self) -> Option<String> {
        self.0.borrow().string_tag.clone()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().properties.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.borrow().properties.contains_key(name)
    }

    pub fn set(&self, name: &str, value: Value) {
        self.0
            .borrow_mut()
            .properties
            .insert(name.to_string(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.0.borrow_mut().properties.shift_remove(name)
    }

    /// Own property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().properties.keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn as_regexp(&self) -> Option<RegExp> {
        self.0.borrow().regexp.clone()
    }

    /// Snapshot of the indexed items, if the object is array-like.
    pub fn items(&self) -> Option<Vec<Value>> {
        self.0.borrow().items.clone()
    }

    pub fn is_array_like(&self) -> bool {
        self.0.borrow().items.is_some()
    }

    pub fn item(&self, index: usize) -> Option<Value> {
        self.0.borrow().items.as_ref()?.get(index).cloned()
    }

    /// Appends to the items; returns the new length, or `None` when the
    /// object is not array-like.
    pub fn push(&self, value: Value) -> Option<usize> {
        let mut data = self.0.borrow_mut();
        let items = data.items.as_mut()?;
        items.push(value);
        Some(items.len())
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address used to detect cycles while walking object graphs.
    pub(crate) fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        let class = data.class.as_deref().unwrap_or("NullObject");
        match &data.items {
            Some(items) => write!(f, "{class}(len={})", items.len()),
            None => write!(f, "{class}{{{}}}", data.properties.len()),
        }
    }
}

struct FunctionData {
    name: String,
    body: Box<NativeFn>,
    properties: RefCell<IndexMap<String, Value>>,
}

/// Callable value. `this` is supplied by the caller on every call.
#[derive(Clone)]
pub struct FunctionRef(Rc<FunctionData>);

impl FunctionRef {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> ExtendResult<Value> + 'static,
    {
        Self(Rc::new(FunctionData {
            name: name.into(),
            body: Box::new(body),
            properties: RefCell::default(),
        }))
    }

    pub fn anonymous<F>(body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> ExtendResult<Value> + 'static,
    {
        Self::new("", body)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn call(&self, receiver: &Value, args: &[Value]) -> ExtendResult<Value> {
        (self.0.body)(receiver, args)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.properties.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.0.properties.borrow_mut().insert(name.to_string(), value);
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .properties
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn ptr_eq(&self, other: &FunctionRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.name.is_empty() {
            f.write_str("[Function (anonymous)]")
        } else {
            write!(f, "[Function {}]", self.0.name)
        }
    }
}
