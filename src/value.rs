use std::{
    cell::{Ref as CellRef, RefCell},
    fmt,
    rc::Rc,
};

use serde::{
    de::{MapAccess, SeqAccess, Visitor},
    ser::{Error as _, SerializeMap, SerializeSeq},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::{Object, Property, PropertyKey, Ref};


/// A dynamically typed value.
///
/// Primitive variants compare by value. `Symbol`, `Function`, `Array`, `Object` and `Ref` are
/// handles to shared allocations and compare by identity, so cloning a `Value` never copies the
/// data behind it.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Symbol(Symbol),
    Function(Function),
    Array(Array),
    Object(Object),
    Ref(Ref),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::String(s.into())
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }
    pub fn as_ref_value(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Function(_) => "function",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Ref(_) => "ref",
        }
    }

    /// Reads a property of an object value; `None` for anything else.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.as_object()?.get(key)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Symbol(l), Value::Symbol(r)) => l == r,
            (Value::Function(l), Value::Function(r)) => l.ptr_eq(r),
            (Value::Array(l), Value::Array(r)) => l.ptr_eq(r),
            (Value::Object(l), Value::Object(r)) => l.ptr_eq(r),
            (Value::Ref(l), Value::Ref(r)) => l.ptr_eq(r),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => fmt::Debug::fmt(b, f),
            Value::Number(n) => fmt::Debug::fmt(n, f),
            Value::String(s) => fmt::Debug::fmt(s, f),
            Value::Symbol(s) => fmt::Debug::fmt(s, f),
            Value::Function(func) => fmt::Debug::fmt(func, f),
            Value::Array(a) => fmt::Debug::fmt(a, f),
            Value::Object(o) => fmt::Debug::fmt(o, f),
            Value::Ref(r) => fmt::Debug::fmt(r, f),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}
impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}
impl From<Symbol> for Value {
    fn from(value: Symbol) -> Self {
        Value::Symbol(value)
    }
}
impl From<Function> for Value {
    fn from(value: Function) -> Self {
        Value::Function(value)
    }
}
impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}
impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}
impl From<Ref> for Value {
    fn from(value: Ref) -> Self {
        Value::Ref(value)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A unique property key, equal only to itself.
#[derive(Clone)]
pub struct Symbol(Rc<SymbolNode>);

struct SymbolNode {
    description: Option<Rc<str>>,
}

impl Symbol {
    pub fn new(description: &str) -> Self {
        Self(Rc::new(SymbolNode {
            description: Some(description.into()),
        }))
    }
    pub fn anonymous() -> Self {
        Self(Rc::new(SymbolNode { description: None }))
    }
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }
}
impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Symbol {}
impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state)
    }
}
impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}

/// A callable value.
#[derive(Clone)]
pub struct Function(Rc<dyn Fn(&[Value]) -> Value>);

impl Function {
    pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }
    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function]")
    }
}

/// A shared, growable list of values.
#[derive(Clone, Default)]
pub struct Array(Rc<RefCell<Vec<Value>>>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }
    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }
    pub fn borrow(&self) -> CellRef<'_, Vec<Value>> {
        self.0.borrow()
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}
impl From<Vec<Value>> for Array {
    fn from(values: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(values)))
    }
}
impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}
impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(items) => write!(f, "[Array; {}]", items.len()),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let path = RefCell::new(Vec::new());
        SerializeValue { value: self, path: &path }.serialize(serializer)
    }
}

struct SerializeValue<'a> {
    value: &'a Value,
    path: &'a RefCell<Vec<usize>>,
}
impl SerializeValue<'_> {
    fn nested<'b>(&'b self, value: &'b Value) -> SerializeValue<'b> {
        SerializeValue {
            value,
            path: self.path,
        }
    }
    fn enter<E: serde::ser::Error>(&self, addr: usize) -> Result<PathGuard<'_>, E> {
        let mut path = self.path.borrow_mut();
        if path.contains(&addr) {
            return Err(E::custom("cyclic value"));
        }
        path.push(addr);
        Ok(PathGuard(self.path))
    }
}

struct PathGuard<'a>(&'a RefCell<Vec<usize>>);
impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().pop();
    }
}

fn is_skipped(value: &Value) -> bool {
    matches!(
        value,
        Value::Undefined | Value::Function(_) | Value::Symbol(_)
    )
}

impl Serialize for SerializeValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Value::Undefined | Value::Null | Value::Symbol(_) | Value::Function(_) => {
                serializer.serialize_unit()
            }
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < (1u64 << 53) as f64 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Ref(r) => {
                let _guard = self.enter::<S::Error>(r.addr())?;
                let value = r.try_get().ok_or_else(|| S::Error::custom("borrowed"))?;
                self.nested(&value).serialize(serializer)
            }
            Value::Array(a) => {
                let _guard = self.enter::<S::Error>(a.addr())?;
                let items = a
                    .0
                    .try_borrow()
                    .map_err(|_| S::Error::custom("borrowed"))?;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(&self.nested(item))?;
                }
                seq.end()
            }
            Value::Object(o) => {
                let _guard = self.enter::<S::Error>(o.id().addr())?;
                let mut entries = Vec::new();
                for key in o.keys() {
                    let value = match o.property(&key) {
                        Some(Property::Value(value)) => value,
                        Some(Property::Accessor(r)) => {
                            r.try_get().ok_or_else(|| S::Error::custom("borrowed"))?
                        }
                        None => continue,
                    };
                    if !is_skipped(&value) {
                        entries.push((key, value));
                    }
                }
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in &entries {
                    map.serialize_entry(&**key, &self.nested(value))?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "any JSON-like value")
    }
    fn visit_unit<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }
    fn visit_none<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }
    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }
    fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }
    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }
    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }
    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v))
    }
    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::string(v))
    }
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(Value::Array(items.into()))
    }
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let object = Object::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            object.insert(PropertyKey::from(key.as_str()), Property::Value(value), true);
        }
        Ok(Value::Object(object))
    }
}
