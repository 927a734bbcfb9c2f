//! Mirrors of plain objects whose ref-valued properties read and write through to the refs.
//!
//! ```
//! use refmirror::{unwrap_ref_proxy, Object, Ref, Value};
//!
//! let count = Ref::new(1);
//! let state = Object::from_entries([("count", Value::Ref(count.clone()))]);
//!
//! let mirror = unwrap_ref_proxy(&state.into());
//! let mirror = mirror.as_object().unwrap();
//! assert_eq!(mirror.get("count"), Some(Value::Number(1.0)));
//!
//! mirror.set("count", 5).unwrap();
//! assert_eq!(count.get(), Value::Number(5.0));
//! ```
use std::{collections::HashMap, convert::Infallible};

use derive_ex::Ex;
use parse_display::Display;

use crate::{Object, ObjectId, Property, PropertyKey, Value};

#[cfg(test)]
mod tests;

/// Why a value is returned as is instead of being mirrored.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum PassThrough {
    #[display("function")]
    Function,
    #[display("array")]
    Array,
    #[display("reactive object")]
    Reactive,
    #[display("not a plain object")]
    NotPlainObject,
    #[display("non-extensible object")]
    NotExtensible,
    #[display("ref")]
    Ref,
}

/// Returns why `value` would be passed through, or `None` if it would be mirrored.
pub fn pass_through_reason(value: &Value) -> Option<PassThrough> {
    classify(value).err()
}

fn classify(value: &Value) -> Result<&Object, PassThrough> {
    match value {
        Value::Function(_) => Err(PassThrough::Function),
        Value::Array(_) => Err(PassThrough::Array),
        Value::Object(o) if o.is_reactive() => Err(PassThrough::Reactive),
        Value::Object(o) if !o.is_plain() => Err(PassThrough::NotPlainObject),
        Value::Object(o) if !o.is_extensible() => Err(PassThrough::NotExtensible),
        Value::Object(o) => Ok(o),
        Value::Ref(_) => Err(PassThrough::Ref),
        Value::Undefined
        | Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::String(_)
        | Value::Symbol(_) => Err(PassThrough::NotPlainObject),
    }
}

/// Source objects already mirrored during an unwrap, keyed by identity.
///
/// Passing the same `Visited` to several calls makes them share mirrors.
#[derive(Ex)]
#[derive_ex(Default)]
#[default(Self::new())]
pub struct Visited {
    mirrors: HashMap<ObjectId, Entry>,
    order: Vec<ObjectId>,
}

struct Entry {
    // keeps the source alive so its id is not reused while the map lives
    _source: Object,
    mirror: Object,
}

impl Visited {
    pub fn new() -> Self {
        Self {
            mirrors: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Returns the mirror built for `source`, if any.
    pub fn get(&self, source: &Object) -> Option<Object> {
        self.mirrors
            .get(&source.id())
            .map(|entry| entry.mirror.clone())
    }
    pub fn contains(&self, source: &Object) -> bool {
        self.mirrors.contains_key(&source.id())
    }
    pub fn len(&self) -> usize {
        self.mirrors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    fn insert(&mut self, source: &Object, mirror: &Object) {
        self.order.push(source.id());
        self.mirrors.insert(
            source.id(),
            Entry {
                _source: source.clone(),
                mirror: mirror.clone(),
            },
        );
    }

    fn mark(&self) -> usize {
        self.order.len()
    }

    /// Forgets every mirror registered since `mark`.
    fn rollback(&mut self, mark: usize) {
        for id in self.order.drain(mark..) {
            if let Some(entry) = self.mirrors.remove(&id) {
                // partial mirrors may reference each other
                entry.mirror.clear();
            }
        }
    }
}
impl std::fmt::Debug for Visited {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Visited")
            .field("len", &self.len())
            .finish()
    }
}

/// Settings of [`try_unwrap_ref_proxy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Ex)]
#[derive_ex(Default)]
#[default(Self::unbounded())]
pub struct UnwrapOptions {
    /// Maximum number of nested source objects mirrored along one path. `None` means unbounded.
    pub max_depth: Option<usize>,
}

impl UnwrapOptions {
    pub const fn unbounded() -> Self {
        Self { max_depth: None }
    }
    pub fn max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum UnwrapError {
    #[display("nesting depth {depth} exceeds the maximum of {max_depth}")]
    TooDeep { depth: usize, max_depth: usize },
}
impl std::error::Error for UnwrapError {}

/// Returns a mirror of `value` in which every ref-valued property is an accessor of that ref.
///
/// Functions, arrays, reactive objects, non-plain objects, non-extensible objects, refs and
/// primitives are returned as is. Nested plain objects are mirrored recursively, and an object
/// reached more than once (including through a cycle) is mirrored only once.
pub fn unwrap_ref_proxy(value: &Value) -> Value {
    unwrap_ref_proxy_with(value, &mut Visited::new())
}

/// Same as [`unwrap_ref_proxy`], but records and reuses mirrors in `visited`.
pub fn unwrap_ref_proxy_with(value: &Value, visited: &mut Visited) -> Value {
    match unwrap_in(value, visited, &Unbounded, 0) {
        Ok(value) => value,
        Err(e) => match e {},
    }
}

/// Same as [`unwrap_ref_proxy_with`], but fails instead of nesting deeper than `options` allows.
///
/// On failure, `visited` is left as it was before the call.
pub fn try_unwrap_ref_proxy(
    value: &Value,
    visited: &mut Visited,
    options: &UnwrapOptions,
) -> Result<Value, UnwrapError> {
    let Some(max_depth) = options.max_depth else {
        return Ok(unwrap_ref_proxy_with(value, visited));
    };
    let mark = visited.mark();
    let result = unwrap_in(value, visited, &MaxDepth(max_depth), 0);
    if let Err(e) = &result {
        log::debug!("{e}, discarding {} partial mirrors", visited.mark() - mark);
        visited.rollback(mark);
    }
    result
}

trait DepthLimit {
    type Error;
    fn enter(&self, depth: usize) -> Result<(), Self::Error>;
}

struct Unbounded;

impl DepthLimit for Unbounded {
    type Error = Infallible;
    fn enter(&self, _depth: usize) -> Result<(), Infallible> {
        Ok(())
    }
}

struct MaxDepth(usize);

impl DepthLimit for MaxDepth {
    type Error = UnwrapError;
    fn enter(&self, depth: usize) -> Result<(), UnwrapError> {
        if depth > self.0 {
            Err(UnwrapError::TooDeep {
                depth,
                max_depth: self.0,
            })
        } else {
            Ok(())
        }
    }
}

fn unwrap_in<L: DepthLimit>(
    value: &Value,
    visited: &mut Visited,
    limit: &L,
    depth: usize,
) -> Result<Value, L::Error> {
    if let Value::Object(o) = value {
        if let Some(mirror) = visited.get(o) {
            log::trace!("reuse mirror of {o:?}");
            return Ok(Value::Object(mirror));
        }
    }
    let source = match classify(value) {
        Ok(source) => source,
        Err(reason) => {
            log::trace!("pass through {}: {reason}", value.type_name());
            return Ok(value.clone());
        }
    };
    let depth = depth + 1;
    limit.enter(depth)?;

    let mirror = Object::new();
    visited.insert(source, &mirror);
    log::trace!("mirror {source:?} at depth {depth}");

    for symbol in source.symbols() {
        if let Some(value) = source.get_symbol(&symbol) {
            mirror.insert(PropertyKey::Symbol(symbol), Property::Value(value), true);
        }
    }
    for key in source.keys() {
        let Some(value) = source.get(&key) else {
            continue;
        };
        let property = match value {
            Value::Ref(r) => Property::Accessor(r),
            value => Property::Value(unwrap_in(&value, visited, limit, depth)?),
        };
        mirror.insert(PropertyKey::String(key), property, true);
    }
    Ok(Value::Object(mirror))
}
