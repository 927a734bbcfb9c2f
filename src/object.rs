use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use parse_display::Display;

use crate::{Ref, Symbol, Value};


/// Key of an object property.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum PropertyKey {
    String(Rc<str>),
    Symbol(Symbol),
}
impl From<&str> for PropertyKey {
    fn from(value: &str) -> Self {
        PropertyKey::String(value.into())
    }
}
impl From<Rc<str>> for PropertyKey {
    fn from(value: Rc<str>) -> Self {
        PropertyKey::String(value)
    }
}
impl From<Symbol> for PropertyKey {
    fn from(value: Symbol) -> Self {
        PropertyKey::Symbol(value)
    }
}
impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(s) => write!(f, "{s:?}"),
        }
    }
}

/// Stored form of an object property.
///
/// An accessor reads and writes the value of the [`Ref`] it delegates to.
/// Use [`Object::get`] and [`Object::set`] to go through accessors transparently.
#[derive(Clone, Debug, PartialEq)]
pub enum Property {
    Value(Value),
    Accessor(Ref),
}

/// How far an object is locked down. Levels only ever tighten.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Default)]
#[display(style = "kebab-case")]
pub enum IntegrityLevel {
    /// Properties can be added, replaced and deleted.
    #[default]
    Extensible,
    /// New properties cannot be added.
    NonExtensible,
    /// New properties cannot be added and existing ones cannot be deleted.
    Sealed,
    /// Like `Sealed`, and data properties cannot be replaced.
    Frozen,
}

/// Error returned when a property write is rejected by the object's [`IntegrityLevel`].
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[display("cannot add property `{key}`, object is not extensible")]
    NotExtensible { key: String },
    #[display("cannot assign to read only property `{key}`")]
    ReadOnly { key: String },
    #[display("cannot delete property `{key}`")]
    NonConfigurable { key: String },
}
impl std::error::Error for PropertyError {}

/// Identity of an [`Object`] allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub(crate) fn addr(self) -> usize {
        self.0
    }
}

/// A shared, ordered map from [`PropertyKey`] to [`Property`].
///
/// An object without a class name is a plain object. Cloning an `Object` clones the handle.
#[derive(Clone)]
pub struct Object(Rc<ObjectNode>);

struct ObjectNode {
    class: Option<Rc<str>>,
    reactive: Cell<bool>,
    integrity: Cell<IntegrityLevel>,
    slots: RefCell<Vec<PropertySlot>>,
}

struct PropertySlot {
    key: PropertyKey,
    property: Property,
    enumerable: bool,
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl Object {
    /// Creates an empty plain object.
    pub fn new() -> Self {
        Self::with_class_raw(None)
    }

    /// Creates an empty instance of a class. Such objects are not plain.
    pub fn with_class(name: &str) -> Self {
        Self::with_class_raw(Some(name.into()))
    }
    fn with_class_raw(class: Option<Rc<str>>) -> Self {
        Self(Rc::new(ObjectNode {
            class,
            reactive: Cell::new(false),
            integrity: Cell::new(IntegrityLevel::Extensible),
            slots: RefCell::new(Vec::new()),
        }))
    }

    /// Creates a plain object with enumerable data properties.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<PropertyKey>,
        V: Into<Value>,
    {
        let this = Self::new();
        for (key, value) in entries {
            this.insert(key.into(), Property::Value(value.into()), true);
        }
        this
    }

    pub fn id(&self) -> ObjectId {
        ObjectId(Rc::as_ptr(&self.0) as usize)
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn class_name(&self) -> Option<&str> {
        self.0.class.as_deref()
    }
    pub fn is_plain(&self) -> bool {
        self.0.class.is_none()
    }
    pub fn is_reactive(&self) -> bool {
        self.0.reactive.get()
    }
    pub(crate) fn set_reactive(&self) {
        self.0.reactive.set(true);
    }

    pub fn integrity(&self) -> IntegrityLevel {
        self.0.integrity.get()
    }
    pub fn is_extensible(&self) -> bool {
        self.integrity() == IntegrityLevel::Extensible
    }
    pub fn prevent_extensions(&self) {
        self.tighten(IntegrityLevel::NonExtensible);
    }
    pub fn seal(&self) {
        self.tighten(IntegrityLevel::Sealed);
    }
    pub fn freeze(&self) {
        self.tighten(IntegrityLevel::Frozen);
    }
    fn tighten(&self, level: IntegrityLevel) {
        let integrity = &self.0.integrity;
        integrity.set(integrity.get().max(level));
    }

    pub fn len(&self) -> usize {
        self.0.slots.borrow().len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.slots.borrow().is_empty()
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.find(&key.into()).is_some()
    }

    /// Own enumerable string keys, in insertion order.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.0
            .slots
            .borrow()
            .iter()
            .filter(|slot| slot.enumerable)
            .filter_map(|slot| match &slot.key {
                PropertyKey::String(key) => Some(key.clone()),
                PropertyKey::Symbol(_) => None,
            })
            .collect()
    }

    /// Own symbol keys, enumerable or not, in insertion order.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.0
            .slots
            .borrow()
            .iter()
            .filter_map(|slot| match &slot.key {
                PropertyKey::Symbol(key) => Some(key.clone()),
                PropertyKey::String(_) => None,
            })
            .collect()
    }

    /// Returns the stored property without dereferencing accessors.
    pub fn property(&self, key: &str) -> Option<Property> {
        self.property_by_key(&key.into())
    }
    fn property_by_key(&self, key: &PropertyKey) -> Option<Property> {
        let slots = self.0.slots.borrow();
        let index = Self::position(&slots, key)?;
        Some(slots[index].property.clone())
    }

    /// Reads a property. Accessors return the current value of their [`Ref`].
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_by_key(&key.into())
    }
    pub fn get_symbol(&self, key: &Symbol) -> Option<Value> {
        self.get_by_key(&PropertyKey::Symbol(key.clone()))
    }
    fn get_by_key(&self, key: &PropertyKey) -> Option<Value> {
        match self.property_by_key(key)? {
            Property::Value(value) => Some(value),
            Property::Accessor(r) => Some(r.get()),
        }
    }

    /// Writes a property.
    ///
    /// An accessor forwards the write to its [`Ref`], even on a frozen object.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), PropertyError> {
        self.set_by_key(key.into(), value.into())
    }
    pub fn set_symbol(&self, key: &Symbol, value: impl Into<Value>) -> Result<(), PropertyError> {
        self.set_by_key(PropertyKey::Symbol(key.clone()), value.into())
    }
    fn set_by_key(&self, key: PropertyKey, value: Value) -> Result<(), PropertyError> {
        let mut slots = self.0.slots.borrow_mut();
        if let Some(index) = Self::position(&slots, &key) {
            let r = match &mut slots[index].property {
                Property::Accessor(r) => r.clone(),
                Property::Value(_) if self.integrity() == IntegrityLevel::Frozen => {
                    return Err(PropertyError::ReadOnly {
                        key: key.to_string(),
                    });
                }
                Property::Value(current) => {
                    *current = value;
                    return Ok(());
                }
            };
            // the ref's watchers may read this object
            drop(slots);
            r.set(value);
            return Ok(());
        }
        if !self.is_extensible() {
            return Err(PropertyError::NotExtensible {
                key: key.to_string(),
            });
        }
        slots.push(PropertySlot {
            key,
            property: Property::Value(value),
            enumerable: true,
        });
        Ok(())
    }

    /// Defines an enumerable property that delegates reads and writes to `r`.
    pub fn define_accessor(&self, key: &str, r: Ref) -> Result<(), PropertyError> {
        self.define(key.into(), Property::Accessor(r), true)
    }

    /// Defines a data property that is skipped by [`keys`](Self::keys).
    pub fn define_hidden(&self, key: &str, value: impl Into<Value>) -> Result<(), PropertyError> {
        self.define(key.into(), Property::Value(value.into()), false)
    }

    fn define(
        &self,
        key: PropertyKey,
        property: Property,
        enumerable: bool,
    ) -> Result<(), PropertyError> {
        let level = self.integrity();
        let exists = self.find(&key).is_some();
        if !exists && level != IntegrityLevel::Extensible {
            return Err(PropertyError::NotExtensible {
                key: key.to_string(),
            });
        }
        if exists && level >= IntegrityLevel::Sealed {
            return Err(PropertyError::NonConfigurable {
                key: key.to_string(),
            });
        }
        self.insert(key, property, enumerable);
        Ok(())
    }

    /// Inserts or replaces a property without checking the integrity level.
    pub(crate) fn insert(&self, key: PropertyKey, property: Property, enumerable: bool) {
        let mut slots = self.0.slots.borrow_mut();
        if let Some(index) = Self::position(&slots, &key) {
            let slot = &mut slots[index];
            slot.property = property;
            slot.enumerable = enumerable;
        } else {
            slots.push(PropertySlot {
                key,
                property,
                enumerable,
            });
        }
    }

    /// Removes a property. Returns `false` if it did not exist.
    pub fn delete(&self, key: &str) -> Result<bool, PropertyError> {
        let key = PropertyKey::from(key);
        let Some(index) = self.find(&key) else {
            return Ok(false);
        };
        if self.integrity() >= IntegrityLevel::Sealed {
            return Err(PropertyError::NonConfigurable {
                key: key.to_string(),
            });
        }
        self.0.slots.borrow_mut().remove(index);
        Ok(true)
    }

    /// Removes every property regardless of the integrity level.
    ///
    /// Objects that reference each other keep each other alive; clearing one of them breaks the cycle.
    pub fn clear(&self) {
        let slots = std::mem::take(&mut *self.0.slots.borrow_mut());
        drop(slots);
    }

    fn find(&self, key: &PropertyKey) -> Option<usize> {
        Self::position(&self.0.slots.borrow(), key)
    }
    fn position(slots: &[PropertySlot], key: &PropertyKey) -> Option<usize> {
        slots.iter().position(|slot| &slot.key == key)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(slots) = self.0.slots.try_borrow() else {
            return write!(f, "<borrowed>");
        };
        let mut keys = slots.iter().map(|slot| slot.key.to_string());
        write!(f, "{} {{", self.class_name().unwrap_or("Object"))?;
        if let Some(key) = keys.next() {
            write!(f, " {key}")?;
            for key in keys {
                write!(f, ", {key}")?;
            }
            write!(f, " ")?;
        }
        write!(f, "}}")
    }
}
