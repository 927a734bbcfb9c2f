use std::{
    cell::{RefCell, RefMut},
    rc::Rc,
};

use serde::{Deserialize, Serialize};
use slabmap::SlabMap;

use crate::{Subscription, Value};


type Watcher = Rc<RefCell<dyn FnMut(&Value)>>;

/// A single mutable [`Value`] whose writes are observable.
///
/// Similar to `Rc<RefCell<Value>>`, but every write notifies the watchers registered with [`watch`](Self::watch).
#[derive(Clone)]
pub struct Ref(Rc<RefNode>);

struct RefNode {
    value: RefCell<Value>,
    watchers: RefCell<SlabMap<Watcher>>,
}

impl Ref {
    /// Create a new `Ref` with the given initial value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(Rc::new(RefNode {
            value: RefCell::new(value.into()),
            watchers: RefCell::new(SlabMap::new()),
        }))
    }

    /// Gets the current value.
    pub fn get(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// Gets the current value, or `None` if the value is mutably borrowed.
    pub fn try_get(&self) -> Option<Value> {
        self.0.value.try_borrow().ok().map(|value| value.clone())
    }

    /// Calls `f` with a reference to the current value.
    pub fn with<T>(&self, f: impl FnOnce(&Value) -> T) -> T {
        f(&self.0.value.borrow())
    }

    /// Sets the value and notifies the watchers.
    pub fn set(&self, value: impl Into<Value>) {
        *self.0.value.borrow_mut() = value.into();
        self.0.notify();
    }

    /// Sets the value and notifies the watchers only if the current value is not identical to `value`.
    pub fn set_dedup(&self, value: impl Into<Value>) {
        let value = value.into();
        {
            let mut this_value = self.0.value.borrow_mut();
            if *this_value == value {
                return;
            }
            *this_value = value;
        }
        self.0.notify();
    }

    /// Sets the value, notifies the watchers and returns the previous value.
    pub fn replace(&self, value: impl Into<Value>) -> Value {
        let old = self.0.value.replace(value.into());
        self.0.notify();
        old
    }

    /// Mutably borrows the value.
    ///
    /// When the deref_mut of the return value is called and the borrowing ends, the watchers are notified.
    pub fn borrow_mut(&self) -> RefValueMut<'_> {
        RefValueMut {
            value: Some(self.0.value.borrow_mut()),
            is_dirty: false,
            node: &self.0,
        }
    }

    /// Registers `f` to be called with the new value after each write.
    ///
    /// The watcher is removed when the returned [`Subscription`] is dropped.
    pub fn watch(&self, f: impl FnMut(&Value) + 'static) -> Subscription {
        let watcher: Watcher = Rc::new(RefCell::new(f));
        let key = self.0.watchers.borrow_mut().insert(watcher);
        Subscription::from_weak_fn(Rc::downgrade(&self.0), move |node: Rc<RefNode>| {
            node.watchers.borrow_mut().remove(key);
        })
    }

    /// Returns the number of registered watchers.
    pub fn watcher_count(&self) -> usize {
        self.0.watchers.borrow().len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}
impl Default for Ref {
    fn default() -> Self {
        Self::new(Value::Undefined)
    }
}
impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}
impl std::fmt::Debug for Ref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.value.try_borrow() {
            Ok(value) => write!(f, "Ref({:?})", &*value),
            Err(_) => write!(f, "Ref(<borrowed>)"),
        }
    }
}
impl Serialize for Ref {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        Value::Ref(self.clone()).serialize(serializer)
    }
}
impl<'de> Deserialize<'de> for Ref {
    fn deserialize<D>(deserializer: D) -> Result<Ref, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Ref::new)
    }
}

impl RefNode {
    fn notify(&self) {
        let watchers: Vec<Watcher> = self.watchers.borrow().values().cloned().collect();
        if watchers.is_empty() {
            return;
        }
        let value = self.value.borrow().clone();
        for watcher in watchers {
            match watcher.try_borrow_mut() {
                Ok(mut f) => (*f)(&value),
                Err(_) => log::warn!("skipped notification of a watcher that is already running"),
            }
        }
    }
}

pub struct RefValueMut<'a> {
    value: Option<RefMut<'a, Value>>,
    is_dirty: bool,
    node: &'a RefNode,
}
impl std::ops::Deref for RefValueMut<'_> {
    type Target = Value;
    fn deref(&self) -> &Self::Target {
        self.value
            .as_deref()
            .unwrap_or_else(|| unreachable!("value is only taken on drop"))
    }
}
impl std::ops::DerefMut for RefValueMut<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.is_dirty = true;
        self.value
            .as_deref_mut()
            .unwrap_or_else(|| unreachable!("value is only taken on drop"))
    }
}
impl Drop for RefValueMut<'_> {
    fn drop(&mut self) {
        drop(self.value.take());
        if self.is_dirty {
            self.node.notify();
        }
    }
}
