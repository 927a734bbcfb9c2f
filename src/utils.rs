use crate::Value;


pub use crate::reactive::is_reactive;

pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

pub fn is_function(value: &Value) -> bool {
    matches!(value, Value::Function(_))
}

pub fn is_array(value: &Value) -> bool {
    matches!(value, Value::Array(_))
}

/// Returns `true` for objects without a class name.
pub fn is_plain_object(value: &Value) -> bool {
    matches!(value, Value::Object(o) if o.is_plain())
}

/// Returns `true` for objects that accept new properties. Non-objects are not extensible.
pub fn is_extensible(value: &Value) -> bool {
    matches!(value, Value::Object(o) if o.is_extensible())
}
