use crate::{Object, Value};

/// Marks a plain object as reactive and returns it.
///
/// Reactive objects are tracked by the host framework and are never mirrored by
/// [`unwrap_ref_proxy`](crate::unwrap_ref_proxy).
pub fn reactive(object: Object) -> Object {
    object.set_reactive();
    object
}

/// Returns `true` if `value` is an object marked with [`reactive`].
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Object(o) if o.is_reactive())
}
