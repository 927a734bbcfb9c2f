use assert_call::{call, CallRecorder};
use rstest::rstest;
use serde_json::json;

use super::*;
use crate::{reactive, Array, Function, Ref, Symbol};

fn mirror_of(value: &Value) -> Object {
    match unwrap_ref_proxy(value) {
        Value::Object(o) => o,
        other => panic!("expected object, got {other:?}"),
    }
}

fn plain(value: serde_json::Value) -> Object {
    match serde_json::from_value::<Value>(value).unwrap() {
        Value::Object(o) => o,
        other => panic!("expected object, got {other:?}"),
    }
}

fn frozen() -> Value {
    let o = Object::from_entries([("a", 1)]);
    o.freeze();
    o.into()
}
fn sealed() -> Value {
    let o = Object::from_entries([("a", 1)]);
    o.seal();
    o.into()
}
fn non_extensible() -> Value {
    let o = Object::from_entries([("a", 1)]);
    o.prevent_extensions();
    o.into()
}

#[rstest]
#[case::function(Value::Function(Function::new(|_| Value::Null)), Some(PassThrough::Function))]
#[case::array(Value::Array(Array::from(vec![Value::from(1)])), Some(PassThrough::Array))]
#[case::reactive(Value::Object(reactive(Object::from_entries([("a", 1)]))), Some(PassThrough::Reactive))]
#[case::instance(Value::Object(Object::with_class("Date")), Some(PassThrough::NotPlainObject))]
#[case::frozen(frozen(), Some(PassThrough::NotExtensible))]
#[case::sealed(sealed(), Some(PassThrough::NotExtensible))]
#[case::non_extensible(non_extensible(), Some(PassThrough::NotExtensible))]
#[case::ref_(Value::Ref(Ref::new(1)), Some(PassThrough::Ref))]
#[case::null(Value::Null, Some(PassThrough::NotPlainObject))]
#[case::undefined(Value::Undefined, Some(PassThrough::NotPlainObject))]
#[case::number(Value::Number(1.5), Some(PassThrough::NotPlainObject))]
#[case::string(Value::string("s"), Some(PassThrough::NotPlainObject))]
#[case::symbol(Value::Symbol(Symbol::new("s")), Some(PassThrough::NotPlainObject))]
#[case::plain(Value::Object(Object::new()), None)]
fn classify_values(#[case] value: Value, #[case] expected: Option<PassThrough>) {
    assert_eq!(pass_through_reason(&value), expected);
}

#[rstest]
#[case::function(Value::Function(Function::new(|_| Value::Null)))]
#[case::array(Value::Array(Array::from(vec![Value::Object(Object::new())])))]
#[case::reactive(Value::Object(reactive(Object::from_entries([("a", 1)]))))]
#[case::instance(Value::Object(Object::with_class("Date")))]
#[case::frozen(frozen())]
#[case::sealed(sealed())]
#[case::non_extensible(non_extensible())]
#[case::ref_(Value::Ref(Ref::new(1)))]
#[case::null(Value::Null)]
#[case::number(Value::Number(3.0))]
fn pass_through_returns_same_value(#[case] value: Value) {
    let mut visited = Visited::new();
    assert_eq!(unwrap_ref_proxy_with(&value, &mut visited), value);
    assert!(visited.is_empty());
}

#[test]
fn pass_through_does_not_recurse() {
    let inner = Ref::new(1);
    let frozen = Object::from_entries([("r", Value::Ref(inner))]);
    frozen.freeze();
    let result = unwrap_ref_proxy(&frozen.clone().into());
    let result = result.as_object().unwrap();
    assert!(result.ptr_eq(&frozen));
    assert!(matches!(result.property("r"), Some(Property::Value(Value::Ref(_)))));
}

#[test]
fn mirror_is_fresh_and_equal() {
    let source = plain(json!({ "a": 1, "b": { "c": "x" } }));
    let mirror = mirror_of(&source.clone().into());
    assert!(!mirror.ptr_eq(&source));
    assert_eq!(
        serde_json::to_value(Value::Object(mirror.clone())).unwrap(),
        json!({ "a": 1, "b": { "c": "x" } })
    );
    let b_src = source.get("b").unwrap();
    let b_mirror = mirror.get("b").unwrap();
    assert_ne!(b_src, b_mirror);
}

#[test]
fn source_is_not_mutated() {
    let r = Ref::new(1);
    let source = Object::from_entries([("x", Value::Ref(r.clone()))]);
    let _mirror = mirror_of(&source.clone().into());
    assert_eq!(source.property("x"), Some(Property::Value(Value::Ref(r))));
    assert_eq!(source.len(), 1);
}

#[test]
fn ref_delegation() {
    let r = Ref::new(1);
    let source = Object::from_entries([("x", Value::Ref(r.clone()))]);
    let mirror = mirror_of(&source.into());

    assert_eq!(mirror.get("x"), Some(Value::Number(1.0)));
    assert_eq!(mirror.property("x"), Some(Property::Accessor(r.clone())));

    mirror.set("x", 5).unwrap();
    assert_eq!(r.get(), Value::Number(5.0));

    r.set(7);
    assert_eq!(mirror.get("x"), Some(Value::Number(7.0)));
}

#[test]
fn write_through_notifies_watchers() {
    let mut cr = CallRecorder::new();
    let r = Ref::new(1);
    let _s = r.watch(|value| call!("{:?}", value));
    let mirror = mirror_of(&Object::from_entries([("x", Value::Ref(r.clone()))]).into());

    mirror.set("x", 2).unwrap();
    cr.verify("2.0");
}

#[test]
fn ref_holding_object_is_not_unwrapped() {
    let inner = Object::from_entries([("n", 1)]);
    let r = Ref::new(inner.clone());
    let mirror = mirror_of(&Object::from_entries([("x", Value::Ref(r))]).into());
    assert_eq!(mirror.get("x"), Some(Value::Object(inner)));
}

#[test]
fn nested_refs_are_unwrapped() {
    let r = Ref::new("a");
    let inner = Object::from_entries([("name", Value::Ref(r.clone()))]);
    let source = Object::from_entries([("inner", inner)]);
    let mirror = mirror_of(&source.into());
    let inner_mirror = mirror.get("inner").unwrap();
    let inner_mirror = inner_mirror.as_object().unwrap();

    assert_eq!(inner_mirror.get("name"), Some(Value::string("a")));
    inner_mirror.set("name", "b").unwrap();
    assert_eq!(r.get(), Value::string("b"));
}

#[test]
fn self_cycle_terminates() {
    let source = Object::new();
    source.set("self", source.clone()).unwrap();
    source.set("n", 1).unwrap();

    let mirror = mirror_of(&source.clone().into());
    assert_eq!(mirror.get("self"), Some(Value::Object(mirror.clone())));
    assert_eq!(mirror.get("n"), Some(Value::Number(1.0)));

    mirror.clear();
    source.clear();
}

#[test]
fn mutual_cycle_terminates() {
    let a = Object::new();
    let b = Object::new();
    a.set("b", b.clone()).unwrap();
    b.set("a", a.clone()).unwrap();

    let mirror_a = mirror_of(&a.clone().into());
    let mirror_b = mirror_a.get("b").unwrap();
    let mirror_b = mirror_b.as_object().unwrap();
    assert!(!mirror_b.ptr_eq(&b));
    assert_eq!(mirror_b.get("a"), Some(Value::Object(mirror_a.clone())));

    mirror_a.clear();
    a.clear();
}

#[test]
fn shared_reference_maps_to_one_mirror() {
    let shared = Object::from_entries([("n", 1)]);
    let source = Object::from_entries([("a", shared.clone()), ("b", shared.clone())]);
    let mirror = mirror_of(&source.into());

    let a = mirror.get("a").unwrap();
    let b = mirror.get("b").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, Value::Object(shared));
}

#[test]
fn symbols_are_copied_by_reference() {
    let sym = Symbol::new("meta");
    let meta = Object::from_entries([("n", Value::Ref(Ref::new(1)))]);
    let source = Object::from_entries([("a", 1)]);
    source.set_symbol(&sym, meta.clone()).unwrap();

    let mirror = mirror_of(&source.into());
    assert_eq!(mirror.symbols(), vec![sym.clone()]);
    assert_eq!(mirror.get_symbol(&sym), Some(Value::Object(meta)));
}

#[test]
fn hidden_keys_are_skipped() {
    let source = Object::from_entries([("a", 1)]);
    source.define_hidden("secret", 2).unwrap();
    let mirror = mirror_of(&source.into());
    let expected: Vec<std::rc::Rc<str>> = vec!["a".into()];
    assert_eq!(mirror.keys(), expected);
    assert!(!mirror.contains_key("secret"));
}

#[test]
fn keys_keep_source_order() {
    let source = plain(json!({ "z": 1, "a": 2, "m": 3 }));
    source.set("b", Ref::new(4)).unwrap();
    let mirror = mirror_of(&source.clone().into());
    assert_eq!(mirror.keys(), source.keys());

    source.set("late", 5).unwrap();
    assert!(!mirror.contains_key("late"));
}

#[test]
fn accessor_on_source_is_read_through() {
    let r = Ref::new(Ref::new(1));
    let source = Object::new();
    source.define_accessor("x", r).unwrap();
    let mirror = mirror_of(&source.into());
    assert!(matches!(mirror.property("x"), Some(Property::Accessor(_))));
    assert_eq!(mirror.get("x"), Some(Value::Number(1.0)));
}

#[test]
fn same_visited_returns_same_mirror() {
    let source: Value = plain(json!({ "a": { "b": 1 } })).into();
    let mut visited = Visited::new();
    let first = unwrap_ref_proxy_with(&source, &mut visited);
    let second = unwrap_ref_proxy_with(&source, &mut visited);
    assert_eq!(first, second);
    assert_eq!(visited.len(), 2);
}

#[test]
fn separate_calls_build_separate_mirrors() {
    let source: Value = plain(json!({ "a": 1 })).into();
    assert_ne!(unwrap_ref_proxy(&source), unwrap_ref_proxy(&source));
}

#[test]
fn visited_object_skips_pass_through_checks() {
    let source = Object::from_entries([("a", 1)]);
    let mut visited = Visited::new();
    let first = unwrap_ref_proxy_with(&source.clone().into(), &mut visited);
    source.freeze();
    let second = unwrap_ref_proxy_with(&source.clone().into(), &mut visited);
    assert_eq!(first, second);
    assert!(visited.contains(&source));
    assert_eq!(visited.get(&source).map(Value::Object), Some(first));
}

#[test]
fn arrays_inside_objects_are_shared() {
    let items = Array::from(vec![Value::Object(Object::new())]);
    let source = Object::from_entries([("items", items.clone())]);
    let mirror = mirror_of(&source.into());
    assert_eq!(mirror.get("items"), Some(Value::Array(items)));
}

#[test]
fn max_depth_allows_shallow() {
    let source: Value = plain(json!({ "a": { "b": 1 } })).into();
    let mut visited = Visited::new();
    let mirror =
        try_unwrap_ref_proxy(&source, &mut visited, &UnwrapOptions::max_depth(2)).unwrap();
    assert_eq!(
        serde_json::to_value(&mirror).unwrap(),
        json!({ "a": { "b": 1 } })
    );
    assert_eq!(visited.len(), 2);
}

#[test]
fn max_depth_rejects_deep() {
    let source: Value = plain(json!({ "a": { "b": { "c": 1 } } })).into();
    let mut visited = Visited::new();
    let e = try_unwrap_ref_proxy(&source, &mut visited, &UnwrapOptions::max_depth(2));
    assert_eq!(
        e,
        Err(UnwrapError::TooDeep {
            depth: 3,
            max_depth: 2
        })
    );
    assert_eq!(
        UnwrapError::TooDeep {
            depth: 3,
            max_depth: 2
        }
        .to_string(),
        "nesting depth 3 exceeds the maximum of 2"
    );
}

#[test]
fn max_depth_failure_leaves_visited_unchanged() {
    let shared = Object::from_entries([("n", 1)]);
    let mut visited = Visited::new();
    let shared_mirror = unwrap_ref_proxy_with(&shared.clone().into(), &mut visited);

    let source = plain(json!({ "x": 1, "a": { "b": { "c": 1 } } }));
    source.set("shared", shared.clone()).unwrap();
    let source: Value = source.into();
    let e = try_unwrap_ref_proxy(&source, &mut visited, &UnwrapOptions::max_depth(2));
    assert!(e.is_err());
    assert_eq!(visited.len(), 1);
    assert_eq!(visited.get(&shared).map(Value::Object), Some(shared_mirror.clone()));

    let mirror = unwrap_ref_proxy_with(&source, &mut visited);
    let mut keys = mirror.as_object().unwrap().keys();
    keys.sort();
    let expected: Vec<std::rc::Rc<str>> = vec!["a".into(), "shared".into(), "x".into()];
    assert_eq!(keys, expected);
    assert_eq!(mirror.get("shared"), Some(shared_mirror));
    assert_eq!(
        serde_json::to_value(&mirror).unwrap(),
        json!({ "x": 1, "a": { "b": { "c": 1 } }, "shared": { "n": 1 } })
    );
}

#[test]
fn default_options_are_unbounded() {
    assert_eq!(UnwrapOptions::default(), UnwrapOptions::unbounded());
    assert_eq!(UnwrapOptions::default().max_depth, None);
}

#[test]
fn max_depth_ignores_cycles() {
    let source = Object::new();
    source.set("self", source.clone()).unwrap();
    let mut visited = Visited::new();
    let mirror = try_unwrap_ref_proxy(
        &source.clone().into(),
        &mut visited,
        &UnwrapOptions::max_depth(1),
    )
    .unwrap();
    assert_eq!(mirror.get("self"), Some(mirror.clone()));

    mirror.as_object().unwrap().clear();
    source.clear();
}

#[test]
fn unbounded_options_match_plain_unwrap() {
    let mut depth = Object::from_entries([("leaf", 1)]);
    for _ in 0..64 {
        depth = Object::from_entries([("next", depth)]);
    }
    let mut visited = Visited::new();
    let mirror =
        try_unwrap_ref_proxy(&depth.into(), &mut visited, &UnwrapOptions::default()).unwrap();
    assert!(mirror.as_object().is_some());
    assert_eq!(visited.len(), 65);
}
