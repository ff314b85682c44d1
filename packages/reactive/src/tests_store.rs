use crate::{evaluate, Array, Object, Region, Store, Targets, Value};
use serde_json::json;

fn store(json: serde_json::Value) -> Store {
    match Value::from(json) {
        Value::Object(object) => Store::new(object),
        other => panic!("fixture must be an object, got {:?}", other),
    }
}

#[test]
fn test_adopted_properties_get_records() {
    let store = store(json!({"count": 0, "user": {"name": "Ada"}, "items": [1, 2]}));
    let data = store.data();

    assert!(data.is_reactive());
    assert!(data.dep_of("count").is_some());
    assert!(data.dep_of("items").is_some());
    let user = data.peek("user");
    assert!(user.as_object().unwrap().dep_of("name").is_some());
    // count, user, user.name, items
    assert_eq!(store.records(), 4);
    assert!(!store.any_changed());
}

#[test]
fn test_equal_write_is_not_a_change() {
    let store = store(json!({"count": 1}));
    let regions = [Region(3)];
    store.data().get("count", Targets::new(&regions));

    assert!(!store.data().set("count", 1));
    assert!(!store.any_changed());
    assert!(store.collect_dirty().is_empty());
}

#[test]
fn test_write_dirties_readers_once() {
    let store = store(json!({"count": 1}));
    let regions = [Region(3), Region(4)];
    assert_eq!(store.data().get("count", Targets::new(&regions)), Value::from(1));
    assert_eq!(store.dependents(store.data(), "count"), vec![Region(3), Region(4)]);

    assert!(store.data().set("count", 2));
    assert!(store.has_changed(store.data(), "count"));
    assert_eq!(store.collect_dirty(), vec![Region(3), Region(4)]);
    assert!(store.collect_dirty().is_empty());
    assert!(!store.has_changed(store.data(), "count"));
    println!("✓ Dirty regions collected once and reset");
}

#[test]
fn test_untracked_reads_record_nothing() {
    let store = store(json!({"count": 1}));
    store.data().peek("count");
    store.data().set("count", 5);
    assert!(store.any_changed());
    assert!(store.collect_dirty().is_empty());
}

#[test]
fn test_nested_write_through_path() {
    let store = store(json!({"user": {"name": "Ada"}}));
    let root = Value::Object(store.data().clone());
    let regions = [Region(9)];
    assert_eq!(evaluate(&root, "user.name", Targets::new(&regions)), Value::from("Ada"));

    let user = store.data().peek("user");
    user.as_object().unwrap().set("name", "Grace");
    assert_eq!(store.collect_dirty(), vec![Region(9)]);
}

#[test]
fn test_assigned_object_becomes_reactive() {
    let store = store(json!({"user": {"name": "Ada"}}));
    let replacement = Object::from_pairs([("name", "Lin")]);
    assert!(!replacement.is_reactive());

    assert!(store.data().set("user", replacement.clone()));
    assert!(replacement.is_reactive());
    assert!(replacement.dep_of("name").is_some());
    assert!(store.has_changed(store.data(), "user"));
}

#[test]
fn test_new_keys_get_records_without_dirtying() {
    let store = store(json!({}));
    assert!(store.data().set("fresh", 1));
    assert!(store.data().dep_of("fresh").is_some());
    assert!(!store.any_changed());
}

#[test]
fn test_digit_keys_are_untracked() {
    let store = Store::new(Object::from_pairs([("0", "zero"), ("name", "n")]));
    assert!(store.data().dep_of("0").is_none());
    assert!(store.data().dep_of("name").is_some());
}

#[test]
fn test_array_mutations_dirty_owning_property() {
    let store = store(json!({"items": [1, 2]}));
    let regions = [Region(1)];
    let items = store.data().get("items", Targets::new(&regions));
    let items: &Array = items.as_array().unwrap();

    items.push(3);
    assert_eq!(store.collect_dirty(), vec![Region(1)]);
    assert_eq!(items.shift(), Value::from(1));
    assert_eq!(store.collect_dirty(), vec![Region(1)]);
    items.unshift(0);
    assert_eq!(store.collect_dirty(), vec![Region(1)]);
    assert_eq!(items.pop(), Value::from(3));
    assert_eq!(store.collect_dirty(), vec![Region(1)]);
    items.set(0, 7);
    assert_eq!(store.collect_dirty(), vec![Region(1)]);
    assert_eq!(items.to_vec(), vec![Value::from(7), Value::from(2)]);
}

#[test]
fn test_replaced_array_keeps_property_record() {
    let store = store(json!({"items": [1]}));
    let regions = [Region(2)];
    store.data().get("items", Targets::new(&regions));
    store.data().set("items", Value::from(json!([1, 2])));
    store.collect_dirty();

    // mutations on the new array still reach the same record
    let items = store.data().peek("items");
    items.as_array().unwrap().push(3);
    assert_eq!(store.collect_dirty(), vec![Region(2)]);
}

#[test]
fn test_forget_drops_region() {
    let store = store(json!({"a": 1, "b": 2}));
    let regions = [Region(5)];
    store.data().get("a", Targets::new(&regions));
    store.data().get("b", Targets::new(&regions));

    store.forget(Region(5));
    store.data().set("a", 10);
    store.data().set("b", 20);
    assert!(store.collect_dirty().is_empty());
}

#[test]
fn test_stores_do_not_share_records() {
    let first = store(json!({"shared": {"x": 1}}));
    let second = Store::new(first.data().clone());

    assert!(!second.data().ptr_eq(first.data()));
    let regions = [Region(1)];
    first.data().get("shared", Targets::new(&regions));

    let nested = second.data().peek("shared");
    nested.as_object().unwrap().set("x", 2);
    assert!(second.any_changed());
    assert!(!first.any_changed());
    assert_eq!(first.data().peek("shared").as_object().unwrap().peek("x"), Value::from(1));
}

#[test]
fn test_same_store_object_keeps_identity() {
    let store = store(json!({"user": {"name": "Ada"}}));
    let user = store.data().peek("user");
    store.data().set("alias", user.clone());

    let alias = store.data().peek("alias");
    assert!(alias.as_object().unwrap().ptr_eq(user.as_object().unwrap()));
}

#[test]
fn test_dependents_of_foreign_object_are_empty() {
    let store = store(json!({"a": 1}));
    let plain = Object::from_pairs([("a", 1)]);
    assert!(store.dependents(&plain, "a").is_empty());
    assert!(!store.has_changed(&plain, "a"));
}

#[test]
fn test_sweep_releases_replaced_objects() {
    let store = store(json!({"user": {"name": "Ada", "tags": ["a"]}}));
    // user, user.name, user.tags
    assert_eq!(store.records(), 3);

    for i in 0..100 {
        store.data().set("user", Value::from(json!({"name": format!("u{}", i), "tags": []})));
        store.sweep();
    }
    assert_eq!(store.records(), 3);
    assert_eq!(store.unswept(), 0);
    println!("✓ Replaced objects release their records");
}

#[test]
fn test_sweep_keeps_shared_objects() {
    let store = store(json!({"user": {"name": "Ada"}}));
    let user = store.data().peek("user");
    store.data().set("alias", user.clone());
    store.data().set("user", Value::Null);

    assert_eq!(store.sweep(), 0);
    let regions = [Region(2)];
    let alias = store.data().peek("alias");
    alias.as_object().unwrap().get("name", Targets::new(&regions));
    alias.as_object().unwrap().set("name", "Grace");
    assert_eq!(store.collect_dirty(), vec![Region(2)]);
}

#[test]
fn test_swept_object_tracks_again_when_written_back() {
    let store = store(json!({"todos": [{"text": "a"}, {"text": "b"}]}));
    let todos = store.data().peek("todos");
    let todos = todos.as_array().unwrap();
    let first = todos.shift();
    assert_eq!(store.sweep(), 1);

    todos.push(first.clone());
    let regions = [Region(5)];
    let text = first.as_object().unwrap().get("text", Targets::new(&regions));
    assert_eq!(text, Value::from("a"));
    first.as_object().unwrap().set("text", "c");
    assert_eq!(store.collect_dirty(), vec![Region(5)]);
    assert_eq!(store.sweep(), 0);
}
