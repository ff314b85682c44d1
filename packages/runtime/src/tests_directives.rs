use crate::{ComponentId, Registry, Runtime, StaticComponent};
use ripple_dom::{inner_html, Document, NodeId};
use ripple_reactive::{Object, Value};
use serde_json::json;

fn object(json: serde_json::Value) -> Object {
    match Value::from(json) {
        Value::Object(object) => object,
        other => panic!("expected an object, got {:?}", other),
    }
}

/// Mount `<x-test>` rendered from `template` with `data` and run the first pass
fn render(template: &str, data: serde_json::Value) -> (Runtime, ComponentId) {
    let mut runtime = Runtime::new(Document::new(), Registry::new());
    runtime
        .load(&format!(r#"<template id="test">{}</template>"#, template))
        .unwrap();
    let data = object(data);
    runtime.define("x-test", "test", move || {
        Box::new(StaticComponent::new(data.clone()))
    });
    let root = runtime.document().root();
    let id = runtime.mount("x-test", root).unwrap();
    runtime.step().unwrap();
    (runtime, id)
}

fn html(runtime: &Runtime, id: ComponentId) -> String {
    inner_html(runtime.document(), runtime.shadow_root(id).unwrap())
}

fn data(runtime: &Runtime, id: ComponentId) -> Object {
    runtime.handle(id).unwrap().data().clone()
}

fn element_children(runtime: &Runtime, parent: NodeId) -> Vec<NodeId> {
    runtime
        .document()
        .children(parent)
        .iter()
        .copied()
        .filter(|&n| runtime.document().is_element(n))
        .collect()
}

const LIST: &str = r#"<ul><li :for="item of items" :key="item.id">@item.name</li></ul>"#;

#[test]
fn test_for_renders_items_in_order() {
    let (runtime, id) = render(
        LIST,
        json!({"items": [{"id": "a", "name": "A"}, {"id": "b", "name": "B"}]}),
    );
    assert_eq!(
        html(&runtime, id),
        r#"<ul><!--:for="item of items"--><li :key="item.id" key="a">A</li><li :key="item.id" key="b">B</li></ul>"#
    );
}

#[test]
fn test_keyed_reorder_preserves_identity() {
    let (mut runtime, id) = render(
        LIST,
        json!({"items": [
            {"id": "a", "name": "A"},
            {"id": "b", "name": "B"},
            {"id": "c", "name": "C"}
        ]}),
    );
    let shadow = runtime.shadow_root(id).unwrap();
    let list = runtime.document().children(shadow)[0];
    let before = element_children(&runtime, list);
    let (a, c) = (before[0], before[2]);

    data(&runtime, id).set(
        "items",
        Value::from(json!([
            {"id": "c", "name": "C"},
            {"id": "a", "name": "A"},
            {"id": "d", "name": "D"}
        ])),
    );
    runtime.step().unwrap();

    let after = element_children(&runtime, list);
    assert_eq!(after.len(), 3);
    assert_eq!(after[0], c);
    assert_eq!(after[1], a);
    assert!(!before.contains(&after[2]));
    assert_eq!(runtime.document().text_content(list), "CAD");
    assert_eq!(runtime.document().parent(before[1]), None);
    println!("✓ Reused c and a, created d, removed b");
}

#[test]
fn test_array_push_appends_item() {
    let (mut runtime, id) = render(LIST, json!({"items": [{"id": "a", "name": "A"}]}));
    let shadow = runtime.shadow_root(id).unwrap();
    let list = runtime.document().children(shadow)[0];
    let first = element_children(&runtime, list)[0];

    let items = data(&runtime, id).peek("items");
    items
        .as_array()
        .unwrap()
        .push(Value::from(json!({"id": "z", "name": "Z"})));
    runtime.step().unwrap();

    let items = element_children(&runtime, list);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], first);
    assert_eq!(runtime.document().text_content(list), "AZ");
}

#[test]
fn test_item_field_update_rerenders_text_only() {
    let (mut runtime, id) = render(LIST, json!({"items": [{"id": "a", "name": "A"}]}));
    let shadow = runtime.shadow_root(id).unwrap();
    let list = runtime.document().children(shadow)[0];
    let item = element_children(&runtime, list)[0];

    let items = data(&runtime, id).peek("items");
    let first = items.as_array().unwrap().get(0);
    first.as_object().unwrap().set("name", "Alpha");
    runtime.step().unwrap();

    assert_eq!(element_children(&runtime, list), vec![item]);
    assert_eq!(runtime.document().text_content(list), "Alpha");
}

#[test]
fn test_missing_list_renders_nothing() {
    let (mut runtime, id) = render(LIST, json!({"items": [{"id": "a", "name": "A"}]}));
    data(&runtime, id).set("items", Value::Null);
    runtime.step().unwrap();
    assert_eq!(html(&runtime, id), r#"<ul><!--:for="item of items"--></ul>"#);
}

#[test]
fn test_nested_for_uses_item_context() {
    let (runtime, id) = render(
        r#"<div :for="group of groups" :key="group.id"><b>@title</b><span :for="m of group.members" :key="m">@m</span></div>"#,
        json!({
            "title": "T",
            "groups": [
                {"id": 1, "members": ["x", "y"]},
                {"id": 2, "members": ["x"]}
            ]
        }),
    );
    let shadow = runtime.shadow_root(id).unwrap();
    assert_eq!(runtime.document().text_content(shadow), "TxyTx");
}

#[test]
fn test_numeric_keys() {
    let (runtime, id) = render(
        r#"<p :for="n of numbers" :key="n">@n</p>"#,
        json!({"numbers": [3, 1, 2]}),
    );
    let shadow = runtime.shadow_root(id).unwrap();
    assert_eq!(runtime.document().text_content(shadow), "312");
}

const CONDITIONAL: &str = r#"<div :if="show"><p>@msg</p></div>"#;

#[test]
fn test_if_true_renders_without_directive() {
    let (runtime, id) = render(CONDITIONAL, json!({"show": true, "msg": "hi"}));
    assert_eq!(html(&runtime, id), "<div><p>hi</p></div>");
}

#[test]
fn test_if_false_leaves_placeholder() {
    let (runtime, id) = render(CONDITIONAL, json!({"show": false, "msg": "hi"}));
    assert_eq!(html(&runtime, id), r#"<!--:if="show"-->"#);
}

#[test]
fn test_if_toggle_restores_template() {
    let (mut runtime, id) = render(CONDITIONAL, json!({"show": true, "msg": "hi"}));

    data(&runtime, id).set("show", false);
    runtime.step().unwrap();
    assert_eq!(html(&runtime, id), r#"<!--:if="show"-->"#);

    // changes while hidden are picked up once shown again
    data(&runtime, id).set("msg", "yo");
    runtime.step().unwrap();
    data(&runtime, id).set("show", true);
    runtime.step().unwrap();
    assert_eq!(html(&runtime, id), "<div><p>yo</p></div>");

    data(&runtime, id).set("msg", "again");
    runtime.step().unwrap();
    assert_eq!(html(&runtime, id), "<div><p>again</p></div>");
}

#[test]
fn test_if_rerender_while_true_is_idempotent() {
    let (mut runtime, id) = render(CONDITIONAL, json!({"show": true, "msg": "hi"}));
    for value in [Value::from(1), Value::from("yes"), Value::Bool(true)] {
        data(&runtime, id).set("show", value);
        runtime.step().unwrap();
        assert_eq!(html(&runtime, id), "<div><p>hi</p></div>");
    }
}

#[test]
fn test_if_uses_iteration_context() {
    let (runtime, id) = render(
        r#"<i :for="t of todos" :key="t.id"><b :if="t.done">@t.id</b></i>"#,
        json!({"todos": [{"id": "a", "done": true}, {"id": "b", "done": false}]}),
    );
    let shadow = runtime.shadow_root(id).unwrap();
    assert_eq!(runtime.document().text_content(shadow), "a");
}

#[test]
fn test_if_on_list_items() {
    let (mut runtime, id) = render(
        r#"<p :for="t of todos" :key="t.id" :if="t.visible">@t.id</p>"#,
        json!({"todos": [{"id": "a", "visible": true}, {"id": "b", "visible": false}]}),
    );
    let shadow = runtime.shadow_root(id).unwrap();
    assert_eq!(runtime.document().text_content(shadow), "a");

    let todos = data(&runtime, id).peek("todos");
    let second = todos.as_array().unwrap().get(1);
    second.as_object().unwrap().set("visible", true);
    runtime.step().unwrap();
    assert_eq!(runtime.document().text_content(shadow), "ab");
}

#[test]
fn test_attribute_bindings() {
    let (mut runtime, id) = render(
        r#"<a :href="link.url" :data-count="count">go</a>"#,
        json!({"link": {"url": "/home"}, "count": 2}),
    );
    assert_eq!(
        html(&runtime, id),
        r#"<a :href="link.url" :data-count="count" href="/home" data-count="2">go</a>"#
    );

    data(&runtime, id).set("count", 3);
    runtime.step().unwrap();
    let shadow = runtime.shadow_root(id).unwrap();
    let link = runtime.document().children(shadow)[0];
    assert_eq!(runtime.document().attribute(link, "data-count"), Some("3"));
    assert_eq!(runtime.document().attribute(link, "href"), Some("/home"));
}

#[test]
fn test_interpolation_formats_values() {
    let (runtime, id) = render(
        r#"<p>@n|@ratio|@missing|@list|@user.name|@list[1]|@flag</p>"#,
        json!({"n": 4, "ratio": 0.5, "list": [1, 2], "user": {"name": "Ada"}, "flag": false}),
    );
    assert_eq!(html(&runtime, id), "<p>4|0.5||1,2|Ada|2|false</p>");
}

#[test]
fn test_style_text_is_not_interpolated() {
    let (runtime, id) = render(
        r#"<style>@media print { p { color: red; } }</style><p>@media</p>"#,
        json!({"media": "screen"}),
    );
    assert_eq!(
        html(&runtime, id),
        "<style>@media print { p { color: red; } }</style><p>screen</p>"
    );
}

#[test]
fn test_context_shadows_data() {
    let (runtime, id) = render(
        r#"<p :for="name of names" :key="name">@name/@suffix</p>"#,
        json!({"names": ["x"], "name": "ignored", "suffix": "s"}),
    );
    assert_eq!(
        runtime
            .document()
            .text_content(runtime.shadow_root(id).unwrap()),
        "x/s"
    );
}

#[test]
fn test_list_churn_frees_removed_items() {
    let (mut runtime, id) = render(
        LIST,
        json!({"items": [{"id": "a0", "name": "A"}, {"id": "b0", "name": "B"}]}),
    );
    let records = runtime.store(id).unwrap().records();
    data(&runtime, id).set(
        "items",
        Value::from(json!([{"id": "a1", "name": "A"}, {"id": "b1", "name": "B"}])),
    );
    runtime.step().unwrap();
    let nodes = runtime.document().node_count();

    for round in 2..200 {
        data(&runtime, id).set(
            "items",
            Value::from(json!([
                {"id": format!("a{}", round), "name": "A"},
                {"id": format!("b{}", round), "name": "B"}
            ])),
        );
        runtime.step().unwrap();
    }

    let shadow = runtime.shadow_root(id).unwrap();
    let list = runtime.document().children(shadow)[0];
    assert_eq!(runtime.document().text_content(list), "AB");
    assert_eq!(runtime.document().node_count(), nodes);
    assert_eq!(runtime.store(id).unwrap().records(), records);
}

#[test]
fn test_if_toggling_frees_hidden_content() {
    let (mut runtime, id) = render(CONDITIONAL, json!({"show": true, "msg": "hi"}));
    data(&runtime, id).set("show", false);
    runtime.step().unwrap();
    data(&runtime, id).set("show", true);
    runtime.step().unwrap();
    let nodes = runtime.document().node_count();

    for _ in 0..100 {
        data(&runtime, id).set("show", false);
        runtime.step().unwrap();
        data(&runtime, id).set("show", true);
        runtime.step().unwrap();
    }

    assert_eq!(html(&runtime, id), "<div><p>hi</p></div>");
    assert_eq!(runtime.document().node_count(), nodes);
}
