use crate::{ComponentDef, Lifecycle, Registry, Runtime, StaticComponent};
use ripple_dom::{inner_html, Document};
use ripple_reactive::{Object, Value};
use serde_json::json;

fn object(json: serde_json::Value) -> Object {
    match Value::from(json) {
        Value::Object(object) => object,
        other => panic!("expected an object, got {:?}", other),
    }
}

fn runtime(markup: &str) -> Runtime {
    let mut runtime = Runtime::new(Document::new(), Registry::new());
    runtime.load(markup).unwrap();
    runtime
}

fn define_static(runtime: &mut Runtime, tag: &str, template: &str, data: serde_json::Value) {
    let data = object(data);
    runtime.define(tag, template, move || {
        Box::new(StaticComponent::new(data.clone())) as Box<dyn ComponentDef>
    });
}

const PAGE: &str = concat!(
    r#"<template id="parent"><h1>@title</h1><child-card :label="title" :item-count="count"></child-card></template>"#,
    r#"<template id="card"><span>@label (@itemCount) @own</span></template>"#,
);

#[test]
fn test_nested_component_initializes_inline() {
    let mut runtime = runtime(PAGE);
    define_static(&mut runtime, "x-parent", "parent", json!({"title": "one", "count": 2}));
    define_static(&mut runtime, "child-card", "card", json!({"label": "default", "own": "mine"}));

    let root = runtime.document().root();
    let parent = runtime.mount("x-parent", root).unwrap();
    runtime.step().unwrap();

    let shadow = runtime.shadow_root(parent).unwrap();
    let host = runtime.document().children(shadow)[1];
    let child = runtime.component_at(host).unwrap();
    assert_eq!(runtime.state(child), Some(Lifecycle::Running));

    let child_shadow = runtime.shadow_root(child).unwrap();
    // props override the component's own data
    assert_eq!(
        inner_html(runtime.document(), child_shadow),
        "<span>one (2) mine</span>"
    );
    let child_data = runtime.handle(child).unwrap().data().clone();
    assert_eq!(child_data.peek("itemCount"), Value::from(2));
    assert_eq!(child_data.peek("own"), Value::from("mine"));
}

#[test]
fn test_prop_change_updates_child_without_recreating_it() {
    let mut runtime = runtime(PAGE);
    define_static(&mut runtime, "x-parent", "parent", json!({"title": "one", "count": 2}));
    define_static(&mut runtime, "child-card", "card", json!({"own": "mine"}));

    let root = runtime.document().root();
    let parent = runtime.mount("x-parent", root).unwrap();
    runtime.step().unwrap();

    let shadow = runtime.shadow_root(parent).unwrap();
    let host = runtime.document().children(shadow)[1];
    let child = runtime.component_at(host).unwrap();
    let instances = runtime.components().len();

    runtime.handle(parent).unwrap().data().set("title", "two");
    runtime.step().unwrap();

    assert_eq!(runtime.document().children(shadow)[1], host);
    assert_eq!(runtime.component_at(host), Some(child));
    assert_eq!(runtime.components().len(), instances);
    let child_shadow = runtime.shadow_root(child).unwrap();
    assert_eq!(
        inner_html(runtime.document(), child_shadow),
        "<span>two (2) mine</span>"
    );
    assert_eq!(
        runtime.document().text_content(shadow),
        "two"
    );
    println!("✓ Child re-rendered in place");
}

#[test]
fn test_child_state_survives_unrelated_parent_renders() {
    let mut runtime = runtime(PAGE);
    define_static(&mut runtime, "x-parent", "parent", json!({"title": "one", "count": 2, "other": 0}));
    define_static(&mut runtime, "child-card", "card", json!({"own": "mine"}));

    let root = runtime.document().root();
    let parent = runtime.mount("x-parent", root).unwrap();
    runtime.step().unwrap();
    let shadow = runtime.shadow_root(parent).unwrap();
    let host = runtime.document().children(shadow)[1];
    let child = runtime.component_at(host).unwrap();

    runtime.handle(child).unwrap().data().set("own", "edited");
    runtime.handle(parent).unwrap().data().set("count", 3);
    runtime.step().unwrap();

    let child_shadow = runtime.shadow_root(child).unwrap();
    assert_eq!(
        inner_html(runtime.document(), child_shadow),
        "<span>one (3) edited</span>"
    );
}

#[test]
fn test_components_in_lists() {
    let mut runtime = runtime(concat!(
        r#"<template id="list"><todo-item :for="todo of todos" :key="todo.id" :todo="todo"></todo-item></template>"#,
        r#"<template id="item"><em>@todo.text</em></template>"#,
    ));
    define_static(
        &mut runtime,
        "todo-list",
        "list",
        json!({"todos": [{"id": 1, "text": "a"}, {"id": 2, "text": "b"}]}),
    );
    define_static(&mut runtime, "todo-item", "item", json!({}));

    let root = runtime.document().root();
    let list = runtime.mount("todo-list", root).unwrap();
    runtime.step().unwrap();
    assert_eq!(runtime.components().len(), 3);

    let shadow = runtime.shadow_root(list).unwrap();
    let hosts: Vec<_> = runtime
        .document()
        .children(shadow)
        .iter()
        .copied()
        .filter(|&n| runtime.document().is_element(n))
        .collect();
    assert_eq!(hosts.len(), 2);
    let texts: Vec<String> = hosts
        .iter()
        .map(|&host| {
            let child = runtime.component_at(host).unwrap();
            runtime
                .document()
                .text_content(runtime.shadow_root(child).unwrap())
        })
        .collect();
    assert_eq!(texts, vec!["a", "b"]);

    // dropping an item removes its host; the instance goes on the next pass
    let todos = runtime.handle(list).unwrap().data().peek("todos");
    todos.as_array().unwrap().shift();
    runtime.step().unwrap();
    runtime.step().unwrap();
    assert_eq!(runtime.components().len(), 2);
    assert_eq!(runtime.component_at(hosts[0]), None);
    assert!(runtime.component_at(hosts[1]).is_some());
}

#[test]
fn test_conditional_component_keeps_state_while_shown() {
    let mut runtime = runtime(concat!(
        r#"<template id="page"><child-card :if="open" :label="title"></child-card></template>"#,
        r#"<template id="card"><span>@label</span></template>"#,
    ));
    define_static(&mut runtime, "x-page", "page", json!({"open": true, "title": "t"}));
    define_static(&mut runtime, "child-card", "card", json!({}));

    let root = runtime.document().root();
    let page = runtime.mount("x-page", root).unwrap();
    runtime.step().unwrap();

    let shadow = runtime.shadow_root(page).unwrap();
    let host = runtime.document().children(shadow)[0];
    let child = runtime.component_at(host).unwrap();

    runtime.handle(page).unwrap().data().set("title", "u");
    runtime.step().unwrap();
    assert_eq!(runtime.component_at(host), Some(child));
    assert_eq!(
        runtime
            .document()
            .text_content(runtime.shadow_root(child).unwrap()),
        "u"
    );

    runtime.handle(page).unwrap().data().set("open", false);
    runtime.step().unwrap();
    assert_eq!(inner_html(runtime.document(), shadow), r#"<!--:if="open"-->"#);
    runtime.step().unwrap();
    assert_eq!(runtime.state(child), None);
}

#[test]
fn test_nested_prop_write_reaches_child() {
    let mut runtime = runtime(concat!(
        r#"<template id="profile"><b>@user.name</b><name-tag :user="user"></name-tag></template>"#,
        r#"<template id="tag"><i>@user.name</i></template>"#,
    ));
    define_static(&mut runtime, "x-profile", "profile", json!({"user": {"name": "A"}}));
    define_static(&mut runtime, "name-tag", "tag", json!({}));

    let root = runtime.document().root();
    let parent = runtime.mount("x-profile", root).unwrap();
    runtime.step().unwrap();

    let shadow = runtime.shadow_root(parent).unwrap();
    let host = runtime.document().children(shadow)[1];
    let child = runtime.component_at(host).unwrap();
    let child_shadow = runtime.shadow_root(child).unwrap();
    assert_eq!(inner_html(runtime.document(), child_shadow), "<i>A</i>");

    let user = runtime.handle(parent).unwrap().data().peek("user");
    user.as_object().unwrap().set("name", "B");
    runtime.step().unwrap();

    assert_eq!(runtime.component_at(host), Some(child));
    assert_eq!(runtime.document().text_content(shadow), "B");
    assert_eq!(inner_html(runtime.document(), child_shadow), "<i>B</i>");
    println!("✓ Write below a prop object re-rendered the child");
}

#[test]
fn test_list_item_field_write_reaches_item_component() {
    let mut runtime = runtime(concat!(
        r#"<template id="list"><todo-item :for="todo of todos" :key="todo.id" :todo="todo"></todo-item></template>"#,
        r#"<template id="item"><em>@todo.text</em></template>"#,
    ));
    define_static(
        &mut runtime,
        "todo-list",
        "list",
        json!({"todos": [{"id": 1, "text": "a"}, {"id": 2, "text": "b"}]}),
    );
    define_static(&mut runtime, "todo-item", "item", json!({}));

    let root = runtime.document().root();
    let list = runtime.mount("todo-list", root).unwrap();
    runtime.step().unwrap();

    let todos = runtime.handle(list).unwrap().data().peek("todos");
    let second = todos.as_array().unwrap().get(1);
    second.as_object().unwrap().set("text", "c");
    runtime.step().unwrap();

    let shadow = runtime.shadow_root(list).unwrap();
    let texts: Vec<String> = runtime
        .document()
        .children(shadow)
        .iter()
        .filter_map(|&host| runtime.component_at(host))
        .map(|child| {
            runtime
                .document()
                .text_content(runtime.shadow_root(child).unwrap())
        })
        .collect();
    assert_eq!(texts, vec!["a", "c"]);
    assert_eq!(runtime.components().len(), 3);
}
