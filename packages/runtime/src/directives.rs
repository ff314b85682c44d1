//! Template directives: `:for`, `:if`, `~event`, `:attr` and `@path` text
//! interpolation

use crate::component::Component;
use crate::error::{RenderError, RenderResult};
use crate::runtime::{EventBinding, Runtime};
use crate::scope::{region, ItemKey, NodeMeta};
use regex::{Captures, Regex};
use ripple_dom::{DomError, NodeId};
use ripple_reactive::{coerce, evaluate, resolve, Object, Targets, Value};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Attributes consumed by the structural directives
const STRUCTURAL: [&str; 2] = [":if", ":for"];

fn for_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_]\w*)\s+of\s+([\w.\[\]]+)\s*$").expect("valid :for pattern")
    })
}

fn interpolation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"@([A-Za-z_]\w*(?:\.\w+|\[\d+\])*)").expect("valid interpolation pattern")
    })
}

/// Split `item of list` into its two names
pub fn parse_for(expression: &str) -> RenderResult<(String, String)> {
    let captures = for_pattern()
        .captures(expression)
        .ok_or_else(|| RenderError::ForSyntax(expression.to_string()))?;
    Ok((captures[1].to_string(), captures[2].to_string()))
}

fn data_of(component: &Component) -> Object {
    component
        .store
        .as_ref()
        .map(|store| store.data().clone())
        .unwrap_or_default()
}

impl Runtime {
    /// Expand a `:for` node into one keyed item per list element, reusing
    /// the live items whose keys survive. The node itself is replaced by a
    /// placeholder that owns the template for later passes.
    pub(crate) fn apply_for(
        &mut self,
        component: &mut Component,
        fresh: NodeId,
        meta: &NodeMeta,
    ) -> RenderResult<(NodeId, Vec<(NodeId, Object)>)> {
        let expression = self.doc.attribute(fresh, ":for").unwrap_or_default().to_string();
        let key_expression = self
            .doc
            .attribute(fresh, ":key")
            .map(str::to_string)
            .ok_or_else(|| RenderError::MissingKey(expression.clone()))?;
        let (item_name, list_path) = parse_for(&expression)?;

        let group = meta.group.unwrap_or_else(|| {
            self.next_group += 1;
            self.next_group
        });
        let parent = self
            .doc
            .parent(fresh)
            .ok_or(DomError::Detached { node: fresh })?;

        // items of this list rendered by the previous pass
        let mut stale: Vec<(ItemKey, NodeId)> = self
            .doc
            .children(parent)
            .iter()
            .filter(|&&sibling| sibling != fresh)
            .filter_map(|&sibling| {
                let sibling_meta = component.nodes.get(sibling)?;
                if sibling_meta.group != Some(group) {
                    return None;
                }
                sibling_meta.key.clone().map(|key| (key, sibling))
            })
            .collect();

        let template = self.doc.clone_node(fresh, true)?;
        let placeholder = self.doc.create_comment(format!(":for=\"{}\"", expression));
        component.nodes.insert(
            placeholder,
            NodeMeta {
                context: meta.context.clone(),
                template: Some(template),
                key: None,
                iterative: false,
                group: Some(group),
            },
        );

        let data = data_of(component);
        let targets = [region(placeholder)];
        let items = match resolve(&meta.context, &data, &list_path, Targets::new(&targets)) {
            Value::Array(array) => array.to_vec(),
            Value::Undefined | Value::Null => Vec::new(),
            other => {
                warn!(list = %list_path, value = ?other, "Iterating over a non-array, rendering no items");
                Vec::new()
            }
        };

        let mut previous = fresh;
        let mut spawned = Vec::new();
        let (mut reused, mut created) = (0usize, 0usize);
        for item in items {
            let item_context = Object::from_pairs(meta.context.entries());
            item_context.set(item_name.as_str(), item);

            let key_value = evaluate(
                &Value::Object(item_context.clone()),
                &key_expression,
                Targets::new(&targets),
            );
            let key = ItemKey::from_value(&key_value, &key_expression)?;

            if let Some(position) = stale.iter().position(|(k, _)| *k == key) {
                let (_, existing) = stale.remove(position);
                self.doc.insert_after(previous, existing)?;
                previous = existing;
                reused += 1;
            } else {
                let clone = self.doc.clone_node(fresh, true)?;
                self.doc.remove_attribute(clone, ":for")?;
                component.nodes.insert(
                    clone,
                    NodeMeta {
                        context: item_context.clone(),
                        template: None,
                        key: Some(key),
                        iterative: true,
                        group: Some(group),
                    },
                );
                self.doc.insert_after(previous, clone)?;
                spawned.push((clone, item_context));
                previous = clone;
                created += 1;
            }
        }

        let removed = stale.len();
        for (_, node) in stale {
            self.forget_subtree(component, node);
            self.doc.remove(node)?;
            self.retired.push(node);
        }

        self.doc.replace_child(fresh, placeholder)?;
        self.forget_node(component, fresh);
        self.retired.extend(meta.template);
        self.retired.push(fresh);
        debug!(list = %list_path, reused, created, removed, "Reconciled :for");
        Ok((placeholder, spawned))
    }

    /// Show or hide a `:if` node. Returns the node now in the tree and
    /// whether it is the shown element (otherwise it is a placeholder).
    pub(crate) fn apply_if(
        &mut self,
        component: &mut Component,
        fresh: NodeId,
        context: &Object,
    ) -> RenderResult<(NodeId, bool)> {
        let expression = self.doc.attribute(fresh, ":if").unwrap_or_default().to_string();
        let placeholder = self.doc.create_comment(format!(":if=\"{}\"", expression));
        let data = data_of(component);
        let targets = [region(fresh), region(placeholder)];
        let shown = coerce(&expression, |path| {
            resolve(context, &data, path, Targets::new(&targets))
        })
        .is_truthy();

        if shown {
            self.forget_node(component, placeholder);
            self.retired.push(placeholder);
            // later passes start again from the bare element, :if included
            let template = self.doc.clone_node(fresh, false)?;
            if let Some(meta) = component.nodes.get_mut(fresh) {
                self.retired.extend(meta.template.replace(template));
            }
            self.doc.remove_attribute(fresh, ":if")?;
            return Ok((fresh, true));
        }

        let pristine = self.pristine_copy(component, fresh)?;
        let mut meta = component.nodes.meta(fresh);
        meta.template = Some(pristine);
        self.forget_subtree(component, fresh);
        self.doc.replace_child(fresh, placeholder)?;
        self.retired.push(fresh);
        component.nodes.insert(placeholder, meta);
        debug!(condition = %expression, "Hid :if node");
        Ok((placeholder, false))
    }

    /// Whether a live nested component stays in place. Only a host shown by
    /// a `:if` can go away, when its condition no longer holds.
    pub(crate) fn keeps_component(
        &mut self,
        component: &Component,
        host: NodeId,
        meta: &NodeMeta,
    ) -> RenderResult<bool> {
        let Some(template) = meta.template else {
            return Ok(true);
        };
        let Some(expression) = self.doc.attribute(template, ":if").map(str::to_string) else {
            return Ok(true);
        };
        let data = data_of(component);
        let targets = [region(host)];
        Ok(coerce(&expression, |path| {
            resolve(&meta.context, &data, path, Targets::new(&targets))
        })
        .is_truthy())
    }

    /// Record `~event="method"` listeners
    pub(crate) fn bind_events(&mut self, component: &Component, node: NodeId) -> RenderResult<()> {
        let bindings: Vec<(String, String)> = self
            .doc
            .attributes(node)
            .iter()
            .filter_map(|a| {
                a.name
                    .strip_prefix('~')
                    .map(|event| (event.to_string(), a.value.trim().to_string()))
            })
            .collect();

        for (event, method) in bindings {
            if !component.def.methods().contains(&method.as_str()) {
                return Err(RenderError::UnknownMethod {
                    component: component.tag.clone(),
                    method,
                });
            }
            self.listeners.entry(node).or_default().push(EventBinding {
                event,
                component: component.id,
                method,
            });
        }
        Ok(())
    }

    /// Mirror every `:name="path"` binding into the plain `name` attribute
    pub(crate) fn bind_attributes(
        &mut self,
        component: &Component,
        node: NodeId,
        context: &Object,
    ) -> RenderResult<()> {
        let bindings: Vec<(String, String)> = self
            .doc
            .attributes(node)
            .iter()
            .filter(|a| !STRUCTURAL.contains(&a.name.as_str()))
            .filter_map(|a| {
                a.name
                    .strip_prefix(':')
                    .map(|name| (name.to_string(), a.value.clone()))
            })
            .collect();
        if bindings.is_empty() {
            return Ok(());
        }

        let data = data_of(component);
        let targets = [region(node)];
        for (name, path) in bindings {
            let value = resolve(context, &data, path.trim(), Targets::new(&targets));
            self.doc.set_attribute(node, name, value.to_string())?;
        }
        Ok(())
    }

    /// Replace `@path` occurrences in a text node, always starting from the
    /// template text
    pub(crate) fn interpolate(
        &mut self,
        component: &Component,
        node: NodeId,
        context: &Object,
    ) -> RenderResult<()> {
        let Some(source) = self.doc.text(node) else {
            return Ok(());
        };
        if !source.contains('@') {
            return Ok(());
        }
        let in_style = self
            .doc
            .parent(node)
            .and_then(|parent| self.doc.tag(parent))
            .is_some_and(|tag| tag == "style");
        if in_style {
            return Ok(());
        }

        let data = data_of(component);
        let targets = [region(node)];
        let rendered = interpolation_pattern()
            .replace_all(source, |captures: &Captures| {
                resolve(context, &data, &captures[1], Targets::new(&targets)).to_string()
            })
            .into_owned();
        self.doc.set_text(node, rendered)?;
        Ok(())
    }
}
