//! Per-node render metadata and scope helpers
//!
//! The host tree only stores markup. Everything the renderer needs to know
//! about a node between passes (its iteration context, the pristine template
//! it is re-cloned from, its list key) lives in a [`NodeTable`] owned by the
//! component that rendered it.

use crate::error::{RenderError, RenderResult};
use ripple_dom::{Document, NodeId};
use ripple_reactive::{coerce, resolve, Array, Object, Region, Targets, Value};
use std::collections::HashMap;

/// Identity of a `:for` item among its siblings
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Text(String),
    /// Bit pattern of the number, so keys can be hashed
    Number(u64),
}

impl ItemKey {
    pub fn from_value(value: &Value, expression: &str) -> RenderResult<Self> {
        if !value.is_truthy() {
            return Err(RenderError::FalsyKey {
                expression: expression.to_string(),
            });
        }
        match value {
            Value::String(s) => Ok(ItemKey::Text(s.clone())),
            Value::Number(n) => Ok(ItemKey::Number(n.to_bits())),
            other => Err(RenderError::InvalidKey {
                expression: expression.to_string(),
                found: format!("{:?}", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeMeta {
    /// Iteration scope visible to bindings on this node
    pub context: Object,
    /// Node this one is re-cloned from on every render
    pub template: Option<NodeId>,
    pub key: Option<ItemKey>,
    /// Generated by a `:for`; only its list owner re-processes it
    pub iterative: bool,
    /// The `:for` this node belongs to (items and placeholder share it)
    pub group: Option<u64>,
}

#[derive(Debug, Default)]
pub struct NodeTable {
    entries: HashMap<NodeId, NodeMeta>,
}

impl NodeTable {
    pub fn get(&self, node: NodeId) -> Option<&NodeMeta> {
        self.entries.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeMeta> {
        self.entries.get_mut(&node)
    }

    /// Metadata of `node`, or the defaults of a pristine template node
    pub fn meta(&self, node: NodeId) -> NodeMeta {
        self.entries.get(&node).cloned().unwrap_or_default()
    }

    pub fn insert(&mut self, node: NodeId, meta: NodeMeta) {
        self.entries.insert(node, meta);
    }

    pub fn remove(&mut self, node: NodeId) -> Option<NodeMeta> {
        self.entries.remove(&node)
    }

    /// Template nodes referenced by any entry
    pub fn templates(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.values().filter_map(|meta| meta.template)
    }

    pub fn is_iterative(&self, node: NodeId) -> bool {
        self.entries.get(&node).is_some_and(|m| m.iterative)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `first-name` → `firstName`
pub fn slug_to_camel(slug: &str) -> String {
    let mut out = String::with_capacity(slug.len());
    let mut chars = slug.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            if let Some(next) = chars.peek().copied() {
                if next.is_alphanumeric() || next == '_' {
                    chars.next();
                    out.extend(next.to_uppercase());
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

pub fn region(node: NodeId) -> Region {
    Region(node.index())
}

pub fn node(region: Region) -> NodeId {
    NodeId::from_index(region.0)
}

/// Evaluate the `:`-prefixed attributes of a component host against the
/// enclosing scope. The host becomes a dependent of everything read,
/// including every property nested inside an object or array prop, so the
/// parent re-renders it when any part of a prop source changes.
pub fn host_props(doc: &Document, host: NodeId, context: &Object, scope: &Object) -> Object {
    let targets = [region(host)];
    let props = Object::new();
    let mut seen = Seen::default();
    for attribute in doc.attributes(host) {
        let Some(name) = attribute.name.strip_prefix(':') else {
            continue;
        };
        let value = coerce(&attribute.value, |path| {
            resolve(context, scope, path, Targets::new(&targets))
        });
        depend_deep(&value, Targets::new(&targets), &mut seen);
        props.set(slug_to_camel(name), value);
    }
    props
}

#[derive(Default)]
struct Seen {
    objects: Vec<Object>,
    arrays: Vec<Array>,
}

fn depend_deep(value: &Value, targets: Targets<'_>, seen: &mut Seen) {
    match value {
        Value::Object(object) => {
            if seen.objects.iter().any(|o| o.ptr_eq(object)) {
                return;
            }
            seen.objects.push(object.clone());
            for key in object.keys() {
                let nested = object.get(&key, targets);
                depend_deep(&nested, targets, seen);
            }
        }
        Value::Array(array) => {
            if seen.arrays.iter().any(|a| a.ptr_eq(array)) {
                return;
            }
            seen.arrays.push(array.clone());
            for item in array.iter() {
                depend_deep(&item, targets, seen);
            }
        }
        _ => {}
    }
}
