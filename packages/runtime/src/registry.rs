//! Templates and component registrations

use crate::component::ComponentDef;
use crate::error::{RenderError, RenderResult};
use ripple_dom::{Document, DomResult, NodeId};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

type Factory = Rc<dyn Fn() -> Box<dyn ComponentDef>>;

#[derive(Clone)]
pub struct Registration {
    pub template: String,
    factory: Factory,
}

impl Registration {
    pub fn instantiate(&self) -> Box<dyn ComponentDef> {
        (self.factory)()
    }
}

#[derive(Clone, Default)]
pub struct Registry {
    templates: HashMap<String, NodeId>,
    components: HashMap<String, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tag` as a component rendered from the template `template`
    pub fn register<F>(&mut self, tag: &str, template: &str, factory: F)
    where
        F: Fn() -> Box<dyn ComponentDef> + 'static,
    {
        self.components.insert(
            tag.to_ascii_lowercase(),
            Registration {
                template: template.to_string(),
                factory: Rc::new(factory),
            },
        );
    }

    pub fn register_default<D>(&mut self, tag: &str, template: &str)
    where
        D: ComponentDef + Default + 'static,
    {
        self.register(tag, template, || Box::new(D::default()));
    }

    pub fn add_template(&mut self, id: impl Into<String>, node: NodeId) {
        self.templates.insert(id.into(), node);
    }

    /// Take every `<template id="…">` under `root` out of the tree and keep
    /// it as a named template
    pub fn collect_templates(&mut self, doc: &mut Document, root: NodeId) -> DomResult<usize> {
        let found: Vec<(String, NodeId)> = doc
            .subtree(root)
            .into_iter()
            .filter(|&node| doc.tag(node) == Some("template"))
            .filter_map(|node| doc.attribute(node, "id").map(|id| (id.to_string(), node)))
            .collect();

        for (id, node) in &found {
            doc.remove(*node)?;
            debug!(template = %id, "Collected template");
            self.templates.insert(id.clone(), *node);
        }
        Ok(found.len())
    }

    pub fn template(&self, id: &str) -> Option<NodeId> {
        self.templates.get(id).copied()
    }

    pub fn template_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.templates.values().copied()
    }

    pub fn template_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.components.contains_key(&tag.to_ascii_lowercase())
    }

    pub fn get(&self, tag: &str) -> Option<&Registration> {
        self.components.get(&tag.to_ascii_lowercase())
    }

    /// Registration for `tag` together with its template node
    pub fn resolve(&self, tag: &str) -> RenderResult<(&Registration, NodeId)> {
        let registration = self
            .get(tag)
            .ok_or_else(|| RenderError::UnknownComponent(tag.to_string()))?;
        let template = self
            .template(&registration.template)
            .ok_or_else(|| RenderError::TemplateNotFound(registration.template.clone()))?;
        Ok((registration, template))
    }
}
