//! Render passes: decide which nodes to re-render, re-clone them from their
//! templates and run the directives on the fresh copies

use crate::component::Component;
use crate::error::RenderResult;
use crate::runtime::Runtime;
use crate::scope::{node, region, NodeMeta};
use ripple_dom::NodeId;
use ripple_reactive::Object;
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

struct Work {
    node: NodeId,
    /// Scope inherited from the walk; `None` keeps the node's own
    context: Option<Object>,
    /// Iteration items are only processed when their list owner asks
    force: bool,
}

/// What the walk should do after a node was rendered
pub(crate) struct Rendered {
    pub node: NodeId,
    pub context: Object,
    /// Whether the walk descends into `node`'s children
    pub descend: bool,
    /// Newly created list items that still need a full render
    pub spawned: Vec<(NodeId, Object)>,
}

impl Rendered {
    pub fn leaf(node: NodeId, context: Object) -> Self {
        Self {
            node,
            context,
            descend: false,
            spawned: Vec::new(),
        }
    }
}

impl Runtime {
    /// Render `component`. The first pass covers every top-level template
    /// node and then moves the content into the shadow root; later passes
    /// cover exactly the dependents of changed properties.
    #[instrument(skip(self, component), fields(component = %component.id, tag = %component.tag))]
    pub(crate) fn render(&mut self, component: &mut Component, first: bool) -> RenderResult<()> {
        let roots: Vec<NodeId> = if first {
            self.doc.children(component.fragment).to_vec()
        } else {
            match &component.store {
                Some(store) => store.collect_dirty().into_iter().map(node).collect(),
                None => Vec::new(),
            }
        };
        debug!(roots = roots.len(), first, "Render pass");

        let mut stack: Vec<Work> = roots
            .into_iter()
            .rev()
            .map(|node| Work {
                node,
                context: None,
                // a dirty list item is re-rendered in place; walks skip them
                force: !first,
            })
            .collect();

        while let Some(work) = stack.pop() {
            if !self.is_live(component, work.node) {
                trace!(node = %work.node, "Skipping detached node");
                continue;
            }
            if !work.force && component.nodes.is_iterative(work.node) {
                continue;
            }

            let rendered = self.render_node(component, work.node, work.context)?;

            for (item, context) in rendered.spawned.into_iter().rev() {
                stack.push(Work {
                    node: item,
                    context: Some(context),
                    force: true,
                });
            }
            if rendered.descend {
                for &child in self.doc.children(rendered.node).iter().rev() {
                    stack.push(Work {
                        node: child,
                        context: Some(rendered.context.clone()),
                        force: false,
                    });
                }
            }
        }

        if first && !component.attached {
            self.doc.move_children(component.fragment, component.shadow)?;
            component.attached = true;
        }
        Ok(())
    }

    /// Inside this component's own tree (template fragment or shadow root)
    pub(crate) fn is_live(&self, component: &Component, node: NodeId) -> bool {
        self.doc
            .ancestors(node)
            .take_while(|&a| a != component.host)
            .any(|a| a == component.fragment || a == component.shadow)
    }

    /// Re-render one node: nested components are refreshed in place, every
    /// other node is swapped for a fresh copy of its template before the
    /// directives run on it
    pub(crate) fn render_node(
        &mut self,
        component: &mut Component,
        old: NodeId,
        context: Option<Object>,
    ) -> RenderResult<Rendered> {
        let mut meta = component.nodes.meta(old);
        if let Some(context) = context {
            meta.context = context;
        }

        if self.hosts.contains_key(&old) && self.keeps_component(component, old, &meta)? {
            component.nodes.insert(old, meta.clone());
            self.update_child(old, &meta.context);
            return Ok(Rendered::leaf(old, meta.context));
        }
        if self.is_component_candidate(old) {
            component.nodes.insert(old, meta.clone());
            self.start_child(old, component.id, &meta.context)?;
            return Ok(Rendered::leaf(old, meta.context));
        }

        let placeholder = self.doc.is_comment(old) && meta.template.is_some();
        let template = meta.template;
        let fresh = match template {
            Some(template) if placeholder => self.doc.clone_node(template, true)?,
            Some(template) => self.doc.clone_node(template, false)?,
            None => {
                let copy = self.doc.clone_node(old, false)?;
                meta.template = Some(old);
                copy
            }
        };
        if !placeholder {
            self.doc.move_children(old, fresh)?;
        }
        self.doc.replace_child(old, fresh)?;
        trace!(old = %old, fresh = %fresh, "Replaced node");

        let context = meta.context.clone();
        component.nodes.insert(fresh, meta.clone());
        self.forget_node(component, old);
        if template.is_some() {
            self.retired.push(old);
        }

        let mut spawned = Vec::new();
        let mut current = fresh;

        if !meta.iterative && self.doc.has_attribute(current, ":for") {
            let (replacement, items) = self.apply_for(component, current, &meta)?;
            current = replacement;
            spawned = items;
        }

        if self.doc.has_attribute(current, ":if") {
            let (node, shown) = self.apply_if(component, current, &context)?;
            if !shown {
                return Ok(Rendered {
                    spawned,
                    ..Rendered::leaf(node, context)
                });
            }
            current = node;
        }

        if self.is_component_candidate(current) {
            self.start_child(current, component.id, &context)?;
            return Ok(Rendered {
                spawned,
                ..Rendered::leaf(current, context)
            });
        }

        self.bind_events(component, current)?;
        self.bind_attributes(component, current, &context)?;
        self.interpolate(component, current, &context)?;

        Ok(Rendered {
            node: current,
            context,
            descend: true,
            spawned,
        })
    }

    /// Registered element that has no instance yet and no structural
    /// directive left to resolve
    fn is_component_candidate(&self, node: NodeId) -> bool {
        !self.hosts.contains_key(&node)
            && !self.doc.has_attribute(node, ":for")
            && !self.doc.has_attribute(node, ":if")
            && self
                .doc
                .tag(node)
                .is_some_and(|tag| self.registry.is_registered(tag))
    }

    /// Stop tracking a node that left the tree. Its template is retired
    /// with it unless another node still renders from it.
    pub(crate) fn forget_node(&mut self, component: &mut Component, node: NodeId) {
        if let Some(store) = &component.store {
            store.forget(region(node));
        }
        if let Some(meta) = component.nodes.remove(node) {
            self.retired.extend(meta.template);
        }
        self.listeners.remove(&node);
    }

    pub(crate) fn forget_subtree(&mut self, component: &mut Component, root: NodeId) {
        let nodes = self.doc.subtree(root);
        if let Some(store) = &component.store {
            store.forget_all(nodes.iter().copied().map(region));
        }
        for node in nodes {
            if let Some(meta) = component.nodes.remove(node) {
                self.retired.extend(meta.template);
            }
            self.listeners.remove(&node);
        }
    }

    /// Free the nodes retired during this tick that are still detached and
    /// that no live node renders from. Components hosted inside a freed
    /// subtree are dropped with it.
    pub(crate) fn sweep(&mut self) -> usize {
        if self.retired.is_empty() {
            return 0;
        }
        let retired = std::mem::take(&mut self.retired);
        let mut pinned: HashSet<NodeId> = self.registry.template_nodes().collect();
        for component in self.components.iter().flatten() {
            pinned.extend(component.nodes.templates());
            pinned.insert(component.fragment);
        }

        let mut freed = 0;
        for root in retired {
            if !self.doc.contains(root)
                || self.doc.parent(root).is_some()
                || self.doc.host(root).is_some()
            {
                continue;
            }
            let nodes = self.doc.composed_subtree(root);
            if nodes.iter().any(|node| pinned.contains(node)) {
                continue;
            }
            for node in &nodes {
                if let Some(id) = self.hosts.get(node).copied() {
                    self.drop_component(id);
                }
                self.listeners.remove(node);
            }
            freed += self.doc.free(root).unwrap_or(0);
        }
        if freed > 0 {
            debug!(freed, nodes = self.doc.node_count(), "Freed retired nodes");
        }
        freed
    }

    /// A copy of `node` as it was before any rendering: every node is
    /// rebuilt from its template, placeholders yield their template and
    /// generated list items below `node` are left out
    pub(crate) fn pristine_copy(
        &mut self,
        component: &Component,
        node: NodeId,
    ) -> RenderResult<NodeId> {
        let meta: Option<NodeMeta> = component.nodes.get(node).cloned();
        let Some(template) = meta.and_then(|m| m.template) else {
            return Ok(self.doc.clone_node(node, true)?);
        };
        if self.doc.is_comment(node) {
            return Ok(self.doc.clone_node(template, true)?);
        }

        let copy = self.doc.clone_node(template, false)?;
        for child in self.doc.children(node).to_vec() {
            if component.nodes.is_iterative(child) {
                continue;
            }
            let child_copy = self.pristine_copy(component, child)?;
            self.doc.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }
}
