//! Component instances, their lifecycle and the task loop that drives them

use crate::component::{Component, ComponentDef, ComponentId, Handle, Hook, Lifecycle};
use crate::error::{RenderError, RenderResult, RuntimeError, RuntimeResult};
use crate::registry::Registry;
use crate::scheduler::{Scheduler, Task};
use crate::scope::{host_props, NodeTable};
use ripple_dom::{parse_fragment, Document, NodeId};
use ripple_reactive::{Object, Store};
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

/// A `~event="method"` binding recorded on a rendered node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub event: String,
    pub component: ComponentId,
    pub method: String,
}

pub struct Runtime {
    pub(crate) doc: Document,
    pub(crate) registry: Registry,
    /// Root scope for components without an enclosing component
    pub(crate) globals: Object,
    pub(crate) components: Vec<Option<Component>>,
    /// Kept apart from `components` so scopes stay readable while an
    /// instance is checked out for rendering
    pub(crate) handles: HashMap<ComponentId, Handle>,
    pub(crate) hosts: HashMap<NodeId, ComponentId>,
    pub(crate) listeners: HashMap<NodeId, Vec<EventBinding>>,
    pub(crate) scheduler: Scheduler,
    pub(crate) next_group: u64,
    /// Nodes taken out of the tree during this tick, freed when it ends
    pub(crate) retired: Vec<NodeId>,
    faults: Vec<RuntimeError>,
}

impl Runtime {
    pub fn new(doc: Document, registry: Registry) -> Self {
        Self {
            doc,
            registry,
            globals: Object::new(),
            components: Vec::new(),
            handles: HashMap::new(),
            hosts: HashMap::new(),
            listeners: HashMap::new(),
            scheduler: Scheduler::new(),
            next_group: 0,
            retired: Vec::new(),
            faults: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn globals(&self) -> &Object {
        &self.globals
    }

    pub fn set_globals(&mut self, globals: Object) {
        self.globals = globals;
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Parse markup into a detached fragment, keeping its `<template id>`
    /// elements as named templates
    pub fn load(&mut self, source: &str) -> RuntimeResult<NodeId> {
        let fragment = parse_fragment(&mut self.doc, source)?;
        let count = self.registry.collect_templates(&mut self.doc, fragment)?;
        debug!(templates = count, "Loaded markup");
        Ok(fragment)
    }

    pub fn define<F>(&mut self, tag: &str, template: &str, factory: F)
    where
        F: Fn() -> Box<dyn ComponentDef> + 'static,
    {
        self.registry.register(tag, template, factory);
    }

    // ---------------------------------------------------------------
    // Instances
    // ---------------------------------------------------------------

    /// Create a `<tag>` host under `parent` and start its component.
    /// Initialization happens on the next tick.
    pub fn mount(&mut self, tag: &str, parent: NodeId) -> RuntimeResult<ComponentId> {
        let host = self.doc.create_element(tag.to_ascii_lowercase());
        self.doc.append_child(parent, host)?;
        self.upgrade(host)
    }

    /// Start the component for an existing host element
    pub fn upgrade(&mut self, host: NodeId) -> RuntimeResult<ComponentId> {
        if let Some(&id) = self.hosts.get(&host) {
            return Ok(id);
        }
        let id = self.instantiate(host, None)?;
        self.scheduler.defer(Task::Initialize(id));
        Ok(id)
    }

    /// Upgrade every registered element under `root` (shadow trees excluded)
    pub fn upgrade_all(&mut self, root: NodeId) -> RuntimeResult<Vec<ComponentId>> {
        let candidates: Vec<NodeId> = self
            .doc
            .subtree(root)
            .into_iter()
            .filter(|&n| {
                self.doc
                    .tag(n)
                    .is_some_and(|tag| self.registry.is_registered(tag))
            })
            .collect();
        candidates
            .into_iter()
            .map(|host| self.upgrade(host))
            .collect()
    }

    /// Attach a shadow root to `host` and give the new instance its own copy
    /// of the template content
    pub(crate) fn instantiate(
        &mut self,
        host: NodeId,
        parent: Option<ComponentId>,
    ) -> RenderResult<ComponentId> {
        let tag = self
            .doc
            .tag(host)
            .map(str::to_string)
            .ok_or(RenderError::UnknownComponent(host.to_string()))?;
        let (registration, template) = self.registry.resolve(&tag)?;
        let def = registration.instantiate();

        let shadow = self.doc.attach_shadow(host)?;
        let fragment = self.doc.create_fragment();
        for child in self.doc.children(template).to_vec() {
            let copy = self.doc.clone_node(child, true)?;
            self.doc.append_child(fragment, copy)?;
        }

        let id = ComponentId(self.components.len());
        self.components.push(Some(Component {
            id,
            tag: tag.clone(),
            host,
            shadow,
            fragment,
            parent,
            def,
            store: None,
            handle: None,
            nodes: NodeTable::default(),
            state: Lifecycle::Uninitialized,
            attached: false,
        }));
        self.hosts.insert(host, id);
        info!(component = %id, tag = %tag, host = %host, "Instantiated component");
        Ok(id)
    }

    /// Check an instance out, run `f` on it and put it back. A fault marks
    /// the instance failed and is kept for the current tick to report.
    pub(crate) fn with_component<F>(&mut self, id: ComponentId, f: F)
    where
        F: FnOnce(&mut Self, &mut Component) -> RenderResult<()>,
    {
        let Some(mut component) = self.components.get_mut(id.0).and_then(Option::take) else {
            // already checked out further up the stack, or dropped
            return;
        };
        if let Err(source) = f(self, &mut component) {
            component.state = Lifecycle::Failed;
            self.scheduler.cancel(id);
            error!(component = %id, tag = %component.tag, error = %source, "Component failed");
            self.faults.push(RuntimeError::Component {
                id,
                tag: component.tag.clone(),
                source,
            });
        }
        if let Some(slot) = self.components.get_mut(id.0) {
            *slot = Some(component);
        }
    }

    /// Data of the enclosing component, or the globals
    pub(crate) fn parent_scope(&self, component: &Component) -> Object {
        component
            .parent
            .and_then(|parent| self.handles.get(&parent))
            .map(|handle| handle.data().clone())
            .unwrap_or_else(|| self.globals.clone())
    }

    fn find_parent(&self, component: &Component) -> Option<ComponentId> {
        self.doc
            .ancestors(component.host)
            .filter_map(|node| self.hosts.get(&node).copied())
            .find(|&id| id != component.id && self.handles.contains_key(&id))
    }

    #[instrument(skip(self, component, context), fields(component = %component.id, tag = %component.tag))]
    pub(crate) fn initialize(
        &mut self,
        component: &mut Component,
        context: &Object,
    ) -> RenderResult<()> {
        if component.state != Lifecycle::Uninitialized {
            return Ok(());
        }
        component.state = Lifecycle::Initializing;
        if component.parent.is_none() {
            component.parent = self.find_parent(component);
        }

        let scope = self.parent_scope(component);
        let props = host_props(&self.doc, component.host, context, &scope);
        let merged = component.def.data();
        for (key, value) in props.entries() {
            merged.set(key, value);
        }

        let store = Store::new(merged);
        let handle = Handle::new(component.id, store.data().clone());
        self.handles.insert(component.id, handle.clone());
        component.store = Some(store);
        component.handle = Some(handle);
        component.state = Lifecycle::Running;
        info!(props = props.len(), "Initialized component");

        component.fire(Hook::Created);
        self.run(component, true)
    }

    /// One pass: render when first or when anything changed, fire hooks,
    /// drain next-tick callbacks and ask for the next frame
    pub(crate) fn run(&mut self, component: &mut Component, first: bool) -> RenderResult<()> {
        let (Some(store), Some(handle)) = (component.store.clone(), component.handle.clone()) else {
            return Ok(());
        };
        if first || store.any_changed() {
            self.render(component, first)?;
            if store.unswept() > 0 {
                store.sweep();
            }
            if first {
                component.fire(Hook::Mounted);
            }
            component.fire(Hook::Rendered);
        }
        handle.drain_ticks();
        self.scheduler.request_frame(component.id);
        Ok(())
    }

    /// Refresh a nested instance from its parent's render: recompute its
    /// props, write them into its data and re-render it if that changed
    /// anything. The instance is never re-created.
    pub(crate) fn update_child(&mut self, host: NodeId, context: &Object) {
        let Some(&id) = self.hosts.get(&host) else {
            return;
        };
        self.with_component(id, |runtime, child| {
            if child.state == Lifecycle::Uninitialized {
                return runtime.initialize(child, context);
            }
            if child.state != Lifecycle::Running {
                return Ok(());
            }
            let scope = runtime.parent_scope(child);
            let props = host_props(&runtime.doc, host, context, &scope);
            if let Some(store) = &child.store {
                for (key, value) in props.entries() {
                    store.data().set(key, value);
                }
            }
            runtime.run(child, false)
        });
    }

    /// Start a registered element found by a parent's render
    pub(crate) fn start_child(
        &mut self,
        host: NodeId,
        parent: ComponentId,
        context: &Object,
    ) -> RenderResult<()> {
        let id = self.instantiate(host, Some(parent))?;
        self.with_component(id, |runtime, child| runtime.initialize(child, context));
        Ok(())
    }

    /// Forget an instance. Its templates and unattached fragment are freed;
    /// the host and shadow tree belong to whoever still holds the host.
    pub(crate) fn drop_component(&mut self, id: ComponentId) {
        let Some(component) = self.components.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        self.hosts.remove(&component.host);
        self.handles.remove(&id);
        self.scheduler.cancel(id);
        self.listeners.retain(|_, bindings| {
            bindings.retain(|b| b.component != id);
            !bindings.is_empty()
        });

        let owned: Vec<NodeId> = component
            .nodes
            .templates()
            .chain(std::iter::once(component.fragment))
            .collect();
        let mut freed = 0;
        for node in owned {
            if self.doc.contains(node) && self.doc.parent(node).is_none() {
                freed += self.doc.free(node).unwrap_or(0);
            }
        }
        info!(component = %id, tag = %component.tag, freed, "Dropped disconnected component");
    }

    // ---------------------------------------------------------------
    // Task loop
    // ---------------------------------------------------------------

    fn perform(&mut self, task: Task) {
        match task {
            Task::Initialize(id) => {
                self.with_component(id, |runtime, component| {
                    runtime.initialize(component, &Object::new())
                });
            }
            Task::Run(id) => {
                let connected = match self.components.get(id.0) {
                    Some(Some(component)) => {
                        if component.state != Lifecycle::Running {
                            return;
                        }
                        self.doc.is_connected(component.host)
                    }
                    _ => return,
                };
                if !connected {
                    self.drop_component(id);
                    return;
                }
                self.with_component(id, |runtime, component| runtime.run(component, false));
            }
        }
    }

    /// Run every deferred task queued before this call. Faults are isolated
    /// per component; the first one is returned once all tasks have run.
    #[instrument(skip(self), fields(tasks = self.scheduler.pending_tasks()))]
    pub fn tick(&mut self) -> RuntimeResult<()> {
        for task in self.scheduler.take_deferred() {
            self.perform(task);
        }
        self.sweep();
        let mut faults = std::mem::take(&mut self.faults).into_iter();
        match faults.next() {
            Some(first) => {
                let remaining = faults.count();
                if remaining > 0 {
                    warn!(remaining, "Additional component faults in this tick");
                }
                Err(first)
            }
            None => Ok(()),
        }
    }

    /// Begin a display frame: pending frame requests become deferred passes
    pub fn animation_frame(&mut self) -> usize {
        self.scheduler.animation_frame()
    }

    /// One display frame followed by the deferred work it produced
    pub fn step(&mut self) -> RuntimeResult<()> {
        self.animation_frame();
        self.tick()
    }

    /// Run `frames` display frames, stopping at the first fault
    pub fn run_frames(&mut self, frames: usize) -> RuntimeResult<()> {
        for _ in 0..frames {
            self.step()?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Events and inspection
    // ---------------------------------------------------------------

    /// Invoke every `~event` binding on `node`. Returns how many ran.
    pub fn dispatch(&mut self, node: NodeId, event: &str) -> usize {
        let bindings: Vec<EventBinding> = self
            .listeners
            .get(&node)
            .map(|all| all.iter().filter(|b| b.event == event).cloned().collect())
            .unwrap_or_default();

        let mut invoked = 0;
        for binding in bindings {
            let Some(Some(component)) = self.components.get_mut(binding.component.0) else {
                warn!(component = %binding.component, "Event target is gone");
                continue;
            };
            let Some(handle) = component.handle.clone() else {
                continue;
            };
            debug!(node = %node, event, method = %binding.method, "Dispatching event");
            component.def.call(&binding.method, &handle);
            invoked += 1;
        }
        invoked
    }

    pub fn listeners(&self, node: NodeId) -> &[EventBinding] {
        self.listeners.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn handle(&self, id: ComponentId) -> Option<&Handle> {
        self.handles.get(&id)
    }

    pub fn store(&self, id: ComponentId) -> Option<&Store> {
        self.components
            .get(id.0)
            .and_then(Option::as_ref)
            .and_then(|c| c.store.as_ref())
    }

    pub fn component_at(&self, host: NodeId) -> Option<ComponentId> {
        self.hosts.get(&host).copied()
    }

    pub fn state(&self, id: ComponentId) -> Option<Lifecycle> {
        self.components
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|c| c.state)
    }

    pub fn host(&self, id: ComponentId) -> Option<NodeId> {
        self.components
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|c| c.host)
    }

    pub fn shadow_root(&self, id: ComponentId) -> Option<NodeId> {
        self.host(id).and_then(|host| self.doc.shadow_root(host))
    }

    /// Instances that are still alive
    pub fn components(&self) -> Vec<ComponentId> {
        self.components.iter().flatten().map(|c| c.id).collect()
    }
}
