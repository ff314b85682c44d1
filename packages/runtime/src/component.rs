//! Component declarations and per-instance state

use crate::scope::NodeTable;
use ripple_dom::NodeId;
use ripple_reactive::{Object, Store};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Lifecycle callbacks a component may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// After the reactive data exists, before the first render
    Created,
    /// After the first render only
    Mounted,
    /// After every render, the first included
    Rendered,
}

/// A component type: its initial data, lifecycle hooks and event methods
pub trait ComponentDef {
    /// Initial data. Props passed by the parent override keys defined here.
    fn data(&self) -> Object {
        Object::new()
    }

    /// Hooks this component wants to receive
    fn hooks(&self) -> &'static [Hook] {
        &[]
    }

    fn hook(&mut self, _hook: Hook, _handle: &Handle) {}

    /// Names usable in `~event="method"` bindings
    fn methods(&self) -> &'static [&'static str] {
        &[]
    }

    fn call(&mut self, _method: &str, _handle: &Handle) {}
}

/// A component with fixed initial data and no behavior
#[derive(Debug, Clone, Default)]
pub struct StaticComponent {
    data: Object,
}

impl StaticComponent {
    pub fn new(data: Object) -> Self {
        Self { data }
    }
}

impl ComponentDef for StaticComponent {
    fn data(&self) -> Object {
        // every instance starts from its own copy
        self.data.detached_copy()
    }
}

type Callback = Box<dyn FnOnce()>;

/// Cloneable access to a running component instance
#[derive(Clone)]
pub struct Handle {
    id: ComponentId,
    data: Object,
    ticks: Rc<RefCell<Vec<Callback>>>,
}

impl Handle {
    pub(crate) fn new(id: ComponentId, data: Object) -> Self {
        Self {
            id,
            data,
            ticks: Rc::default(),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The component's reactive data; writes schedule a re-render
    pub fn data(&self) -> &Object {
        &self.data
    }

    /// Run `callback` right after the next render pass. Callbacks queued
    /// later run first.
    pub fn next_tick(&self, callback: impl FnOnce() + 'static) {
        self.ticks.borrow_mut().push(Box::new(callback));
    }

    pub fn pending_ticks(&self) -> usize {
        self.ticks.borrow().len()
    }

    pub(crate) fn drain_ticks(&self) {
        loop {
            let next = self.ticks.borrow_mut().pop();
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("data", &self.data)
            .field("pending_ticks", &self.pending_ticks())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Running,
    /// A render fault stopped this instance; it is never scheduled again
    Failed,
}

pub(crate) struct Component {
    pub id: ComponentId,
    pub tag: String,
    pub host: NodeId,
    pub shadow: NodeId,
    /// Template content; its children move into `shadow` after the first render
    pub fragment: NodeId,
    pub parent: Option<ComponentId>,
    pub def: Box<dyn ComponentDef>,
    pub store: Option<Store>,
    pub handle: Option<Handle>,
    pub nodes: NodeTable,
    pub state: Lifecycle,
    pub attached: bool,
}

impl Component {
    pub fn declares(&self, hook: Hook) -> bool {
        self.def.hooks().contains(&hook)
    }

    pub fn fire(&mut self, hook: Hook) {
        if !self.declares(hook) {
            return;
        }
        if let Some(handle) = self.handle.clone() {
            self.def.hook(hook, &handle);
        }
    }
}
