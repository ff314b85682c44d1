//! # Host Tree
//!
//! An arena-backed document tree with the small surface the renderer needs:
//! cloning (shallow and deep), attribute storage, child insertion, removal and
//! replacement, comment placeholders and shadow roots.
//!
//! Removing a node detaches it (and its subtree) from its parent; the
//! detached subtree stays addressable so that it can serve as a template or
//! be re-inserted later, exactly like a detached DOM node. Its slots are only
//! reclaimed by an explicit [`Document::free`], after which the ids may be
//! handed out again by later allocations.
//!
//! ## Shadow roots
//!
//! A shadow root is owned by exactly one host element. It is not one of the
//! host's children: `parent()` of a shadow root is `None` and `host()` points
//! back at the owning element. [`Document::ancestors`] crosses that boundary,
//! which is how a component finds its enclosing component.

use crate::error::{DomError, DomResult};
use std::fmt;

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document itself, the root every connected node reaches
    Root,
    Element {
        tag: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
    /// Non-rendering marker, used as a placeholder by directives
    Comment(String),
    Fragment,
    ShadowRoot,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadow_root: Option<NodeId>,
    host: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            shadow_root: None,
            host: None,
        }
    }
}

/// In-memory document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<NodeData>>,
    /// Freed slots, reused by the next allocations
    vacant: Vec<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(NodeData::new(NodeKind::Root))],
            vacant: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Nodes currently allocated, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.vacant.len()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        match self.vacant.pop() {
            Some(id) => {
                self.nodes[id.0] = Some(NodeData::new(kind));
                id
            }
            None => {
                let id = NodeId(self.nodes.len());
                self.nodes.push(Some(NodeData::new(kind)));
                id
            }
        }
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn data(&self, id: NodeId) -> DomResult<&NodeData> {
        self.node(id).ok_or(DomError::UnknownNode(id))
    }

    fn data_mut(&mut self, id: NodeId) -> DomResult<&mut NodeData> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(DomError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Release a detached node, its descendants and the shadow trees of any
    /// hosts among them. Returns how many nodes were freed.
    pub fn free(&mut self, id: NodeId) -> DomResult<usize> {
        let data = self.data(id)?;
        if id == self.root() || data.parent.is_some() || data.host.is_some() {
            return Err(DomError::Attached { node: id });
        }
        let nodes = self.composed_subtree(id);
        for &node in &nodes {
            if let Some(slot) = self.nodes.get_mut(node.0) {
                *slot = None;
                self.vacant.push(node);
            }
        }
        Ok(nodes.len())
    }

    // ---------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.into(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    // ---------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Element { tag, .. }) => Some(tag),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Comment(_)))
    }

    /// Character data of a text or comment node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) | Some(NodeKind::Comment(text)) => Some(text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) -> DomResult<()> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => {
                *text = value.into();
                Ok(())
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// Concatenated text of every descendant text node (shadow trees excluded)
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.subtree(id) {
            if let Some(NodeKind::Text(text)) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    // ---------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attributes(id).iter().any(|a| a.name == name)
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> DomResult<()> {
        let name = name.into();
        let value = value.into();
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => {
                match attributes.iter_mut().find(|a| a.name == name) {
                    Some(existing) => existing.value = value,
                    None => attributes.push(Attribute { name, value }),
                }
                Ok(())
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => {
                let position = attributes.iter().position(|a| a.name == name);
                Ok(position.map(|i| attributes.remove(i).value))
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    // ---------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Composed ancestors: parents, and the host of every shadow root passed
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            current: Some(id),
        }
    }

    /// Whether the node reaches the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root() || self.ancestors(id).any(|a| a == self.root())
    }

    /// `id` and all of its descendants in document order; shadow trees are
    /// not entered
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Like [`Document::subtree`], but shadow trees are entered too
    pub fn composed_subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
            stack.extend(self.shadow_root(node));
        }
        out
    }

    fn detach(&mut self, id: NodeId) -> DomResult<()> {
        if let Some(parent) = self.data(id)?.parent {
            self.data_mut(parent)?.children.retain(|&c| c != id);
            self.data_mut(id)?.parent = None;
        }
        Ok(())
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.data(parent)?;
        self.data(child)?;
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::HierarchyCycle { node: child });
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (at the end when
    /// `reference` is `None`); a child that already has a parent is moved
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.check_insert(parent, child)?;
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
            if reference == child {
                return Ok(());
            }
        }
        self.detach(child)?;
        let index = match reference {
            Some(reference) => self
                .index_in_parent(reference)
                .ok_or(DomError::NotAChild {
                    parent,
                    child: reference,
                })?,
            None => self.children(parent).len(),
        };
        self.data_mut(parent)?.children.insert(index, child);
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Insert `child` right after `reference`, inside `reference`'s parent
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> DomResult<()> {
        if reference == child {
            return Ok(());
        }
        let parent = self
            .parent(reference)
            .ok_or(DomError::Detached { node: reference })?;
        let next = self.next_sibling(reference);
        if next == Some(child) {
            return Ok(());
        }
        self.insert_before(parent, child, next)
    }

    /// Put `new` at the position of `old`, detaching `old`
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) -> DomResult<()> {
        if old == new {
            return Ok(());
        }
        let parent = self.parent(old).ok_or(DomError::Detached { node: old })?;
        self.check_insert(parent, new)?;
        self.detach(new)?;
        let index = self.index_in_parent(old).ok_or(DomError::NotAChild {
            parent,
            child: old,
        })?;
        self.data_mut(parent)?.children[index] = new;
        self.data_mut(new)?.parent = Some(parent);
        self.data_mut(old)?.parent = None;
        Ok(())
    }

    /// Detach a node from its parent; detached nodes are left untouched
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        self.data(id)?;
        self.detach(id)
    }

    /// Move every child of `from` to the end of `to`, keeping order
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> DomResult<()> {
        let children = self.children(from).to_vec();
        for child in children {
            self.append_child(to, child)?;
        }
        Ok(())
    }

    /// Copy a node. Deep copies include descendants; shadow roots are never
    /// copied, matching `Node.cloneNode`.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> DomResult<NodeId> {
        let kind = self.data(id)?.kind.clone();
        let kind = match kind {
            NodeKind::Root | NodeKind::ShadowRoot => NodeKind::Fragment,
            other => other,
        };
        let copy = self.alloc(kind);
        if deep {
            let children = self.children(id).to_vec();
            for child in children {
                let child_copy = self.clone_node(child, true)?;
                self.data_mut(copy)?.children.push(child_copy);
                self.data_mut(child_copy)?.parent = Some(copy);
            }
        }
        Ok(copy)
    }

    // ---------------------------------------------------------------
    // Shadow roots
    // ---------------------------------------------------------------

    pub fn attach_shadow(&mut self, host: NodeId) -> DomResult<NodeId> {
        if !self.is_element(host) {
            return Err(DomError::NotAnElement(host));
        }
        if self.data(host)?.shadow_root.is_some() {
            return Err(DomError::ShadowAlreadyAttached(host));
        }
        let shadow = self.alloc(NodeKind::ShadowRoot);
        self.data_mut(shadow)?.host = Some(host);
        self.data_mut(host)?.shadow_root = Some(shadow);
        Ok(shadow)
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.node(host).and_then(|n| n.shadow_root)
    }

    pub fn host(&self, shadow: NodeId) -> Option<NodeId> {
        self.node(shadow).and_then(|n| n.host)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`Document::ancestors`]
pub struct Ancestors<'a> {
    doc: &'a Document,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.current?;
        let next = self
            .doc
            .parent(current)
            .or_else(|| self.doc.host(current));
        self.current = next;
        next
    }
}
