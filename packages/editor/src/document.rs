//! # Document Tree
//!
//! The node tree for one piece of content.
//!
//! Nodes live in a flat arena keyed by id. Parent/child relationships are id
//! references into that arena, never ownership pointers, so the tree cannot
//! form reference cycles and is trivially cloneable and serializable.
//!
//! ## Invariants
//!
//! Every public mutation below either succeeds and leaves these intact, or
//! fails without touching the document:
//!
//! - The nodes form exactly one tree rooted at `root_id` (no cycles, no
//!   orphans, no node with two parents)
//! - `nodes[n].parent_id == Some(p)` iff `n` is in `nodes[p].children`
//! - Ids are never reused within the lifetime of a document
//!
//! ## Locking
//!
//! A locked node rejects structural changes: it cannot be removed or moved,
//! and neither can anything beneath it. Nodes cannot be inserted under a
//! locked node either. Property edits are always allowed.

use crate::errors::MutationError;
use crate::id_generator::IdGenerator;
use crate::resolver::Registry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

pub type NodeId = String;

/// Open property bag of a node
pub type Props = Map<String, Value>;

/// One widget instance in the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Widget type tag
    #[serde(rename = "type")]
    pub widget: String,
    #[serde(default)]
    pub props: Props,
    /// Child ids in render order
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub locked: bool,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, widget: impl Into<String>, props: Props) -> Self {
        Self {
            id: id.into(),
            widget: widget.into(),
            props,
            children: Vec::new(),
            parent_id: None,
            locked: false,
        }
    }
}

/// Structural defects found by [`validate_tree`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeDefect {
    #[error("root {0} is missing")]
    MissingRoot(NodeId),

    #[error("node {parent} lists missing child {child}")]
    MissingChild { parent: NodeId, child: NodeId },

    #[error("root {0} is listed as a child of {1}")]
    RootHasParent(NodeId, NodeId),

    #[error("node {node} is listed under both {first} and {second}")]
    MultipleParents {
        node: NodeId,
        first: NodeId,
        second: NodeId,
    },

    #[error("node {0} is not reachable from the root")]
    Unreachable(NodeId),

    #[error("node {node} records parent {recorded:?} but is listed under {actual:?}")]
    ParentMismatch {
        node: NodeId,
        recorded: Option<NodeId>,
        actual: Option<NodeId>,
    },
}

/// Check that `nodes` forms exactly one tree under `root_id`.
///
/// Returns the parent of every node as implied by the children lists. When
/// `check_back_refs` is set, each node's recorded `parent_id` must agree.
pub fn validate_tree(
    root_id: &str,
    nodes: &HashMap<NodeId, Node>,
    check_back_refs: bool,
) -> Result<HashMap<NodeId, NodeId>, TreeDefect> {
    if !nodes.contains_key(root_id) {
        return Err(TreeDefect::MissingRoot(root_id.to_string()));
    }

    // Sorted walk so the reported defect is deterministic
    let mut ids: Vec<&NodeId> = nodes.keys().collect();
    ids.sort();

    let mut parents: HashMap<NodeId, NodeId> = HashMap::new();
    for id in ids.iter().copied() {
        let node = &nodes[id];
        for child in &node.children {
            if !nodes.contains_key(child) {
                return Err(TreeDefect::MissingChild {
                    parent: id.clone(),
                    child: child.clone(),
                });
            }
            if child == root_id {
                return Err(TreeDefect::RootHasParent(child.clone(), id.clone()));
            }
            if let Some(first) = parents.insert(child.clone(), id.clone()) {
                return Err(TreeDefect::MultipleParents {
                    node: child.clone(),
                    first,
                    second: id.clone(),
                });
            }
        }
    }

    // Each non-root node has exactly one parent now, so anything outside the
    // root's reach is either an orphan or part of a detached cycle.
    let mut seen: HashSet<&str> = HashSet::with_capacity(nodes.len());
    let mut stack = vec![root_id];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        stack.extend(nodes[id].children.iter().map(String::as_str));
    }

    if let Some(orphan) = ids.iter().find(|id| !seen.contains(id.as_str())) {
        return Err(TreeDefect::Unreachable((*orphan).clone()));
    }

    if check_back_refs {
        for id in ids {
            let actual = parents.get(id).cloned();
            if nodes[id].parent_id != actual {
                return Err(TreeDefect::ParentMismatch {
                    node: id.clone(),
                    recorded: nodes[id].parent_id.clone(),
                    actual,
                });
            }
        }
    }

    Ok(parents)
}

/// Add any default prop the node's registered type defines and the node lacks.
/// Placeholders are left as they are.
pub(crate) fn seed_defaults(registry: &Registry, node: &mut Node) {
    if let Ok(entry) = registry.resolve(&node.widget) {
        for (key, value) in &entry.default_props {
            node.props
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// Editable document tree
#[derive(Debug, Clone)]
pub struct Document {
    root_id: NodeId,
    nodes: HashMap<NodeId, Node>,
    tags: Vec<String>,
    registry: Arc<Registry>,
    ids: IdGenerator,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.root_id == other.root_id && self.nodes == other.nodes && self.tags == other.tags
    }
}

impl Document {
    /// Create an empty document with a canvas root
    pub fn new(registry: Arc<Registry>, content_id: &str) -> Result<Self, MutationError> {
        Self::with_root(registry, content_id, "canvas")
    }

    /// Create an empty document whose root has the given widget type
    pub fn with_root(
        registry: Arc<Registry>,
        content_id: &str,
        root_widget: &str,
    ) -> Result<Self, MutationError> {
        let props = registry.default_props(root_widget)?;
        let mut ids = IdGenerator::new(content_id);
        let root_id = ids.new_id();

        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), Node::new(root_id.clone(), root_widget, props));

        Ok(Self {
            root_id,
            nodes,
            tags: Vec::new(),
            registry,
            ids,
        })
    }

    /// Assemble a document from already-validated parts
    pub(crate) fn from_parts(
        registry: Arc<Registry>,
        content_id: &str,
        root_id: NodeId,
        nodes: HashMap<NodeId, Node>,
        tags: Vec<String>,
    ) -> Self {
        let mut ids = IdGenerator::new(content_id);
        for id in nodes.keys() {
            ids.observe(id);
        }

        Self {
            root_id,
            nodes,
            tags,
            registry,
            ids,
        }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn root(&self) -> &Node {
        &self.nodes[&self.root_id]
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Allocate a fresh node id that has never been used in this document
    pub fn next_id(&mut self) -> NodeId {
        loop {
            let id = self.ids.new_id();
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        let parent_id = self.nodes.get(id)?.parent_id.as_deref()?;
        self.nodes.get(parent_id)
    }

    /// Parent id and position of a node within its parent
    pub fn position_of(&self, id: &str) -> Option<(NodeId, usize)> {
        let parent = self.parent_of(id)?;
        let index = parent
            .children
            .iter()
            .position(|c| c == id)?;
        Some((parent.id.clone(), index))
    }

    /// Walk from a node's parent up to the root
    pub fn ancestors(&self, id: &str) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.nodes.get(id).and_then(|n| n.parent_id.as_deref()),
        }
    }

    /// True if `id` sits somewhere beneath `ancestor`
    pub fn is_descendant(&self, id: &str, ancestor: &str) -> bool {
        self.ancestors(id).any(|n| n.id == ancestor)
    }

    /// Depth-first, pre-order walk of the subtree rooted at `id`.
    ///
    /// Empty if `id` is not in the document. Each call starts a fresh walk
    /// over the current tree.
    pub fn subtree(&self, id: &str) -> Subtree<'_> {
        let stack = self
            .nodes
            .get_key_value(id)
            .map(|(key, _)| vec![key.as_str()])
            .unwrap_or_default();
        Subtree { doc: self, stack }
    }

    /// True if the node or any of its ancestors is locked
    pub fn is_locked(&self, id: &str) -> bool {
        match self.nodes.get(id) {
            Some(node) => node.locked || self.ancestors(id).any(|n| n.locked),
            None => false,
        }
    }

    /// Verify the tree invariants
    pub fn check_integrity(&self) -> Result<(), TreeDefect> {
        validate_tree(&self.root_id, &self.nodes, true).map(|_| ())
    }

    // -- validation -------------------------------------------------------

    /// Check that a child could be inserted under `parent_id` at `index`
    pub fn check_insert(&self, parent_id: &str, index: usize) -> Result<(), MutationError> {
        let parent = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| MutationError::InvalidParent(parent_id.to_string()))?;

        if !self.registry.accepts_children(&parent.widget) {
            return Err(MutationError::InvalidParent(parent_id.to_string()));
        }

        self.check_destination(parent_id, index)
    }

    fn check_destination(&self, parent_id: &str, index: usize) -> Result<(), MutationError> {
        if self.is_locked(parent_id) {
            return Err(MutationError::LockedNode(parent_id.to_string()));
        }

        let len = self.nodes[parent_id].children.len();
        if index > len {
            return Err(MutationError::IndexOutOfRange { index, len });
        }

        Ok(())
    }

    /// Check that an existing subtree could be placed under `parent_id` at `index`
    pub fn check_restore(&self, parent_id: &str, index: usize) -> Result<(), MutationError> {
        let parent = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| MutationError::InvalidParent(parent_id.to_string()))?;

        if !self.holds_children(&parent.widget) {
            return Err(MutationError::InvalidParent(parent_id.to_string()));
        }

        self.check_destination(parent_id, index)
    }

    /// Containers, plus placeholders: they keep whatever children they were
    /// loaded with, so existing nodes may be put back beneath them.
    fn holds_children(&self, widget: &str) -> bool {
        !self.registry.is_registered(widget) || self.registry.accepts_children(widget)
    }

    /// Check that a node could be detached from the tree
    pub fn check_remove(&self, id: &str) -> Result<(), MutationError> {
        if !self.nodes.contains_key(id) {
            return Err(MutationError::NotFound(id.to_string()));
        }
        if id == self.root_id {
            return Err(MutationError::RootNode(id.to_string()));
        }
        if self.is_locked(id) {
            return Err(MutationError::LockedNode(id.to_string()));
        }
        Ok(())
    }

    /// Check that `id` could be moved under `new_parent_id` at `index`.
    ///
    /// `index` is measured against the destination's children after `id` has
    /// been detached from its current parent.
    pub fn check_move(
        &self,
        id: &str,
        new_parent_id: &str,
        index: usize,
    ) -> Result<(), MutationError> {
        if !self.nodes.contains_key(id) {
            return Err(MutationError::NotFound(id.to_string()));
        }
        if id == self.root_id {
            return Err(MutationError::RootNode(id.to_string()));
        }

        let parent = self
            .nodes
            .get(new_parent_id)
            .ok_or_else(|| MutationError::InvalidParent(new_parent_id.to_string()))?;

        if new_parent_id == id || self.is_descendant(new_parent_id, id) {
            return Err(MutationError::CyclicMove {
                node_id: id.to_string(),
                new_parent_id: new_parent_id.to_string(),
            });
        }

        if !self.holds_children(&parent.widget) {
            return Err(MutationError::InvalidParent(new_parent_id.to_string()));
        }

        if self.is_locked(id) {
            return Err(MutationError::LockedNode(id.to_string()));
        }
        if self.is_locked(new_parent_id) {
            return Err(MutationError::LockedNode(new_parent_id.to_string()));
        }

        let mut len = parent.children.len();
        if parent.children.iter().any(|c| c == id) {
            len -= 1;
        }
        if index > len {
            return Err(MutationError::IndexOutOfRange { index, len });
        }

        Ok(())
    }

    // -- mutation ---------------------------------------------------------

    /// Insert a new, childless node under `parent_id` at `index`
    pub fn insert(
        &mut self,
        parent_id: &str,
        index: usize,
        mut node: Node,
    ) -> Result<(), MutationError> {
        self.registry.resolve(&node.widget)?;
        self.check_insert(parent_id, index)?;

        if self.nodes.contains_key(&node.id) {
            return Err(MutationError::DuplicateId(node.id));
        }
        if !node.children.is_empty() {
            return Err(MutationError::InvalidSubtree(format!(
                "node {} must be inserted without children",
                node.id
            )));
        }

        seed_defaults(&self.registry, &mut node);
        node.parent_id = Some(parent_id.to_string());
        self.ids.observe(&node.id);
        self.attach(parent_id, index, node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Check that a pre-order node list of new widgets could be inserted as one subtree.
    ///
    /// Every node must have a registered type, and only container types may
    /// list children.
    pub fn check_insert_subtree(
        &self,
        parent_id: &str,
        index: usize,
        nodes: &[Node],
    ) -> Result<(), MutationError> {
        self.check_insert(parent_id, index)?;
        for node in nodes {
            self.registry.resolve(&node.widget)?;
            if !node.children.is_empty() && !self.registry.accepts_children(&node.widget) {
                return Err(MutationError::InvalidParent(node.id.clone()));
            }
        }
        self.check_subtree_shape(nodes)
    }

    /// Check that nodes taken from this document could be put back as one subtree.
    ///
    /// Placeholders are allowed anywhere in the set and may keep their children.
    pub fn check_restore_subtree(
        &self,
        parent_id: &str,
        index: usize,
        nodes: &[Node],
    ) -> Result<(), MutationError> {
        self.check_restore(parent_id, index)?;
        for node in nodes {
            if !node.children.is_empty() && !self.holds_children(&node.widget) {
                return Err(MutationError::InvalidParent(node.id.clone()));
            }
        }
        self.check_subtree_shape(nodes)
    }

    fn check_subtree_shape(&self, nodes: &[Node]) -> Result<(), MutationError> {
        let top = nodes
            .first()
            .ok_or_else(|| MutationError::InvalidSubtree("empty subtree".to_string()))?;

        if top.locked {
            return Err(MutationError::LockedNode(top.id.clone()));
        }

        let mut by_id: HashMap<NodeId, Node> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if self.nodes.contains_key(&node.id) {
                return Err(MutationError::DuplicateId(node.id.clone()));
            }
            if by_id.insert(node.id.clone(), node.clone()).is_some() {
                return Err(MutationError::DuplicateId(node.id.clone()));
            }
        }

        // The subtree's own top has no parent inside the set
        if let Some(entry) = by_id.get_mut(&top.id) {
            entry.parent_id = None;
        }

        validate_tree(&top.id, &by_id, false)
            .map(|_| ())
            .map_err(|defect| MutationError::InvalidSubtree(defect.to_string()))
    }

    /// Insert a subtree of new widgets, given in pre-order with the top node first.
    ///
    /// Nodes keep their ids. Parent back-references are rebuilt from the
    /// children lists.
    pub fn insert_subtree(
        &mut self,
        parent_id: &str,
        index: usize,
        nodes: Vec<Node>,
    ) -> Result<(), MutationError> {
        self.check_insert_subtree(parent_id, index, &nodes)?;
        self.place_subtree(parent_id, index, nodes);
        Ok(())
    }

    /// Put back a subtree that was taken from this document, placeholders included
    pub fn restore_subtree(
        &mut self,
        parent_id: &str,
        index: usize,
        nodes: Vec<Node>,
    ) -> Result<(), MutationError> {
        self.check_restore_subtree(parent_id, index, &nodes)?;
        self.place_subtree(parent_id, index, nodes);
        Ok(())
    }

    fn place_subtree(&mut self, parent_id: &str, index: usize, nodes: Vec<Node>) {
        let top_id = nodes[0].id.clone();
        let mut parents: HashMap<NodeId, NodeId> = HashMap::new();
        for node in &nodes {
            for child in &node.children {
                parents.insert(child.clone(), node.id.clone());
            }
        }

        for mut node in nodes {
            node.parent_id = if node.id == top_id {
                Some(parent_id.to_string())
            } else {
                parents.get(&node.id).cloned()
            };
            seed_defaults(&self.registry, &mut node);
            self.ids.observe(&node.id);
            self.nodes.insert(node.id.clone(), node);
        }

        self.attach(parent_id, index, top_id);
    }

    /// Remove a node and its entire subtree.
    ///
    /// Returns the removed nodes in pre-order, top node first.
    pub fn remove(&mut self, id: &str) -> Result<Vec<Node>, MutationError> {
        self.check_remove(id)?;

        let doomed: Vec<NodeId> = self.subtree(id).map(|n| n.id.clone()).collect();
        self.detach(id);

        Ok(doomed
            .iter()
            .filter_map(|nid| self.nodes.remove(nid))
            .collect())
    }

    /// Move a node under a new parent.
    ///
    /// Returns the node's previous parent and index.
    pub fn move_node(
        &mut self,
        id: &str,
        new_parent_id: &str,
        index: usize,
    ) -> Result<(NodeId, usize), MutationError> {
        self.check_move(id, new_parent_id, index)?;

        let previous = self
            .position_of(id)
            .ok_or_else(|| MutationError::NotFound(id.to_string()))?;

        self.detach(id);
        self.attach(new_parent_id, index, id.to_string());
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = Some(new_parent_id.to_string());
        }

        Ok(previous)
    }

    /// Shallow-merge `partial` into a node's props. Returns the previous props.
    pub fn set_props(&mut self, id: &str, partial: Props) -> Result<Props, MutationError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| MutationError::NotFound(id.to_string()))?;

        let previous = node.props.clone();
        for (key, value) in partial {
            node.props.insert(key, value);
        }
        Ok(previous)
    }

    /// Replace a node's props wholesale. Returns the previous props.
    ///
    /// Default keys the new bag leaves out are seeded again.
    pub fn replace_props(&mut self, id: &str, props: Props) -> Result<Props, MutationError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| MutationError::NotFound(id.to_string()))?;

        let previous = std::mem::replace(&mut node.props, props);
        seed_defaults(&self.registry, node);
        Ok(previous)
    }

    /// Set a node's lock flag. Returns the previous value.
    pub fn set_locked(&mut self, id: &str, locked: bool) -> Result<bool, MutationError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| MutationError::NotFound(id.to_string()))?;

        Ok(std::mem::replace(&mut node.locked, locked))
    }

    /// Replace the document tags. Returns the previous tags.
    pub fn set_tags(&mut self, tags: Vec<String>) -> Vec<String> {
        std::mem::replace(&mut self.tags, tags)
    }

    fn attach(&mut self, parent_id: &str, index: usize, child: NodeId) {
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.insert(index, child);
        }
    }

    fn detach(&mut self, id: &str) {
        let parent_id = self.nodes.get(id).and_then(|n| n.parent_id.clone());
        if let Some(parent) = parent_id.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| c != id);
        }
    }
}

/// Pre-order subtree iterator returned by [`Document::subtree`]
pub struct Subtree<'a> {
    doc: &'a Document,
    stack: Vec<&'a str>,
}

impl<'a> Iterator for Subtree<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.doc.nodes.get(id)?;
        self.stack
            .extend(node.children.iter().rev().map(String::as_str));
        Some(node)
    }
}

/// Parent chain iterator returned by [`Document::ancestors`]
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<&'a str>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.doc.nodes.get(self.next?)?;
        self.next = node.parent_id.as_deref();
        Some(node)
    }
}
