//! # Commands
//!
//! Reversible mutations on a document.
//!
//! ## Design Principles
//!
//! 1. **Validated up front**: a command that fails leaves the document as it was
//! 2. **Exact inverses**: applying a command and then its inverse restores the
//!    document exactly, including props the command never touched
//! 3. **Replayable**: commands that allocate ids are resolved before they are
//!    recorded (`AddNode` to `InsertSubtree`, `DuplicateNode` to
//!    `RestoreSubtree`), so redo re-creates the very same nodes
//!
//! ## Inverses
//!
//! | Command | Inverse |
//! |---|---|
//! | `AddNode` / `DuplicateNode` / `InsertSubtree` / `RestoreSubtree` | `RemoveNode` of the inserted top node |
//! | `RemoveNode` | `RestoreSubtree` with the removed nodes at the old position |
//! | `MoveNode` | `MoveNode` back to the old parent and index |
//! | `SetProps` / `ReplaceProps` | `ReplaceProps` with the previous bag |
//! | `SetLocked` | `SetLocked` with the previous flag |
//! | `SetTags` | `SetTags` with the previous tags |

use crate::document::{Document, Node, NodeId, Props};
use crate::errors::MutationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Command {
    /// Add a new widget. Props are laid over the widget's defaults.
    AddNode {
        parent_id: NodeId,
        index: usize,
        widget: String,
        props: Option<Props>,
    },

    /// Remove a node and everything beneath it
    RemoveNode { node_id: NodeId },

    /// Move a node to a new parent at index
    MoveNode {
        node_id: NodeId,
        new_parent_id: NodeId,
        index: usize,
    },

    /// Shallow-merge props into a node
    SetProps { node_id: NodeId, props: Props },

    /// Replace a node's props wholesale
    ReplaceProps { node_id: NodeId, props: Props },

    SetLocked { node_id: NodeId, locked: bool },

    /// Insert a pre-order node list of new widgets as one subtree, keeping its ids
    InsertSubtree {
        parent_id: NodeId,
        index: usize,
        nodes: Vec<Node>,
    },

    /// Put back nodes that came out of this document, placeholders included.
    /// Only produced by the engine; never accepted from the wire.
    #[serde(skip_deserializing)]
    RestoreSubtree {
        parent_id: NodeId,
        index: usize,
        nodes: Vec<Node>,
    },

    /// Copy a subtree with fresh ids, placing the copy right after the original
    DuplicateNode { node_id: NodeId },

    /// Replace the document-level tags
    SetTags { tags: Vec<String> },
}

/// A command after it has been applied: the replayable forward form plus its inverse
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub forward: Command,
    pub inverse: Command,
}

impl Command {
    /// Debug name
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddNode { .. } => "AddNode",
            Command::RemoveNode { .. } => "RemoveNode",
            Command::MoveNode { .. } => "MoveNode",
            Command::SetProps { .. } => "SetProps",
            Command::ReplaceProps { .. } => "ReplaceProps",
            Command::SetLocked { .. } => "SetLocked",
            Command::InsertSubtree { .. } => "InsertSubtree",
            Command::RestoreSubtree { .. } => "RestoreSubtree",
            Command::DuplicateNode { .. } => "DuplicateNode",
            Command::SetTags { .. } => "SetTags",
        }
    }

    /// Validate without applying
    pub fn validate(&self, doc: &Document) -> Result<(), MutationError> {
        match self {
            Command::AddNode {
                parent_id,
                index,
                widget,
                ..
            } => {
                doc.registry().resolve(widget)?;
                doc.check_insert(parent_id, *index)
            }

            Command::RemoveNode { node_id } => doc.check_remove(node_id),

            Command::MoveNode {
                node_id,
                new_parent_id,
                index,
            } => doc.check_move(node_id, new_parent_id, *index),

            Command::SetProps { node_id, .. }
            | Command::ReplaceProps { node_id, .. }
            | Command::SetLocked { node_id, .. } => {
                if doc.contains(node_id) {
                    Ok(())
                } else {
                    Err(MutationError::NotFound(node_id.clone()))
                }
            }

            Command::InsertSubtree {
                parent_id,
                index,
                nodes,
            } => doc.check_insert_subtree(parent_id, *index, nodes),

            Command::RestoreSubtree {
                parent_id,
                index,
                nodes,
            } => doc.check_restore_subtree(parent_id, *index, nodes),

            Command::DuplicateNode { node_id } => {
                let (parent_id, index) = Self::duplicate_position(doc, node_id)?;
                doc.check_restore(&parent_id, index + 1)
            }

            Command::SetTags { .. } => Ok(()),
        }
    }

    /// Apply to the document, returning the replayable forward command and its inverse
    pub fn apply(self, doc: &mut Document) -> Result<Applied, MutationError> {
        let forward = self.resolve(doc)?;
        let inverse = forward.inverse(doc)?;
        forward.execute(doc)?;
        Ok(Applied { forward, inverse })
    }

    /// Turn id-allocating commands into an `InsertSubtree` with concrete ids
    fn resolve(self, doc: &mut Document) -> Result<Command, MutationError> {
        match self {
            Command::AddNode {
                parent_id,
                index,
                widget,
                props,
            } => {
                let mut merged = doc.registry().default_props(&widget)?;
                doc.check_insert(&parent_id, index)?;

                if let Some(props) = props {
                    for (key, value) in props {
                        merged.insert(key, value);
                    }
                }

                let node = Node::new(doc.next_id(), widget, merged);
                Ok(Command::InsertSubtree {
                    parent_id,
                    index,
                    nodes: vec![node],
                })
            }

            Command::DuplicateNode { node_id } => {
                let (parent_id, index) = Self::duplicate_position(doc, &node_id)?;

                let originals: Vec<Node> = doc.subtree(&node_id).cloned().collect();
                let mut renamed: HashMap<NodeId, NodeId> = HashMap::with_capacity(originals.len());
                for original in &originals {
                    renamed.insert(original.id.clone(), doc.next_id());
                }

                let mut nodes: Vec<Node> = originals
                    .into_iter()
                    .map(|mut node| {
                        node.id = renamed[&node.id].clone();
                        node.children = node
                            .children
                            .iter()
                            .map(|child| renamed[child].clone())
                            .collect();
                        node.parent_id = node
                            .parent_id
                            .as_ref()
                            .and_then(|p| renamed.get(p).cloned());
                        node
                    })
                    .collect();

                // The copy comes out unlocked so it can be undone
                if let Some(top) = nodes.first_mut() {
                    top.locked = false;
                }

                Ok(Command::RestoreSubtree {
                    parent_id,
                    index: index + 1,
                    nodes,
                })
            }

            other => Ok(other),
        }
    }

    fn duplicate_position(doc: &Document, node_id: &str) -> Result<(NodeId, usize), MutationError> {
        if !doc.contains(node_id) {
            return Err(MutationError::NotFound(node_id.to_string()));
        }
        if node_id == doc.root_id() {
            return Err(MutationError::RootNode(node_id.to_string()));
        }
        doc.position_of(node_id)
            .ok_or_else(|| MutationError::NotFound(node_id.to_string()))
    }

    /// Build the inverse of this command against the document it is about to be applied to
    fn inverse(&self, doc: &Document) -> Result<Command, MutationError> {
        match self {
            Command::AddNode { .. } | Command::DuplicateNode { .. } => {
                // Always resolved before this point
                Err(MutationError::InvalidSubtree(format!(
                    "{} must be resolved before it can be inverted",
                    self.name()
                )))
            }

            Command::InsertSubtree { nodes, .. } | Command::RestoreSubtree { nodes, .. } => {
                let top = nodes
                    .first()
                    .ok_or_else(|| MutationError::InvalidSubtree("empty subtree".to_string()))?;
                Ok(Command::RemoveNode {
                    node_id: top.id.clone(),
                })
            }

            Command::RemoveNode { node_id } => {
                doc.check_remove(node_id)?;
                let (parent_id, index) = doc
                    .position_of(node_id)
                    .ok_or_else(|| MutationError::NotFound(node_id.clone()))?;
                Ok(Command::RestoreSubtree {
                    parent_id,
                    index,
                    nodes: doc.subtree(node_id).cloned().collect(),
                })
            }

            Command::MoveNode { node_id, .. } => {
                let (parent_id, index) = doc
                    .position_of(node_id)
                    .ok_or_else(|| MutationError::NotFound(node_id.clone()))?;
                Ok(Command::MoveNode {
                    node_id: node_id.clone(),
                    new_parent_id: parent_id,
                    index,
                })
            }

            Command::SetProps { node_id, .. } | Command::ReplaceProps { node_id, .. } => {
                let node = doc
                    .get(node_id)
                    .ok_or_else(|| MutationError::NotFound(node_id.clone()))?;
                Ok(Command::ReplaceProps {
                    node_id: node_id.clone(),
                    props: node.props.clone(),
                })
            }

            Command::SetLocked { node_id, .. } => {
                let node = doc
                    .get(node_id)
                    .ok_or_else(|| MutationError::NotFound(node_id.clone()))?;
                Ok(Command::SetLocked {
                    node_id: node_id.clone(),
                    locked: node.locked,
                })
            }

            Command::SetTags { .. } => Ok(Command::SetTags {
                tags: doc.tags().to_vec(),
            }),
        }
    }

    /// Execute against the document without recording anything
    pub fn execute(&self, doc: &mut Document) -> Result<(), MutationError> {
        match self {
            Command::AddNode { .. } | Command::DuplicateNode { .. } => {
                self.clone().resolve(doc)?.execute(doc)
            }

            Command::RemoveNode { node_id } => doc.remove(node_id).map(|_| ()),

            Command::MoveNode {
                node_id,
                new_parent_id,
                index,
            } => doc.move_node(node_id, new_parent_id, *index).map(|_| ()),

            Command::SetProps { node_id, props } => {
                doc.set_props(node_id, props.clone()).map(|_| ())
            }

            Command::ReplaceProps { node_id, props } => {
                doc.replace_props(node_id, props.clone()).map(|_| ())
            }

            Command::SetLocked { node_id, locked } => {
                doc.set_locked(node_id, *locked).map(|_| ())
            }

            Command::InsertSubtree {
                parent_id,
                index,
                nodes,
            } => doc.insert_subtree(parent_id, *index, nodes.clone()),

            Command::RestoreSubtree {
                parent_id,
                index,
                nodes,
            } => doc.restore_subtree(parent_id, *index, nodes.clone()),

            Command::SetTags { tags } => {
                doc.set_tags(tags.clone());
                Ok(())
            }
        }
    }
}
