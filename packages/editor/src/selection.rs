//! Selection and tool-mode state.
//!
//! These are ephemeral slices owned by an edit session. None of them is
//! persisted and all of them start over when a document is loaded.

use crate::document::{Document, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Active canvas interaction mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    #[default]
    Select,
    Drag,
    Resize,
    Edit,
}

/// Tool used in the content manager view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerTool {
    #[default]
    Connect,
    Delete,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolState {
    pub mode: ToolMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerState {
    pub tool: ManagerTool,
    pub open: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolbarState {
    pub locked: bool,
}

/// Set of selected node ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<NodeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the selection. Ids not in the document are ignored.
    pub fn select(&mut self, doc: &Document, id: &str) -> bool {
        if !doc.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    /// Replace the selection with a single node
    pub fn select_only(&mut self, doc: &Document, id: &str) -> bool {
        if !doc.contains(id) {
            return false;
        }
        self.ids.clear();
        self.ids.insert(id.to_string())
    }

    /// Flip membership of a node. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, doc: &Document, id: &str) -> bool {
        if self.ids.remove(id) {
            return false;
        }
        self.select(doc, id)
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that no longer exist in the document
    pub fn heal(&mut self, doc: &Document) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| doc.contains(id));
        before - self.ids.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The selected id when exactly one node is selected
    pub fn primary(&self) -> Option<&str> {
        if self.ids.len() == 1 {
            self.ids.iter().next().map(String::as_str)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Node, Props};
    use crate::resolver::Registry;
    use std::sync::Arc;

    fn doc_with_text() -> (Document, NodeId) {
        let mut doc = Document::new(Arc::new(Registry::builtin()), "test").unwrap();
        let root = doc.root_id().to_string();
        let id = doc.next_id();
        doc.insert(&root, 0, Node::new(id.clone(), "text", Props::new()))
            .unwrap();
        (doc, id)
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ToolState::default().mode, ToolMode::Select);
        assert_eq!(ManagerState::default().tool, ManagerTool::Connect);
        assert!(!ManagerState::default().open);
        assert!(!ToolbarState::default().locked);
    }

    #[test]
    fn test_select_absent_id_is_noop() {
        let (doc, _) = doc_with_text();
        let mut selection = Selection::new();
        assert!(!selection.select(&doc, "missing"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_multi_select_and_primary() {
        let (doc, text) = doc_with_text();
        let root = doc.root_id().to_string();
        let mut selection = Selection::new();

        selection.select(&doc, &text);
        assert_eq!(selection.primary(), Some(text.as_str()));

        selection.select(&doc, &root);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.primary(), None);

        assert!(!selection.toggle(&doc, &root));
        assert_eq!(selection.primary(), Some(text.as_str()));

        selection.select_only(&doc, &root);
        assert_eq!(selection.ids().collect::<Vec<_>>(), vec![root.as_str()]);
    }

    #[test]
    fn test_heal_drops_removed_nodes() {
        let (mut doc, text) = doc_with_text();
        let mut selection = Selection::new();
        selection.select(&doc, &text);

        doc.remove(&text).unwrap();
        assert_eq!(selection.heal(&doc), 1);
        assert!(selection.is_empty());
    }
}
