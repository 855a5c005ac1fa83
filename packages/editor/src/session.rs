//! # Edit Session Management
//!
//! An `EditSession` is one user's editing context for one document: the
//! document itself, its undo history, and the ephemeral selection and tool
//! state around it.
//!
//! Every change goes through [`EditSession::dispatch`] (or undo/redo), after
//! which the selection is healed so it never names a node that is gone.

use crate::config::EditorConfig;
use crate::document::{Document, NodeId};
use crate::errors::EditorError;
use crate::mutations::Command;
use crate::resolver::Registry;
use crate::selection::{ManagerState, Selection, ToolMode, ToolState, ToolbarState};
use crate::serializer::{self, Loaded};
use crate::undo_stack::{HistoryState, UndoStack};
use crate::widgets::{PropertyPanel, RenderOutput};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct EditSession {
    content_id: String,
    document: Document,
    history: UndoStack,
    selection: Selection,

    /// Canvas tool slice
    pub tools: ToolState,

    /// Content manager slice
    pub manager: ManagerState,

    /// Toolbar slice
    pub toolbar: ToolbarState,

    /// Bumped on every change to the document
    revision: u64,
    saved_revision: u64,

    /// Nodes loaded with an unregistered widget type
    placeholders: Vec<NodeId>,
}

impl EditSession {
    /// Start a session on an empty document with a canvas root
    pub fn new(
        registry: Arc<Registry>,
        content_id: impl Into<String>,
        config: &EditorConfig,
    ) -> Result<Self, EditorError> {
        let content_id = content_id.into();
        let document = Document::new(registry, &content_id)?;
        Ok(Self::from_document(content_id, document, Vec::new(), config))
    }

    /// Start a session on a persisted blob
    pub fn load(
        blob: &str,
        registry: Arc<Registry>,
        content_id: impl Into<String>,
        config: &EditorConfig,
    ) -> Result<Self, EditorError> {
        let content_id = content_id.into();
        let Loaded {
            document,
            placeholders,
        } = serializer::deserialize(blob, registry, &content_id, config.load_mode())?;
        Ok(Self::from_document(content_id, document, placeholders, config))
    }

    fn from_document(
        content_id: String,
        document: Document,
        placeholders: Vec<NodeId>,
        config: &EditorConfig,
    ) -> Self {
        Self {
            content_id,
            document,
            history: UndoStack::with_max_levels(config.max_undo_levels),
            selection: Selection::new(),
            tools: ToolState::default(),
            manager: ManagerState::default(),
            toolbar: ToolbarState::default(),
            revision: 0,
            saved_revision: 0,
            placeholders,
        }
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn placeholders(&self) -> &[NodeId] {
        &self.placeholders
    }

    // -- history ----------------------------------------------------------

    pub fn dispatch(&mut self, command: Command) -> Result<(), EditorError> {
        self.history.dispatch(command, &mut self.document)?;
        self.changed();
        Ok(())
    }

    pub fn begin_batch(&mut self, description: Option<&str>) -> Result<(), EditorError> {
        self.history.begin_batch()?;
        if let Some(description) = description {
            self.history.set_batch_description(description);
        }
        Ok(())
    }

    pub fn end_batch(&mut self) -> bool {
        self.history.end_batch()
    }

    pub fn is_batching(&self) -> bool {
        self.history.state() == HistoryState::Batching
    }

    pub fn undo(&mut self) -> Result<(), EditorError> {
        self.history.undo(&mut self.document)?;
        self.changed();
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), EditorError> {
        self.history.redo(&mut self.document)?;
        self.changed();
        Ok(())
    }

    fn changed(&mut self) {
        self.revision += 1;
        let dropped = self.selection.heal(&self.document);
        if dropped > 0 {
            debug!(dropped, "selection healed");
        }
    }

    // -- selection & tools ------------------------------------------------

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn select(&mut self, id: &str) -> bool {
        self.selection.select(&self.document, id)
    }

    pub fn select_only(&mut self, id: &str) -> bool {
        self.selection.select_only(&self.document, id)
    }

    pub fn toggle_selection(&mut self, id: &str) -> bool {
        self.selection.toggle(&self.document, id)
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        self.selection.deselect(id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn set_tool_mode(&mut self, mode: ToolMode) {
        self.tools.mode = mode;
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.tools.mode
    }

    /// Property panel for the single selected node, if exactly one is selected
    pub fn active_editor(&self) -> Option<PropertyPanel> {
        let id = self.selection.primary()?;
        let node = self.document.get(id)?;
        Some(self.document.registry().property_editor(node))
    }

    /// Edit one field of a node through its property panel
    pub fn edit_property(
        &mut self,
        node_id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), EditorError> {
        let node = self
            .document
            .get(node_id)
            .ok_or_else(|| crate::errors::MutationError::NotFound(node_id.to_string()))?;
        let command = self.document.registry().property_editor(node).edit(field, value)?;
        self.dispatch(command)
    }

    // -- rendering --------------------------------------------------------

    pub fn render(&self, node_id: &str) -> Option<RenderOutput> {
        let node = self.document.get(node_id)?;
        Some(self.document.registry().render(node))
    }

    /// Render descriptions for the whole document in pre-order
    pub fn render_all(&self) -> Vec<RenderOutput> {
        let registry = self.document.registry();
        self.document
            .subtree(self.document.root_id())
            .map(|node| registry.render(node))
            .collect()
    }

    // -- persistence ------------------------------------------------------

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether there are changes since the last successful save
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub fn save_blob(&self) -> Result<String, EditorError> {
        Ok(serializer::serialize(&self.document)?)
    }

    /// Record that `revision` reached the store
    pub fn mark_saved(&mut self, revision: u64) {
        self.saved_revision = self.saved_revision.max(revision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{HistoryError, MutationError};
    use serde_json::json;

    fn session() -> EditSession {
        EditSession::new(
            Arc::new(Registry::builtin()),
            "lesson-1",
            &EditorConfig::default(),
        )
        .unwrap()
    }

    fn add(session: &mut EditSession, widget: &str) -> NodeId {
        let root = session.document().root_id().to_string();
        let len = session.document().root().children.len();
        session
            .dispatch(Command::AddNode {
                parent_id: root,
                index: len,
                widget: widget.to_string(),
                props: None,
            })
            .unwrap();
        session.document().root().children[len].clone()
    }

    #[test]
    fn test_session_creation() {
        let session = session();
        assert_eq!(session.content_id(), "lesson-1");
        assert_eq!(session.document().len(), 1);
        assert_eq!(session.tool_mode(), ToolMode::Select);
        assert!(!session.is_dirty());
        assert!(session.active_editor().is_none());
    }

    #[test]
    fn test_active_editor_follows_selection() {
        let mut session = session();
        let text = add(&mut session, "text");
        let image = add(&mut session, "image");

        session.select(&text);
        let panel = session.active_editor().unwrap();
        assert_eq!(panel.node_id, text);
        assert!(panel.field("text").is_some());

        session.select(&image);
        assert!(session.active_editor().is_none());
    }

    #[test]
    fn test_undo_heals_selection() {
        let mut session = session();
        let text = add(&mut session, "text");
        session.select(&text);

        session.undo().unwrap();
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_edit_property() {
        let mut session = session();
        let text = add(&mut session, "text");

        session.edit_property(&text, "text", json!("Hello")).unwrap();
        assert_eq!(
            session.document().get(&text).unwrap().props.get("text"),
            Some(&json!("Hello"))
        );

        assert!(matches!(
            session.edit_property(&text, "fontSize", json!("huge")),
            Err(EditorError::Property(_))
        ));
        assert!(matches!(
            session.edit_property("missing", "text", json!("x")),
            Err(EditorError::Mutation(MutationError::NotFound(_)))
        ));
    }

    #[test]
    fn test_batch_through_session() {
        let mut session = session();
        session.begin_batch(Some("Build header")).unwrap();
        add(&mut session, "header");
        add(&mut session, "text");
        assert!(session.is_batching());
        assert!(matches!(
            session.undo(),
            Err(EditorError::History(HistoryError::BatchInProgress))
        ));
        assert!(session.end_batch());

        assert_eq!(session.history().undo_description(), Some("Build header"));
        session.undo().unwrap();
        assert_eq!(session.document().len(), 1);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut session = session();
        add(&mut session, "slider");
        assert!(session.is_dirty());

        let revision = session.revision();
        let blob = session.save_blob().unwrap();
        session.mark_saved(revision);
        assert!(!session.is_dirty());

        let reloaded = EditSession::load(
            &blob,
            Arc::new(Registry::builtin()),
            "lesson-1",
            &EditorConfig::default(),
        )
        .unwrap();
        assert_eq!(reloaded.document(), session.document());
        assert!(reloaded.selection().is_empty());
    }

    #[test]
    fn test_render_all_is_preorder() {
        let mut session = session();
        add(&mut session, "header");
        add(&mut session, "footer");

        let rendered = session.render_all();
        assert_eq!(rendered.len(), 3);
        assert_eq!(rendered[0].node_id, session.document().root_id());
        assert_eq!(rendered[1].element, "header");
        assert_eq!(rendered[2].element, "footer");
    }
}
