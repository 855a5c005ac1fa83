//! # Lumo Editor
//!
//! Document editing engine for Lumo Creator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ resolver: widget tag → capability bundle    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: flat node arena, one rooted tree  │
//! │  - insert / remove / move / set props       │
//! │  - locking, subtree walks, integrity check  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ commands + undo stack: reversible edits     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ serializer: Document ⇄ versioned JSON blob  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Commands are the only writers**: every edit is a reversible `Command`
//! 2. **Failed edits are no-ops**: validation happens before anything changes
//! 3. **Unknown widgets are explicit**: rejected, or kept as opaque placeholders
//! 4. **The registry is frozen**: built once, shared as `Arc<Registry>`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lumo_editor::{Command, EditSession, EditorConfig, Registry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::builtin());
//! let mut session = EditSession::new(registry, "lesson-1", &EditorConfig::default())?;
//!
//! let root = session.document().root_id().to_string();
//! session.dispatch(Command::AddNode {
//!     parent_id: root,
//!     index: 0,
//!     widget: "text".to_string(),
//!     props: None,
//! })?;
//!
//! session.undo()?;
//! let blob = session.save_blob()?;
//! ```

mod config;
mod document;
mod errors;
mod id_generator;
mod mutations;
mod resolver;
mod selection;
mod serializer;
mod session;
mod undo_stack;
mod widgets;

pub use config::EditorConfig;
pub use document::{validate_tree, Ancestors, Document, Node, NodeId, Props, Subtree, TreeDefect};
pub use errors::{CodecError, EditorError, HistoryError, MutationError, ResolverError};
pub use id_generator::{content_seed, IdGenerator};
pub use mutations::{Applied, Command};
pub use resolver::{Registry, ResolverEntry};
pub use selection::{ManagerState, ManagerTool, Selection, ToolMode, ToolState, ToolbarState};
pub use serializer::{deserialize, serialize, serialize_pretty, LoadMode, Loaded, FORMAT_VERSION};
pub use session::EditSession;
pub use undo_stack::{CommandBatch, HistoryState, UndoStack};
pub use widgets::{
    Control, FieldSpec, PropertyError, PropertyField, PropertyPanel, RenderOutput, WidgetKind,
};
