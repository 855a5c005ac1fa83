//! # Undo/Redo Stack
//!
//! Tracks command history and enables undo/redo operations.
//!
//! ## Design
//!
//! - Each command records its inverse before being applied
//! - Undo applies the inverse and moves the entry to the redo stack
//! - Redo reapplies the recorded forward commands
//! - New commands clear the redo stack
//! - Supports batched operations (group multiple commands as one undo step)
//!
//! ## States
//!
//! ```text
//!            begin_batch()
//!   Idle ───────────────────▶ Batching
//!    ▲                           │
//!    └───────── end_batch() ─────┘
//! ```
//!
//! Commands dispatched while batching are applied immediately and appended to
//! the open batch. Undo and redo are refused until the batch is closed.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! let mut doc = Document::new(registry, "lesson-1")?;
//!
//! stack.dispatch(Command::SetTags { tags: vec!["physics".into()] }, &mut doc)?;
//!
//! stack.undo(&mut doc)?;
//! stack.redo(&mut doc)?;
//! ```

use crate::document::Document;
use crate::errors::{HistoryError, MutationError};
use crate::mutations::{Applied, Command};
use tracing::{debug, error};

/// A group of commands that should be undone/redone together
#[derive(Debug, Clone, PartialEq)]
pub struct CommandBatch {
    /// The resolved commands in this batch (in application order)
    pub commands: Vec<Command>,

    /// The inverse commands (in reverse order for undo)
    pub inverses: Vec<Command>,

    /// Optional description of this batch
    pub description: Option<String>,
}

impl CommandBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            inverses: Vec::new(),
            description: None,
        }
    }

    /// Create a single-command batch
    pub fn single(applied: Applied) -> Self {
        Self {
            commands: vec![applied.forward],
            inverses: vec![applied.inverse],
            description: None,
        }
    }

    /// Add a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn push(&mut self, applied: Applied) {
        self.commands.push(applied.forward);
        self.inverses.insert(0, applied.inverse);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandBatch {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Idle,
    Batching,
}

/// Undo/redo stack for document editing
#[derive(Debug)]
pub struct UndoStack {
    /// Stack of applied batches (most recent last)
    undo_stack: Vec<CommandBatch>,

    /// Stack of undone batches (most recent last)
    redo_stack: Vec<CommandBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Currently building a batch
    current_batch: Option<CommandBatch>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    pub fn state(&self) -> HistoryState {
        if self.current_batch.is_some() {
            HistoryState::Batching
        } else {
            HistoryState::Idle
        }
    }

    /// Apply a command and record it for undo.
    ///
    /// A command that fails validation touches neither the document nor the stacks.
    pub fn dispatch(&mut self, command: Command, doc: &mut Document) -> Result<(), HistoryError> {
        let name = command.name();
        let applied = command.apply(doc)?;
        debug!(command = name, batching = self.current_batch.is_some(), "dispatched");

        if let Some(batch) = &mut self.current_batch {
            batch.push(applied);
        } else {
            self.push_batch(CommandBatch::single(applied));
        }

        Ok(())
    }

    /// Start a batch of commands (will be undone/redone together)
    pub fn begin_batch(&mut self) -> Result<(), HistoryError> {
        if self.current_batch.is_some() {
            return Err(HistoryError::BatchInProgress);
        }
        self.current_batch = Some(CommandBatch::new());
        Ok(())
    }

    /// End the current batch and push it to the undo stack.
    ///
    /// Returns `false` when no batch was open. An empty batch is discarded.
    pub fn end_batch(&mut self) -> bool {
        let Some(batch) = self.current_batch.take() else {
            return false;
        };

        if !batch.is_empty() {
            debug!(commands = batch.len(), "batch closed");
            self.push_batch(batch);
        }
        true
    }

    /// Set description for current batch (if batching)
    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    /// Push a batch to the undo stack
    fn push_batch(&mut self, batch: CommandBatch) {
        self.undo_stack.push(batch);

        // Trim if exceeded max levels
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // New action invalidates future
        self.redo_stack.clear();
    }

    /// Undo the most recent batch
    pub fn undo(&mut self, doc: &mut Document) -> Result<(), HistoryError> {
        if self.current_batch.is_some() {
            return Err(HistoryError::BatchInProgress);
        }
        let batch = self.undo_stack.last().ok_or(HistoryError::NothingToUndo)?;

        replay(&batch.inverses, &batch.commands, doc)?;

        if let Some(batch) = self.undo_stack.pop() {
            debug!(commands = batch.len(), "undo");
            self.redo_stack.push(batch);
        }
        Ok(())
    }

    /// Redo the most recently undone batch
    pub fn redo(&mut self, doc: &mut Document) -> Result<(), HistoryError> {
        if self.current_batch.is_some() {
            return Err(HistoryError::BatchInProgress);
        }
        let batch = self.redo_stack.last().ok_or(HistoryError::NothingToRedo)?;

        replay(&batch.commands, &batch.inverses, doc)?;

        if let Some(batch) = self.redo_stack.pop() {
            debug!(commands = batch.len(), "redo");
            self.undo_stack.push(batch);
        }
        Ok(())
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.current_batch.is_none() && !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.current_batch.is_none() && !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute `steps` in order. If one fails, the steps already executed are
/// reverted with the matching tail of `counter` (which lists the reverse of
/// `steps` back to front) and the error is returned.
fn replay(steps: &[Command], counter: &[Command], doc: &mut Document) -> Result<(), MutationError> {
    for (done, step) in steps.iter().enumerate() {
        let Err(err) = step.execute(doc) else {
            continue;
        };

        for revert in &counter[counter.len() - done..] {
            if let Err(rollback) = revert.execute(doc) {
                error!(
                    command = revert.name(),
                    error = %rollback,
                    "rollback failed, document may be inconsistent"
                );
            }
        }
        return Err(err);
    }
    Ok(())
}
