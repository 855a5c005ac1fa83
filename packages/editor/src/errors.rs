//! Error types for the editor

use crate::document::NodeId;
use thiserror::Error;

/// Failures raised by the resolver registry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    #[error("Unknown widget type: {0}")]
    UnknownType(String),

    #[error("Widget type '{0}' is already registered with a different entry")]
    ConflictingRegistration(String),
}

/// Structural failures raised by tree operations and commands.
///
/// A mutation that fails with any of these leaves the document untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Invalid parent: {0}")]
    InvalidParent(NodeId),

    #[error("Index {index} out of range (parent has {len} children)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Moving {node_id} under {new_parent_id} would create a cycle")]
    CyclicMove {
        node_id: NodeId,
        new_parent_id: NodeId,
    },

    #[error("Node {0} is locked")]
    LockedNode(NodeId),

    #[error("Root node {0} cannot be moved, duplicated or removed")]
    RootNode(NodeId),

    #[error("Invalid subtree: {0}")]
    InvalidSubtree(String),

    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

/// Failures raised by the undo/redo stack
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("A batch is already in progress")]
    BatchInProgress,

    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),
}

/// Failures raised while encoding or decoding a document blob
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed blob: {0}")]
    MalformedBlob(String),

    #[error("Dangling reference from {from} to missing node {missing}")]
    DanglingReference { from: String, missing: NodeId },

    #[error("Inconsistent tree: {0}")]
    InconsistentTree(String),

    #[error("Node {node_id} has unknown widget type '{widget}'")]
    UnknownType { node_id: NodeId, widget: String },

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Umbrella error for edit sessions
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("Property error: {0}")]
    Property(#[from] crate::widgets::PropertyError),
}
