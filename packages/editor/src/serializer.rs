//! # Document Codec
//!
//! Converts a [`Document`] to the persisted blob format and back.
//!
//! ```json
//! {
//!   "version": 1,
//!   "rootId": "3f2a91c0-1",
//!   "nodes": {
//!     "3f2a91c0-1": { "type": "canvas", "props": {}, "children": ["3f2a91c0-2"], "locked": false },
//!     "3f2a91c0-2": { "type": "text", "props": { "text": "Hello" }, "children": [], "locked": false }
//!   },
//!   "tags": ["physics"]
//! }
//! ```
//!
//! Nodes and props are written in key order, so serializing the same
//! document twice yields the same bytes. Parent back-references are not
//! stored; they are rebuilt from the children lists on load.
//!
//! Loading never repairs a broken blob. A blob that does not describe exactly
//! one tree is rejected as a whole.

use crate::document::{seed_defaults, validate_tree, Document, Node, NodeId, Props, TreeDefect};
use crate::errors::CodecError;
use crate::resolver::Registry;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Blob format version written by [`serialize`]
pub const FORMAT_VERSION: u64 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobEnvelope {
    version: u64,
    root_id: NodeId,
    #[serde(deserialize_with = "unique_nodes")]
    nodes: BTreeMap<NodeId, BlobNode>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Only the version, read before committing to the full envelope
#[derive(Debug, Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<Value>,
}

/// Node map that rejects a repeated id instead of keeping the last one
fn unique_nodes<'de, D>(deserializer: D) -> Result<BTreeMap<NodeId, BlobNode>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueNodes;

    impl<'de> Visitor<'de> for UniqueNodes {
        type Value = BTreeMap<NodeId, BlobNode>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of node ids to nodes")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut nodes = BTreeMap::new();
            while let Some((id, node)) = access.next_entry::<NodeId, BlobNode>()? {
                if nodes.contains_key(&id) {
                    return Err(de::Error::custom(format!("duplicate node id {}", id)));
                }
                nodes.insert(id, node);
            }
            Ok(nodes)
        }
    }

    deserializer.deserialize_map(UniqueNodes)
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobNode {
    #[serde(rename = "type")]
    widget: String,
    #[serde(default)]
    props: Props,
    #[serde(default)]
    children: Vec<NodeId>,
    #[serde(default)]
    locked: bool,
}

/// How to treat nodes whose widget type is not registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Fail the load with `UnknownType`
    #[default]
    Strict,
    /// Keep the node as an opaque placeholder
    Tolerant,
}

/// Result of a successful load
#[derive(Debug, Clone)]
pub struct Loaded {
    pub document: Document,
    /// Ids of nodes kept as placeholders, in sorted order
    pub placeholders: Vec<NodeId>,
}

fn envelope(doc: &Document) -> BlobEnvelope {
    let nodes = doc
        .nodes()
        .map(|node| {
            (
                node.id.clone(),
                BlobNode {
                    widget: node.widget.clone(),
                    props: node.props.clone(),
                    children: node.children.clone(),
                    locked: node.locked,
                },
            )
        })
        .collect();

    BlobEnvelope {
        version: FORMAT_VERSION,
        root_id: doc.root_id().to_string(),
        nodes,
        tags: doc.tags().to_vec(),
    }
}

/// Serialize a document to a compact blob
pub fn serialize(doc: &Document) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&envelope(doc))?)
}

/// Serialize a document to an indented blob
pub fn serialize_pretty(doc: &Document) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(&envelope(doc))?)
}

/// Parse a blob into a document.
///
/// `content_id` seeds the id generator of the loaded document; it resumes
/// past every id already present in the blob.
pub fn deserialize(
    blob: &str,
    registry: Arc<Registry>,
    content_id: &str,
    mode: LoadMode,
) -> Result<Loaded, CodecError> {
    let probe: VersionProbe =
        serde_json::from_str(blob).map_err(|e| CodecError::MalformedBlob(e.to_string()))?;

    match probe.version.as_ref().and_then(Value::as_u64) {
        Some(FORMAT_VERSION) => {}
        Some(other) => {
            return Err(CodecError::MalformedBlob(format!(
                "unsupported format version {}",
                other
            )))
        }
        None => {
            return Err(CodecError::MalformedBlob(
                "missing or invalid version".to_string(),
            ))
        }
    }

    // Parsed from the text, not from a `Value`, so repeated node ids are still visible
    let envelope: BlobEnvelope =
        serde_json::from_str(blob).map_err(|e| CodecError::MalformedBlob(e.to_string()))?;

    let mut nodes: HashMap<NodeId, Node> = envelope
        .nodes
        .into_iter()
        .map(|(id, raw)| {
            let mut node = Node::new(id.clone(), raw.widget, raw.props);
            node.children = raw.children;
            node.locked = raw.locked;
            (id, node)
        })
        .collect();

    let parents = validate_tree(&envelope.root_id, &nodes, false).map_err(format_error)?;

    let mut ids: Vec<NodeId> = nodes.keys().cloned().collect();
    ids.sort();

    let mut placeholders = Vec::new();
    for id in &ids {
        let Some(node) = nodes.get_mut(id) else {
            continue;
        };

        match registry.resolve(&node.widget) {
            Ok(_) => seed_defaults(&registry, node),
            Err(_) if mode == LoadMode::Tolerant => {
                warn!(node_id = %id, widget = %node.widget, "keeping unknown widget as placeholder");
                placeholders.push(id.clone());
            }
            Err(_) => {
                return Err(CodecError::UnknownType {
                    node_id: id.clone(),
                    widget: node.widget.clone(),
                })
            }
        }

        node.parent_id = parents.get(id).cloned();
    }

    debug!(root_id = %envelope.root_id, "blob validated");

    let document = Document::from_parts(
        registry,
        content_id,
        envelope.root_id,
        nodes,
        envelope.tags,
    );

    info!(
        content_id,
        nodes = document.len(),
        placeholders = placeholders.len(),
        "document loaded"
    );

    Ok(Loaded {
        document,
        placeholders,
    })
}

fn format_error(defect: TreeDefect) -> CodecError {
    match defect {
        TreeDefect::MissingRoot(root) => CodecError::DanglingReference {
            from: "rootId".to_string(),
            missing: root,
        },
        TreeDefect::MissingChild { parent, child } => CodecError::DanglingReference {
            from: parent,
            missing: child,
        },
        other => CodecError::InconsistentTree(other.to_string()),
    }
}
