//! Integration tests for editor crate

use lumo_editor::{
    deserialize, serialize, Command, Document, EditSession, EditorConfig, EditorError,
    HistoryError, LoadMode, MutationError, Node, NodeId, Props, Registry,
};
use serde_json::json;
use std::sync::Arc;

fn registry() -> Arc<Registry> {
    Arc::new(Registry::builtin())
}

fn container_root() -> Document {
    Document::with_root(registry(), "scenario", "container").unwrap()
}

fn insert(doc: &mut Document, parent: &str, index: usize, widget: &str) -> NodeId {
    let id = doc.next_id();
    let props = doc.registry().default_props(widget).unwrap();
    doc.insert(parent, index, Node::new(id.clone(), widget, props))
        .unwrap();
    id
}

#[test]
fn test_move_into_text_is_rejected() {
    let mut doc = container_root();
    let root = doc.root_id().to_string();
    let a = insert(&mut doc, &root, 0, "text");
    let b = insert(&mut doc, &root, 1, "image");
    let before = doc.clone();

    let result = doc.move_node(&b, &a, 0);
    assert_eq!(result, Err(MutationError::InvalidParent(a)));
    assert_eq!(doc, before);
}

#[test]
fn test_move_into_container_then_remove() {
    let mut doc = container_root();
    let root = doc.root_id().to_string();
    let a = insert(&mut doc, &root, 0, "container");
    let b = insert(&mut doc, &root, 1, "image");

    doc.move_node(&b, &a, 0).unwrap();
    assert_eq!(doc.root().children, vec![a.clone()]);
    assert_eq!(doc.get(&a).unwrap().children, vec![b.clone()]);
    assert_eq!(doc.get(&b).unwrap().parent_id.as_deref(), Some(a.as_str()));

    let removed = doc.remove(&a).unwrap();
    assert_eq!(
        removed.iter().map(|n| n.id.clone()).collect::<Vec<_>>(),
        vec![a.clone(), b.clone()]
    );
    assert!(doc.root().children.is_empty());
    assert!(!doc.contains(&a));
    assert!(!doc.contains(&b));
    assert_eq!(doc.len(), 1);
}

#[test]
fn test_set_props_then_undo_restores_exact_props() {
    let mut session = EditSession::new(registry(), "lesson", &EditorConfig::default()).unwrap();
    let root = session.document().root_id().to_string();
    session
        .dispatch(Command::AddNode {
            parent_id: root,
            index: 0,
            widget: "text".to_string(),
            props: None,
        })
        .unwrap();
    let a = session.document().root().children[0].clone();
    let before = session.document().get(&a).unwrap().props.clone();

    let mut partial = Props::new();
    partial.insert("text".to_string(), json!("hi"));
    session
        .dispatch(Command::SetProps {
            node_id: a.clone(),
            props: partial,
        })
        .unwrap();
    assert_eq!(
        session.document().get(&a).unwrap().props.get("text"),
        Some(&json!("hi"))
    );

    session.undo().unwrap();
    assert_eq!(session.document().get(&a).unwrap().props, before);
}

#[test]
fn test_remote_insert_of_unknown_widget_is_refused() {
    let mut session = EditSession::new(registry(), "lesson", &EditorConfig::default()).unwrap();
    let root = session.document().root_id().to_string();
    let before = session.document().clone();

    let command: Command = serde_json::from_value(json!({
        "InsertSubtree": {
            "parent_id": root,
            "index": 0,
            "nodes": [{ "id": "x", "type": "bogus-widget" }]
        }
    }))
    .unwrap();

    let result = session.dispatch(command);
    assert!(matches!(
        result,
        Err(EditorError::History(HistoryError::Mutation(
            MutationError::Resolver(_)
        )))
    ));
    assert_eq!(session.document(), &before);
    assert!(!session.history().can_undo());
}

#[test]
fn test_legacy_widget_strict_and_tolerant() {
    let blob = json!({
        "version": 1,
        "rootId": "root",
        "nodes": {
            "root": { "type": "canvas", "children": ["intro", "legacy"] },
            "intro": { "type": "text", "props": { "text": "Intro" } },
            "legacy": { "type": "legacy-widget", "props": { "payload": [1, 2, 3] } }
        },
        "tags": ["archive"]
    })
    .to_string();

    let strict = EditSession::load(&blob, registry(), "old-lesson", &EditorConfig::default());
    assert!(matches!(strict, Err(EditorError::Codec(_))));

    let config = EditorConfig {
        tolerant_load: true,
        ..EditorConfig::default()
    };
    let session = EditSession::load(&blob, registry(), "old-lesson", &config).unwrap();
    assert_eq!(session.placeholders(), ["legacy".to_string()]);

    let rendered = session.render("legacy").unwrap();
    assert!(rendered.opaque);

    // Placeholder survives a save untouched
    let saved = session.save_blob().unwrap();
    let reloaded = deserialize(&saved, registry(), "old-lesson", LoadMode::Tolerant).unwrap();
    assert_eq!(
        reloaded.document.get("legacy").unwrap().props.get("payload"),
        Some(&json!([1, 2, 3]))
    );
}

#[test]
fn test_placeholder_can_be_removed_and_restored() {
    let blob = json!({
        "version": 1,
        "rootId": "root",
        "nodes": {
            "root": { "type": "canvas", "children": ["legacy"] },
            "legacy": { "type": "legacy-widget", "children": ["inner"] },
            "inner": { "type": "text" }
        }
    })
    .to_string();

    let config = EditorConfig {
        tolerant_load: true,
        ..EditorConfig::default()
    };
    let mut session = EditSession::load(&blob, registry(), "old-lesson", &config).unwrap();
    let before = session.document().clone();

    session
        .dispatch(Command::RemoveNode {
            node_id: "legacy".to_string(),
        })
        .unwrap();
    assert_eq!(session.document().len(), 1);

    session.undo().unwrap();
    assert_eq!(session.document(), &before);
}

#[test]
fn test_locked_node_rejects_structure_but_not_props() {
    let mut session = EditSession::new(registry(), "lesson", &EditorConfig::default()).unwrap();
    let root = session.document().root_id().to_string();
    session
        .dispatch(Command::AddNode {
            parent_id: root.clone(),
            index: 0,
            widget: "container".to_string(),
            props: None,
        })
        .unwrap();
    let boxed = session.document().root().children[0].clone();
    session
        .dispatch(Command::SetLocked {
            node_id: boxed.clone(),
            locked: true,
        })
        .unwrap();

    let remove = session.dispatch(Command::RemoveNode {
        node_id: boxed.clone(),
    });
    assert!(matches!(
        remove,
        Err(EditorError::History(_))
    ));

    session
        .edit_property(&boxed, "padding", json!(24))
        .unwrap();
    assert_eq!(
        session.document().get(&boxed).unwrap().props.get("padding"),
        Some(&json!(24))
    );
}

#[test]
fn test_full_session_round_trip() {
    let mut session = EditSession::new(registry(), "lesson", &EditorConfig::default()).unwrap();
    let root = session.document().root_id().to_string();

    session.begin_batch(Some("Scaffold")).unwrap();
    for (index, widget) in ["header", "container", "footer"].iter().enumerate() {
        session
            .dispatch(Command::AddNode {
                parent_id: root.clone(),
                index,
                widget: widget.to_string(),
                props: None,
            })
            .unwrap();
    }
    session.end_batch();

    let body = session.document().root().children[1].clone();
    for widget in ["text", "slider", "quiz", "ai-tutor", "simulation", "video"] {
        session
            .dispatch(Command::AddNode {
                parent_id: body.clone(),
                index: 0,
                widget: widget.to_string(),
                props: None,
            })
            .unwrap();
    }
    session
        .dispatch(Command::SetTags {
            tags: vec!["grade-7".to_string(), "physics".to_string()],
        })
        .unwrap();

    let blob = serialize(session.document()).unwrap();
    let loaded = deserialize(&blob, registry(), "lesson", LoadMode::Strict).unwrap();
    assert_eq!(&loaded.document, session.document());
    assert_eq!(serialize(&loaded.document).unwrap(), blob);
}
