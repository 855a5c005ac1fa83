/// Integration tests for the persistence boundary
/// Tests session → save queue → gateway → session flow
use lumo_editor::{Command, EditorConfig, Registry};
use lumo_workspace::{
    DirectoryGateway, MemoryGateway, Opened, PersistenceGateway, SaveOutcome, SaveQueue, Studio,
};
use std::sync::Arc;
use std::time::Duration;

fn registry() -> Arc<Registry> {
    Arc::new(Registry::builtin())
}

#[tokio::test]
async fn test_burst_of_saves_never_overlaps() {
    let gateway = Arc::new(MemoryGateway::new().with_delay(Duration::from_millis(10)));
    let queue = SaveQueue::new(Arc::clone(&gateway));

    let mut handles = Vec::new();
    for i in 0..20 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            queue.save("lesson", format!("v{}", i)).await
        }));
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let mut saved = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            SaveOutcome::Saved => saved += 1,
            SaveOutcome::Superseded => {}
        }
    }

    assert_eq!(gateway.max_concurrent_saves(), 1);
    assert_eq!(gateway.revisions("lesson").len(), saved);
    let latest = gateway.load("lesson").await.unwrap().found().unwrap();
    assert_eq!(latest.blob, "v19");
}

#[tokio::test]
async fn test_saves_for_different_ids_are_independent() {
    let gateway = Arc::new(MemoryGateway::new().with_delay(Duration::from_millis(20)));
    let queue = SaveQueue::new(Arc::clone(&gateway));

    let (a, b) = tokio::join!(
        queue.save("a", "a1".to_string()),
        queue.save("b", "b1".to_string())
    );
    assert_eq!(a.unwrap(), SaveOutcome::Saved);
    assert_eq!(b.unwrap(), SaveOutcome::Saved);
    assert_eq!(gateway.max_concurrent_saves(), 2);
}

#[tokio::test]
async fn test_directory_studio_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = Arc::new(DirectoryGateway::new(dir.path()));
    let studio = Studio::new(Arc::clone(&gateway), registry(), EditorConfig::default());

    let mut session = match studio.open("intro-physics").await.unwrap() {
        Opened::Empty(session) => session,
        _ => panic!("Expected an empty session"),
    };

    let root = session.document().root_id().to_string();
    session.begin_batch(Some("Layout")).unwrap();
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

    assert_eq!(studio.save(&mut session).await.unwrap(), SaveOutcome::Saved);

    // Stored blob is valid JSON with the envelope fields
    let raw = std::fs::read_to_string(dir.path().join("intro-physics.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["version"], 1);
    assert_eq!(value["nodes"].as_object().unwrap().len(), 4);

    let reopened = studio.open_latest().await.unwrap().into_session().unwrap();
    assert_eq!(reopened.content_id(), "intro-physics");
    assert_eq!(reopened.document(), session.document());
    assert!(!reopened.history().can_undo());
}

#[tokio::test]
async fn test_tolerant_studio_keeps_unknown_widgets() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.insert(
        "legacy",
        r#"{"version":1,"rootId":"r","nodes":{"r":{"type":"canvas","children":["w"]},"w":{"type":"legacy-widget"}}}"#,
    );

    let strict = Studio::new(Arc::clone(&gateway), registry(), EditorConfig::default());
    assert!(strict.open("legacy").await.is_err());

    let tolerant = Studio::new(
        Arc::clone(&gateway),
        registry(),
        EditorConfig {
            tolerant_load: true,
            ..EditorConfig::default()
        },
    );
    let session = tolerant.open("legacy").await.unwrap().into_session().unwrap();
    assert_eq!(session.placeholders(), ["w".to_string()]);
}
