//! # Studio
//!
//! Ties edit sessions to a persistence gateway.
//!
//! Opening a document goes through the [`LoadTracker`], so a load that
//! finishes after the user has moved on is dropped instead of replacing
//! what they are looking at. Saving goes through the [`SaveQueue`].

use crate::gateway::{GatewayError, LoadOutcome, PersistenceGateway};
use crate::loader::LoadTracker;
use crate::save_queue::{SaveOutcome, SaveQueue};
use lumo_editor::{CodecError, EditSession, EditorConfig, EditorError, Registry};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Tracker key used by `open_latest`, which has no content id up front.
/// `@` cannot appear in a content id.
const LATEST: &str = "@latest";

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Codec error: {0}")]
    Codec(CodecError),

    #[error("Editor error: {0}")]
    Editor(EditorError),
}

impl From<EditorError> for StudioError {
    fn from(err: EditorError) -> Self {
        match err {
            EditorError::Codec(err) => StudioError::Codec(err),
            other => StudioError::Editor(other),
        }
    }
}

/// Result of opening a document
pub enum Opened {
    /// A stored blob was found and parsed
    Loaded(EditSession),
    /// Nothing stored yet; a fresh document was created
    Empty(EditSession),
    /// The user navigated away before the load finished
    Discarded,
    /// `open_latest` found nothing at all
    NotFound,
}

impl Opened {
    pub fn into_session(self) -> Option<EditSession> {
        match self {
            Opened::Loaded(session) | Opened::Empty(session) => Some(session),
            Opened::Discarded | Opened::NotFound => None,
        }
    }
}

pub struct Studio<G> {
    registry: Arc<Registry>,
    config: EditorConfig,
    gateway: Arc<G>,
    saves: SaveQueue<G>,
    loads: LoadTracker,
}

impl<G: PersistenceGateway + 'static> Studio<G> {
    pub fn new(gateway: Arc<G>, registry: Arc<Registry>, config: EditorConfig) -> Self {
        Self {
            registry,
            config,
            saves: SaveQueue::new(Arc::clone(&gateway)),
            gateway,
            loads: LoadTracker::new(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn saves(&self) -> &SaveQueue<G> {
        &self.saves
    }

    /// Open a document by content id
    pub async fn open(&self, content_id: &str) -> Result<Opened, StudioError> {
        let ticket = self.loads.begin(content_id);
        let outcome = self.gateway.load(content_id).await;

        if !self.loads.is_current(&ticket) {
            debug!(content_id, generation = ticket.generation, "stale load discarded");
            return Ok(Opened::Discarded);
        }

        match outcome? {
            LoadOutcome::Found(stored) => {
                let session = EditSession::load(
                    &stored.blob,
                    Arc::clone(&self.registry),
                    content_id,
                    &self.config,
                )?;
                info!(content_id, saved_at = %stored.saved_at, "opened");
                Ok(Opened::Loaded(session))
            }
            LoadOutcome::NotFound => {
                let session =
                    EditSession::new(Arc::clone(&self.registry), content_id, &self.config)?;
                info!(content_id, "created");
                Ok(Opened::Empty(session))
            }
        }
    }

    /// Open whichever document was saved most recently
    pub async fn open_latest(&self) -> Result<Opened, StudioError> {
        let ticket = self.loads.begin(LATEST);
        let outcome = self.gateway.load_latest().await;

        if !self.loads.is_current(&ticket) {
            debug!(generation = ticket.generation, "stale load discarded");
            return Ok(Opened::Discarded);
        }

        match outcome? {
            LoadOutcome::Found(stored) => {
                let session = EditSession::load(
                    &stored.blob,
                    Arc::clone(&self.registry),
                    stored.content_id.as_str(),
                    &self.config,
                )?;
                info!(content_id = %stored.content_id, "opened latest");
                Ok(Opened::Loaded(session))
            }
            LoadOutcome::NotFound => Ok(Opened::NotFound),
        }
    }

    /// Navigate away from a document; a load still in flight for it will be discarded
    pub fn close(&self, content_id: &str) -> bool {
        self.loads.cancel(content_id)
    }

    /// Save a session through the queue.
    ///
    /// The session is marked clean only once its blob has reached the store.
    /// A failed save leaves the session untouched.
    pub async fn save(&self, session: &mut EditSession) -> Result<SaveOutcome, StudioError> {
        let revision = session.revision();
        let blob = session.save_blob()?;

        let outcome = self.saves.save(session.content_id(), blob).await?;
        if outcome == SaveOutcome::Saved {
            session.mark_saved(revision);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGateway;
    use lumo_editor::Command;
    use std::time::Duration;

    fn studio(gateway: MemoryGateway) -> Studio<MemoryGateway> {
        Studio::new(
            Arc::new(gateway),
            Arc::new(Registry::builtin()),
            EditorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_open_missing_creates_empty_session() {
        let studio = studio(MemoryGateway::new());
        match studio.open("fresh").await.unwrap() {
            Opened::Empty(session) => assert_eq!(session.document().len(), 1),
            _ => panic!("Expected an empty session"),
        }
        assert!(matches!(studio.open_latest().await.unwrap(), Opened::NotFound));
    }

    #[tokio::test]
    async fn test_save_then_reopen() {
        let studio = studio(MemoryGateway::new());
        let mut session = studio.open("lesson").await.unwrap().into_session().unwrap();
        let root = session.document().root_id().to_string();
        session
            .dispatch(Command::AddNode {
                parent_id: root,
                index: 0,
                widget: "quiz".to_string(),
                props: None,
            })
            .unwrap();
        assert!(session.is_dirty());

        assert_eq!(studio.save(&mut session).await.unwrap(), SaveOutcome::Saved);
        assert!(!session.is_dirty());

        match studio.open("lesson").await.unwrap() {
            Opened::Loaded(reopened) => assert_eq!(reopened.document(), session.document()),
            _ => panic!("Expected a loaded session"),
        }
    }

    #[tokio::test]
    async fn test_failed_save_keeps_session_dirty() {
        let gateway = MemoryGateway::new();
        gateway.fail_next_saves(1);
        let studio = studio(gateway);

        let mut session = studio.open("lesson").await.unwrap().into_session().unwrap();
        session
            .dispatch(Command::SetTags {
                tags: vec!["draft".to_string()],
            })
            .unwrap();
        let before = session.document().clone();

        assert!(matches!(
            studio.save(&mut session).await,
            Err(StudioError::Gateway(_))
        ));
        assert!(session.is_dirty());
        assert_eq!(session.document(), &before);
    }

    #[tokio::test]
    async fn test_stale_load_is_discarded() {
        let studio = Arc::new(studio(
            MemoryGateway::new().with_delay(Duration::from_millis(30)),
        ));

        let slow = tokio::spawn({
            let studio = Arc::clone(&studio);
            async move { studio.open("first").await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;

        let current = studio.open("second").await.unwrap();
        assert!(matches!(current, Opened::Empty(_)));
        assert!(matches!(slow.await.unwrap().unwrap(), Opened::Discarded));
    }

    #[tokio::test]
    async fn test_close_discards_in_flight_load() {
        let studio = Arc::new(studio(
            MemoryGateway::new().with_delay(Duration::from_millis(30)),
        ));

        let pending = tokio::spawn({
            let studio = Arc::clone(&studio);
            async move { studio.open("lesson").await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(studio.close("lesson"));
        assert!(matches!(pending.await.unwrap().unwrap(), Opened::Discarded));
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_a_codec_error() {
        let gateway = MemoryGateway::new();
        gateway.insert("broken", "{ nope");
        let studio = studio(gateway);

        assert!(matches!(
            studio.open("broken").await,
            Err(StudioError::Codec(CodecError::MalformedBlob(_)))
        ));
    }
}
