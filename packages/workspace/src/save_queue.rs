//! # Save Queue
//!
//! Serializes saves per content id.
//!
//! ## Rules
//!
//! - At most one gateway save runs for a content id at any time
//! - While one is running, newer requests wait in a single slot; a request
//!   arriving while the slot is taken replaces it (latest blob wins)
//! - The replaced request resolves immediately as [`SaveOutcome::Superseded`]
//! - Failures are reported to the caller and never retried
//!
//! ```text
//!   save(a, v1) ──▶ running v1
//!   save(a, v2) ──▶ pending v2
//!   save(a, v3) ──▶ pending v3      (v2 → Superseded)
//!   v1 done     ──▶ running v3
//!   v3 done     ──▶ slot removed
//! ```

use crate::gateway::{GatewayError, PersistenceGateway};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The blob reached the store
    Saved,
    /// A newer blob for the same content id was queued before this one ran
    Superseded,
}

type Reply = oneshot::Sender<Result<SaveOutcome, GatewayError>>;

struct Pending {
    blob: String,
    reply: Reply,
}

#[derive(Default)]
struct Slot {
    pending: Option<Pending>,
}

type Slots = Arc<Mutex<HashMap<String, Slot>>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<String, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SaveQueue<G> {
    gateway: Arc<G>,
    /// A content id has an entry exactly while its drain task is running
    slots: Slots,
}

impl<G> Clone for SaveQueue<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<G: PersistenceGateway + 'static> SaveQueue<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Queue a save and wait for its outcome
    pub async fn save(&self, content_id: &str, blob: String) -> Result<SaveOutcome, GatewayError> {
        let (reply, outcome) = oneshot::channel();
        let pending = Pending { blob, reply };

        let start = {
            let mut slots = lock(&self.slots);
            match slots.get_mut(content_id) {
                Some(slot) => {
                    if let Some(replaced) = slot.pending.replace(pending) {
                        debug!(content_id, "queued save superseded");
                        let _ = replaced.reply.send(Ok(SaveOutcome::Superseded));
                    }
                    None
                }
                None => {
                    slots.insert(content_id.to_string(), Slot::default());
                    Some(pending)
                }
            }
        };

        if let Some(first) = start {
            tokio::spawn(drain(
                Arc::clone(&self.gateway),
                Arc::clone(&self.slots),
                content_id.to_string(),
                first,
            ));
        }

        outcome
            .await
            .map_err(|_| GatewayError::Unavailable("save task ended without a result".to_string()))?
    }

    /// Whether a save is currently running for `content_id`
    pub fn is_saving(&self, content_id: &str) -> bool {
        lock(&self.slots).contains_key(content_id)
    }
}

async fn drain<G: PersistenceGateway>(
    gateway: Arc<G>,
    slots: Slots,
    content_id: String,
    first: Pending,
) {
    let mut next = Some(first);

    while let Some(Pending { blob, reply }) = next {
        let result = gateway.save(&content_id, blob).await;
        match &result {
            Ok(()) => debug!(content_id = %content_id, "saved"),
            Err(err) => warn!(content_id = %content_id, error = %err, "save failed"),
        }
        let _ = reply.send(result.map(|()| SaveOutcome::Saved));

        next = {
            let mut guard = lock(&slots);
            let pending = guard
                .get_mut(&content_id)
                .and_then(|slot| slot.pending.take());
            if pending.is_none() {
                guard.remove(&content_id);
            }
            pending
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGateway;
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_save() {
        let gateway = Arc::new(MemoryGateway::new());
        let queue = SaveQueue::new(Arc::clone(&gateway));

        let outcome = queue.save("a", "v1".to_string()).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(gateway.revisions("a"), vec!["v1"]);
        assert!(!queue.is_saving("a"));
    }

    #[tokio::test]
    async fn test_latest_blob_wins() {
        let gateway = Arc::new(MemoryGateway::new().with_delay(Duration::from_millis(30)));
        let queue = SaveQueue::new(Arc::clone(&gateway));

        let first = tokio::spawn({
            let queue = queue.clone();
            async move { queue.save("a", "v1".to_string()).await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;

        let second = tokio::spawn({
            let queue = queue.clone();
            async move { queue.save("a", "v2".to_string()).await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        let third = queue.save("a", "v3".to_string()).await.unwrap();

        assert_eq!(first.await.unwrap().unwrap(), SaveOutcome::Saved);
        assert_eq!(second.await.unwrap().unwrap(), SaveOutcome::Superseded);
        assert_eq!(third, SaveOutcome::Saved);

        assert_eq!(gateway.revisions("a"), vec!["v1", "v3"]);
        assert_eq!(gateway.max_concurrent_saves(), 1);
    }

    #[tokio::test]
    async fn test_failure_reaches_caller() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.fail_next_saves(1);
        let queue = SaveQueue::new(Arc::clone(&gateway));

        assert!(matches!(
            queue.save("a", "v1".to_string()).await,
            Err(GatewayError::Unavailable(_))
        ));
        assert_eq!(
            queue.save("a", "v2".to_string()).await.unwrap(),
            SaveOutcome::Saved
        );
    }
}
