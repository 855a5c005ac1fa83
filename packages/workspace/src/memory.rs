use crate::gateway::{GatewayError, LoadOutcome, PersistenceGateway, StoredBlob};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct MemoryState {
    /// Every revision saved per content id, oldest first
    revisions: HashMap<String, Vec<StoredBlob>>,
    /// Content id of the most recent save
    latest: Option<String>,
}

/// Gateway that keeps every saved revision in memory.
///
/// Also records how many saves ran at once and can be told to slow down or
/// fail, which is what the save queue tests need.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    delay: Option<Duration>,
    failures: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every load and save take at least `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next `count` saves with `Unavailable`
    pub fn fail_next_saves(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Store a blob directly, bypassing delays and failures
    pub fn insert(&self, content_id: &str, blob: impl Into<String>) {
        self.state().record(content_id, blob.into());
    }

    /// All revisions stored for `content_id`, oldest first
    pub fn revisions(&self, content_id: &str) -> Vec<String> {
        self.state()
            .revisions
            .get(content_id)
            .map(|list| list.iter().map(|s| s.blob.clone()).collect())
            .unwrap_or_default()
    }

    /// Highest number of saves that were running at the same time
    pub fn max_concurrent_saves(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl MemoryState {
    fn record(&mut self, content_id: &str, blob: String) {
        self.revisions
            .entry(content_id.to_string())
            .or_default()
            .push(StoredBlob {
                content_id: content_id.to_string(),
                blob,
                saved_at: Utc::now(),
            });
        self.latest = Some(content_id.to_string());
    }

    fn latest_of(&self, content_id: &str) -> LoadOutcome {
        match self.revisions.get(content_id).and_then(|list| list.last()) {
            Some(stored) => LoadOutcome::Found(stored.clone()),
            None => LoadOutcome::NotFound,
        }
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn load(&self, content_id: &str) -> Result<LoadOutcome, GatewayError> {
        self.pause().await;
        Ok(self.state().latest_of(content_id))
    }

    async fn load_latest(&self) -> Result<LoadOutcome, GatewayError> {
        self.pause().await;
        let state = self.state();
        Ok(match &state.latest {
            Some(content_id) => state.latest_of(content_id),
            None => LoadOutcome::NotFound,
        })
    }

    async fn save(&self, content_id: &str, blob: String) -> Result<(), GatewayError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        self.pause().await;

        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let result = if failed {
            Err(GatewayError::Unavailable("injected failure".to_string()))
        } else {
            self.state().record(content_id, blob);
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
