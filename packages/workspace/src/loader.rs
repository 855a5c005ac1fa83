use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifies one load request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub content_id: String,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct TrackerState {
    generation: u64,
    active: Option<LoadTicket>,
}

/// Stale-response guard for document loads.
///
/// Only the most recent load is honored: starting another load, or
/// cancelling the current one, turns any older ticket stale.
#[derive(Debug, Default)]
pub struct LoadTracker {
    state: Mutex<TrackerState>,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a load for `content_id`, making it the active one
    pub fn begin(&self, content_id: &str) -> LoadTicket {
        let mut state = self.state();
        state.generation += 1;
        let ticket = LoadTicket {
            content_id: content_id.to_string(),
            generation: state.generation,
        };
        state.active = Some(ticket.clone());
        ticket
    }

    /// Navigate away from `content_id`. Returns whether it was active.
    pub fn cancel(&self, content_id: &str) -> bool {
        let mut state = self.state();
        let active = state
            .active
            .as_ref()
            .map(|ticket| ticket.content_id == content_id)
            .unwrap_or(false);
        if active {
            state.active = None;
        }
        active
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.state().active.as_ref() == Some(ticket)
    }

    /// Content id of the load currently honored, if any
    pub fn active(&self) -> Option<String> {
        self.state().active.as_ref().map(|t| t.content_id.clone())
    }
}
