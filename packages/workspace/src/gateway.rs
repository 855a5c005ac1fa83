//! The persistence boundary.
//!
//! The engine never talks to a database directly. Hosts hand it something
//! that implements [`PersistenceGateway`]; the in-memory and directory
//! gateways in this crate cover tests and the CLI.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A persisted blob as returned by a gateway
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub content_id: String,
    pub blob: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Found(StoredBlob),
    NotFound,
}

impl LoadOutcome {
    pub fn found(self) -> Option<StoredBlob> {
        match self {
            LoadOutcome::Found(stored) => Some(stored),
            LoadOutcome::NotFound => None,
        }
    }
}

/// Gateway failures. `Clone` so a single failure can be reported to every
/// caller waiting on the same save.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Invalid content id: {0:?}")]
    InvalidContentId(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err.to_string())
    }
}

/// Load/save contract the studio relies on
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Latest blob stored under `content_id`
    async fn load(&self, content_id: &str) -> Result<LoadOutcome, GatewayError>;

    /// Most recently saved blob across all content ids
    async fn load_latest(&self) -> Result<LoadOutcome, GatewayError>;

    async fn save(&self, content_id: &str, blob: String) -> Result<(), GatewayError>;
}

/// Content ids are restricted to `[A-Za-z0-9_-]` so they are safe as file names
pub fn validate_content_id(content_id: &str) -> Result<(), GatewayError> {
    let valid = !content_id.is_empty()
        && content_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(GatewayError::InvalidContentId(content_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content_id() {
        assert!(validate_content_id("lesson-42_b").is_ok());
        assert!(validate_content_id("").is_err());
        assert!(validate_content_id("../etc/passwd").is_err());
        assert!(validate_content_id("a b").is_err());
        assert!(validate_content_id("leçon").is_err());
    }
}
