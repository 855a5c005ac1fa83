use crate::gateway::{
    validate_content_id, GatewayError, LoadOutcome, PersistenceGateway, StoredBlob,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSION: &str = "json";

/// Gateway that stores one `<content-id>.json` file per document under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryGateway {
    root: PathBuf,
}

impl DirectoryGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, content_id: &str) -> Result<PathBuf, GatewayError> {
        validate_content_id(content_id)?;
        Ok(self.root.join(format!("{}.{}", content_id, EXTENSION)))
    }

    async fn read(&self, content_id: &str, path: &Path) -> Result<LoadOutcome, GatewayError> {
        let blob = match tokio::fs::read_to_string(path).await {
            Ok(blob) => blob,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LoadOutcome::NotFound),
            Err(err) => return Err(err.into()),
        };
        let modified = tokio::fs::metadata(path).await?.modified()?;

        Ok(LoadOutcome::Found(StoredBlob {
            content_id: content_id.to_string(),
            blob,
            saved_at: DateTime::<Utc>::from(modified),
        }))
    }
}

#[async_trait]
impl PersistenceGateway for DirectoryGateway {
    async fn load(&self, content_id: &str) -> Result<LoadOutcome, GatewayError> {
        let path = self.path_for(content_id)?;
        self.read(content_id, &path).await
    }

    async fn load_latest(&self) -> Result<LoadOutcome, GatewayError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LoadOutcome::NotFound),
            Err(err) => return Err(err.into()),
        };

        let mut latest: Option<(std::time::SystemTime, String, PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(content_id) = path.file_stem().and_then(|s| s.to_str()).map(String::from)
            else {
                continue;
            };
            if validate_content_id(&content_id).is_err() {
                continue;
            }

            let modified = entry.metadata().await?.modified()?;
            let newer = latest
                .as_ref()
                .map(|(time, id, _)| (modified, &content_id) > (*time, id))
                .unwrap_or(true);
            if newer {
                latest = Some((modified, content_id, path));
            }
        }

        match latest {
            Some((_, content_id, path)) => self.read(&content_id, &path).await,
            None => Ok(LoadOutcome::NotFound),
        }
    }

    async fn save(&self, content_id: &str, blob: String) -> Result<(), GatewayError> {
        let path = self.path_for(content_id)?;
        tokio::fs::create_dir_all(&self.root).await?;

        // Write next to the target and rename so readers never see half a blob
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, blob.as_bytes()).await?;
        tokio::fs::rename(&staging, &path).await?;

        debug!(content_id, path = %path.display(), bytes = blob.len(), "blob written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let gateway = DirectoryGateway::new(dir.path().join("store"));

        assert_eq!(gateway.load("lesson-1").await.unwrap(), LoadOutcome::NotFound);
        assert_eq!(gateway.load_latest().await.unwrap(), LoadOutcome::NotFound);

        gateway.save("lesson-1", "{}".to_string()).await.unwrap();
        let stored = gateway.load("lesson-1").await.unwrap().found().unwrap();
        assert_eq!(stored.content_id, "lesson-1");
        assert_eq!(stored.blob, "{}");
        assert!(dir.path().join("store/lesson-1.json").exists());
        assert!(!dir.path().join("store/lesson-1.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rejects_unsafe_ids() {
        let dir = TempDir::new().unwrap();
        let gateway = DirectoryGateway::new(dir.path());

        assert!(matches!(
            gateway.save("../escape", "{}".to_string()).await,
            Err(GatewayError::InvalidContentId(_))
        ));
        assert!(matches!(
            gateway.load("a/b").await,
            Err(GatewayError::InvalidContentId(_))
        ));
    }

    #[tokio::test]
    async fn test_load_latest_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        let gateway = DirectoryGateway::new(dir.path());

        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        gateway.save("only", "{\"x\":1}".to_string()).await.unwrap();

        let latest = gateway.load_latest().await.unwrap().found().unwrap();
        assert_eq!(latest.content_id, "only");
    }
}
