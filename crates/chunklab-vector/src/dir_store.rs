//! JSON-on-disk stores.
//!
//! ```text
//! <root>/
//!   collections/<collection id>.json
//!   files/<file id>.json
//!   experiments.json
//! ```
//!
//! Every write goes to a fresh sibling `.tmp` file that is then renamed over the
//! target, so a crash never leaves a half-written record behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chunklab_core::{Collection, CollectionStore, FileStore, StoreError, UploadedFile};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const COLLECTIONS_DIR: &str = "collections";
const FILES_DIR: &str = "files";

#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(COLLECTIONS_DIR)).await?;
        fs::create_dir_all(root.join(FILES_DIR)).await?;
        debug!(root = %root.display(), "opened store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, kind: &str, id: &str) -> Result<PathBuf, StoreError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(StoreError::Backend(format!("invalid record id '{id}'")));
        }
        Ok(self.root.join(kind).join(format!("{id}.json")))
    }

    async fn read_all<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>, StoreError> {
        let mut out = Vec::new();
        let mut entries = fs::read_dir(self.root.join(kind)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            out.push(serde_json::from_slice(&bytes)?);
        }
        Ok(out)
    }

    async fn remove(&self, kind: &str, id: &str) -> Result<(), StoreError> {
        let path = self.record_path(kind, id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(format!("{kind} {id}"))),
            Err(e) => Err(e.into()),
        }
    }
}

/// Serialize `value` to `path` through a uniquely named temporary sibling, so
/// concurrent writers of one record never share a temp file.
pub(crate) async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
    fs::write(&tmp, &bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        warn!(path = %path.display(), error = %e, "rename failed, removing temp file");
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl CollectionStore for DirStore {
    async fn save(&self, collection: &Collection) -> Result<(), StoreError> {
        let path = self.record_path(COLLECTIONS_DIR, &collection.id)?;
        write_json_atomic(&path, collection).await?;
        debug!(id = %collection.id, chunks = collection.chunk_count, "saved collection");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Collection>, StoreError> {
        let mut all: Vec<Collection> = self.read_all(COLLECTIONS_DIR).await?;
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.remove(COLLECTIONS_DIR, id).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let dir = self.root.join(COLLECTIONS_DIR);
        fs::remove_dir_all(&dir).await?;
        fs::create_dir_all(&dir).await?;
        Ok(())
    }
}

#[async_trait]
impl FileStore for DirStore {
    async fn save(&self, file: &UploadedFile) -> Result<(), StoreError> {
        let path = self.record_path(FILES_DIR, &file.id)?;
        write_json_atomic(&path, file).await
    }

    async fn list_all(&self) -> Result<Vec<UploadedFile>, StoreError> {
        let mut all: Vec<UploadedFile> = self.read_all(FILES_DIR).await?;
        all.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.name.cmp(&b.name)));
        Ok(all)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.remove(FILES_DIR, id).await
    }
}
