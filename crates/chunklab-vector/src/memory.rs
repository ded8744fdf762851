//! In-memory stores for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chunklab_core::{Collection, CollectionStore, Experiment, ExperimentLog, FileStore, StoreError, UploadedFile};
use tokio::sync::RwLock;
use tracing::debug;

/// Keeps files, collections and the experiment history in memory.
///
/// Clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    files: Arc<RwLock<HashMap<String, UploadedFile>>>,
    experiments: Arc<RwLock<Vec<Experiment>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn save(&self, collection: &Collection) -> Result<(), StoreError> {
        self.collections.write().await.insert(collection.id.clone(), collection.clone());
        debug!(id = %collection.id, chunks = collection.chunk_count, "saved collection");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Collection>, StoreError> {
        let mut all: Vec<Collection> = self.collections.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.collections
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("collection {id}")))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.collections.write().await.clear();
        Ok(())
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn save(&self, file: &UploadedFile) -> Result<(), StoreError> {
        self.files.write().await.insert(file.id.clone(), file.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<UploadedFile>, StoreError> {
        let mut all: Vec<UploadedFile> = self.files.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.name.cmp(&b.name)));
        Ok(all)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.files
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("file {id}")))
    }
}

#[async_trait]
impl ExperimentLog for MemoryStore {
    async fn load(&self) -> Result<Vec<Experiment>, StoreError> {
        Ok(self.experiments.read().await.clone())
    }

    async fn append(&self, experiment: &Experiment) -> Result<(), StoreError> {
        self.experiments.write().await.push(experiment.clone());
        Ok(())
    }
}
