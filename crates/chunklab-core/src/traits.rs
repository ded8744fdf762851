use async_trait::async_trait;

use crate::error::{EmbedError, StoreError};
use crate::types::{Collection, Embedding, Experiment, UploadedFile};

/// Embedding collaborator.
///
/// `embed_batch` is one-to-one and order-preserving; `embed_query` must return
/// a vector comparable by cosine similarity with batch output.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier recorded on every collection built with this embedder.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbedError>;

    async fn embed_query(&self, text: &str) -> Result<Embedding, EmbedError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| EmbedError::shape("embedder returned no vector for the query"))
    }
}

/// Durable key-value storage of collections. Saving is atomic per collection.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn save(&self, collection: &Collection) -> Result<(), StoreError>;
    async fn list_all(&self) -> Result<Vec<Collection>, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    async fn clear(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn save(&self, file: &UploadedFile) -> Result<(), StoreError>;
    async fn list_all(&self) -> Result<Vec<UploadedFile>, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Append-only history of processing batches, oldest first.
#[async_trait]
pub trait ExperimentLog: Send + Sync {
    async fn load(&self) -> Result<Vec<Experiment>, StoreError>;
    async fn append(&self, experiment: &Experiment) -> Result<(), StoreError>;
}
