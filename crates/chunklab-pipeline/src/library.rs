//! Application state: files, collections and experiment history.
//!
//! Everything is loaded once by [`Library::open`]. Mutations hit the backing
//! store first and only touch the in-memory view after the store call
//! succeeded, so a failed delete leaves the item visible.

use std::sync::Arc;

use chunklab_core::{
    Collection, CollectionStore, Embedder, ErrorInfo, Experiment, ExperimentLog, FileStore, StoreError, UploadedFile,
};
use chunklab_hybrid::{RetrievalEngine, SearchError, SearchOutcome, SearchRequest};
use futures::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::board::TaskUpdate;
use crate::builder::{BatchOutcome, CancelFlag, CollectionBuilder, PipelineError, ProcessRequest};

#[derive(Debug, Error)]
#[error("{message}")]
pub struct LibraryError {
    pub message: String,
    #[source]
    pub source: StoreError,
}

impl LibraryError {
    fn new(message: impl Into<String>, source: StoreError) -> Self {
        Self { message: message.into(), source }
    }

    pub fn info(&self) -> ErrorInfo {
        ErrorInfo::new(self.message.clone(), self.source.to_string())
    }
}

/// Backing stores shared by the library.
#[derive(Clone)]
pub struct Stores {
    pub files: Arc<dyn FileStore>,
    pub collections: Arc<dyn CollectionStore>,
    pub experiments: Arc<dyn ExperimentLog>,
}

pub struct Library {
    stores: Stores,
    embedder: Arc<dyn Embedder>,
    files: Vec<UploadedFile>,
    collections: Vec<Collection>,
    experiments: Vec<Experiment>,
}

impl Library {
    pub async fn open(stores: Stores, embedder: Arc<dyn Embedder>) -> Result<Self, LibraryError> {
        let files = stores.files.list_all().await.map_err(|e| LibraryError::new("Could not load files.", e))?;
        let collections = stores
            .collections
            .list_all()
            .await
            .map_err(|e| LibraryError::new("Could not load collections.", e))?;
        let experiments =
            stores.experiments.load().await.map_err(|e| LibraryError::new("Could not load experiment history.", e))?;
        info!(
            files = files.len(),
            collections = collections.len(),
            experiments = experiments.len(),
            "library loaded"
        );
        Ok(Self { stores, embedder, files, collections, experiments })
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Oldest first.
    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Persist `new` files. Files saved before a failure stay visible; the
    /// first failure is returned. Re-adding a file with the same id replaces it,
    /// and repeated ids within one batch keep the last file.
    pub async fn add_files(&mut self, new: Vec<UploadedFile>) -> Result<usize, LibraryError> {
        let new = last_per_id(new);
        let store = &self.stores.files;
        let results = join_all(new.iter().map(|f| store.save(f))).await;
        let mut first_err = None;
        let mut added = 0;
        for (file, result) in new.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    self.files.retain(|f| f.id != file.id);
                    self.files.push(file);
                    added += 1;
                }
                Err(e) => {
                    warn!(file = %file.name, error = %e, "failed to save file");
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(LibraryError::new("Could not save one or more files.", e)),
            None => Ok(added),
        }
    }

    pub async fn remove_file(&mut self, id: &str) -> Result<(), LibraryError> {
        self.stores.files.delete(id).await.map_err(|e| LibraryError::new("Could not delete the file.", e))?;
        self.files.retain(|f| f.id != id);
        Ok(())
    }

    /// Delete every file; files whose delete failed stay listed.
    pub async fn clear_files(&mut self) -> Result<(), LibraryError> {
        let store = &self.stores.files;
        let results = join_all(self.files.iter().map(|f| store.delete(&f.id))).await;
        let mut first_err = None;
        let mut kept = Vec::new();
        for (file, result) in std::mem::take(&mut self.files).into_iter().zip(results) {
            if let Err(e) = result {
                warn!(file = %file.name, error = %e, "failed to delete file");
                first_err.get_or_insert(e);
                kept.push(file);
            }
        }
        self.files = kept;
        match first_err {
            Some(e) => Err(LibraryError::new("Could not delete one or more files.", e)),
            None => Ok(()),
        }
    }

    pub async fn delete_collection(&mut self, id: &str) -> Result<(), LibraryError> {
        self.stores
            .collections
            .delete(id)
            .await
            .map_err(|e| LibraryError::new("Could not delete the collection.", e))?;
        self.collections.retain(|c| c.id != id);
        Ok(())
    }

    pub async fn clear_collections(&mut self) -> Result<(), LibraryError> {
        self.stores.collections.clear().await.map_err(|e| LibraryError::new("Could not clear collections.", e))?;
        self.collections.clear();
        Ok(())
    }

    /// Run a processing batch over the library's files.
    ///
    /// Collections persisted by the batch become visible even when the batch
    /// ends with a critical error.
    pub async fn process(
        &mut self,
        request: &ProcessRequest,
        events: Option<UnboundedSender<TaskUpdate>>,
        cancel: CancelFlag,
    ) -> Result<BatchOutcome, PipelineError> {
        let mut builder = CollectionBuilder::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.stores.collections),
            Arc::clone(&self.stores.experiments),
        )
        .with_cancel(cancel);
        if let Some(tx) = events {
            builder = builder.with_events(tx);
        }

        match builder.run(&self.files, request).await {
            Ok(outcome) => {
                self.collections.extend(outcome.collections.iter().cloned());
                if let Some(exp) = &outcome.experiment {
                    self.experiments.push(exp.clone());
                }
                Ok(outcome)
            }
            Err(PipelineError::Critical { info, collections }) => {
                self.collections.extend(collections.iter().cloned());
                Err(PipelineError::Critical { info, collections })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
        RetrievalEngine::new(Arc::clone(&self.embedder)).search(request, &self.collections).await
    }
}

/// Collapse repeated ids in one upload batch, the later file winning. Saves
/// run concurrently and must never target the same record twice.
fn last_per_id(files: Vec<UploadedFile>) -> Vec<UploadedFile> {
    let mut out: Vec<UploadedFile> = Vec::with_capacity(files.len());
    for file in files {
        match out.iter_mut().find(|f| f.id == file.id) {
            Some(slot) => *slot = file,
            None => out.push(file),
        }
    }
    out
}
