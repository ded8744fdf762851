use std::path::PathBuf;

use async_trait::async_trait;
use chunklab_core::{Experiment, ExperimentLog, StoreError};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::dir_store::write_json_atomic;

/// Experiment history kept as a single JSON array, oldest first.
///
/// Appends rewrite the whole file; the mutex serializes concurrent appends
/// from the same process.
pub struct JsonExperimentLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonExperimentLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    async fn read(&self) -> Result<Vec<Experiment>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ExperimentLog for JsonExperimentLog {
    async fn load(&self) -> Result<Vec<Experiment>, StoreError> {
        self.read().await
    }

    async fn append(&self, experiment: &Experiment) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut all = self.read().await?;
        all.push(experiment.clone());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        write_json_atomic(&self.path, &all).await?;
        debug!(id = %experiment.id, total = all.len(), "appended experiment");
        Ok(())
    }
}
