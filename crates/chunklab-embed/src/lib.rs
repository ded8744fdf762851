//! chunklab-embed
//!
//! Embedding backends behind the [`Embedder`] trait. The hash backend is always
//! available; BGE-M3 requires the `candle` feature (and `metal` for Apple GPUs).

use std::sync::Arc;

use chunklab_core::config::{EmbeddingBackend, EmbeddingSettings};
use chunklab_core::{EmbedError, Embedder};
use tracing::info;

mod hash;

#[cfg(feature = "candle")]
mod bge;
#[cfg(feature = "candle")]
mod device;
#[cfg(feature = "candle")]
mod pool;
#[cfg(feature = "candle")]
mod tokenize;

pub use hash::HashEmbedder;

#[cfg(feature = "candle")]
pub use bge::BgeM3Embedder;
#[cfg(feature = "candle")]
pub use pool::masked_mean_l2;

/// Build the embedder selected by `settings.backend`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>, EmbedError> {
    match settings.backend {
        EmbeddingBackend::Hash => {
            info!(dim = settings.dimension, "using hash embedder");
            Ok(Arc::new(HashEmbedder::new(settings.dimension)))
        }
        #[cfg(feature = "candle")]
        EmbeddingBackend::BgeM3 => Ok(Arc::new(BgeM3Embedder::new(settings)?)),
        #[cfg(not(feature = "candle"))]
        EmbeddingBackend::BgeM3 => Err(EmbedError::model_load(
            "BGE-M3 backend requested but chunklab-embed was built without the `candle` feature",
        )),
    }
}
