use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use chunklab_core::config::EmbeddingSettings;
use chunklab_core::{EmbedError, Embedder, Embedding};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

const MAX_LEN: usize = 256;
const BGE_M3_DIM: usize = 1024;

struct Model {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// BGE-M3 dense embeddings computed locally with candle.
pub struct BgeM3Embedder {
    inner: Arc<Model>,
    id: String,
}

impl BgeM3Embedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, EmbedError> {
        let device = select_device(settings.device)?;
        let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
        info!(dir = %model_dir.display(), "loading BGE-M3");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            EmbedError::model_load(format!("failed to load tokenizer from {}", tokenizer_path.display()))
                .with_detail(e.to_string())
        })?;

        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = std::fs::read_to_string(&config_path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
            .map_err(|e| {
                EmbedError::model_load(format!("failed to read {}", config_path.display())).with_detail(e)
            })?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let load_err = |e: candle_core::Error| {
            EmbedError::model_load(format!("failed to load weights from {}", weights_path.display()))
                .with_detail(e.to_string())
        };
        let weights: HashMap<String, Tensor> =
            candle_core::pickle::read_all(&weights_path).map_err(load_err)?.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(load_err)?;
        info!("BGE-M3 loaded");

        Ok(Self {
            inner: Arc::new(Model { model, tokenizer, device }),
            id: format!("bge-m3:d{BGE_M3_DIM}"),
        })
    }
}

impl Model {
    fn embed_text(&self, text: &str) -> Result<Embedding, EmbedError> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let infer = |e: candle_core::Error| EmbedError::inference("forward pass failed").with_detail(e.to_string());
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::U32, &self.device).map_err(infer)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)
            .map_err(infer)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask).map_err(infer)?;
        let v: Vec<f32> = pooled
            .to_device(&Device::Cpu)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1())
            .map_err(infer)?;
        if v.len() != BGE_M3_DIM {
            return Err(EmbedError::shape(format!("expected {BGE_M3_DIM} dims, got {}", v.len())));
        }
        let elapsed = start.elapsed().as_millis();
        if elapsed > 100 {
            warn!(elapsed_ms = elapsed as u64, "slow embedding");
        }
        Ok(v)
    }
}

#[async_trait]
impl Embedder for BgeM3Embedder {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        BGE_M3_DIM
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbedError> {
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        debug!(count = texts.len(), "embedding batch");
        tokio::task::spawn_blocking(move || texts.iter().map(|t| inner.embed_text(t)).collect())
            .await
            .map_err(|e| EmbedError::inference("embedding worker panicked").with_detail(e.to_string()))?
    }
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf, EmbedError> {
    let candidates = configured
        .map(chunklab_core::config::expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain([Path::new("../models/bge-m3").to_path_buf(), Path::new("models/bge-m3").to_path_buf()]);
    for dir in candidates {
        if dir.exists() {
            return Ok(dir);
        }
    }
    Err(EmbedError::model_load("could not locate the BGE-M3 model directory"))
}
