use chunklab_core::config::{EmbeddingBackend, EmbeddingSettings};
use chunklab_embed::get_default_embedder;

#[tokio::test]
async fn hash_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { dimension: 128, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.model_id(), "hash:d128");

    let texts = vec!["hello world".to_string(), "hello world".to_string(), "other text".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    assert_eq!(embs.len(), 3);
    assert!(embs.iter().all(|v| v.len() == 128));

    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    assert_eq!(embs[0], embs[1]);
}

#[tokio::test]
async fn query_embedding_matches_batch_output() {
    let embedder = get_default_embedder(&EmbeddingSettings::default()).expect("embedder");
    let q = embedder.embed_query("chunking strategies").await.expect("query");
    let batch = embedder.embed_batch(&["chunking strategies".to_string()]).await.expect("batch");
    assert_eq!(q, batch[0]);
    assert_eq!(q.len(), 384);
}

#[cfg(not(feature = "candle"))]
#[test]
fn bge_without_candle_is_a_model_load_error() {
    let settings = EmbeddingSettings { backend: EmbeddingBackend::BgeM3, ..EmbeddingSettings::default() };
    let err = get_default_embedder(&settings).err().expect("should fail");
    assert_eq!(err.kind, chunklab_core::EmbedErrorKind::ModelLoad);
}
