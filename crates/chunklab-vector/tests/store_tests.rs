use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use chunklab_core::{
    Chunk, ChunkMethod, ChunkPlan, Collection, CollectionStore, Experiment, ExperimentLog, FileStore, FileType,
    StoreError, UploadedFile,
};
use chunklab_vector::{DirStore, JsonExperimentLog, MemoryStore, EXPERIMENTS_FILE};
use tempfile::TempDir;

fn collection(id: &str, age_secs: i64) -> Collection {
    let chunks = vec![Chunk {
        id: format!("{id}:0"),
        text: "hello".into(),
        index: 0,
        source_file_id: "f1".into(),
        source_file_name: "a.txt".into(),
        chunk_method: ChunkMethod::Fixed,
        metadata: BTreeMap::from([("char_count".to_string(), "5".to_string())]),
    }];
    Collection {
        id: id.into(),
        name: format!("a.txt_fixed_{age_secs}"),
        chunk_method: ChunkMethod::Fixed,
        source_file_id: "f1".into(),
        source_file_name: "a.txt".into(),
        chunk_count: 1,
        params: ChunkMethod::Fixed.default_params(),
        created_at: Utc::now() - Duration::seconds(age_secs),
        chunks,
        vectors: vec![vec![1.0, 0.0]],
        embedding_model: "hash:d2".into(),
    }
}

fn file(id: &str, name: &str) -> UploadedFile {
    UploadedFile {
        id: id.into(),
        name: name.into(),
        file_type: FileType::Text,
        size: 3,
        content: "abc".into(),
        uploaded_at: Utc::now(),
    }
}

fn experiment(id: &str) -> Experiment {
    Experiment {
        id: id.into(),
        timestamp: Utc::now(),
        files_processed: vec!["a.txt".into()],
        chunk_methods: vec![ChunkMethod::Fixed],
        params: ChunkPlan::new().with(ChunkMethod::Fixed.default_params()),
        chunk_counts: BTreeMap::from([(ChunkMethod::Fixed, 4)]),
        processing_time_ms: 12,
    }
}

#[tokio::test]
async fn dir_store_round_trips_collections_oldest_first() {
    let tmp = TempDir::new().unwrap();
    let store = DirStore::open(tmp.path()).await.unwrap();

    CollectionStore::save(&store, &collection("col_new", 0)).await.unwrap();
    CollectionStore::save(&store, &collection("col_old", 60)).await.unwrap();

    let all = CollectionStore::list_all(&store).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["col_old", "col_new"]);
    assert!(all.iter().all(Collection::is_consistent));

    // a fresh handle on the same directory sees the same data
    let reopened = DirStore::open(tmp.path()).await.unwrap();
    assert_eq!(CollectionStore::list_all(&reopened).await.unwrap(), all);
}

#[tokio::test]
async fn dir_store_delete_and_clear() {
    let tmp = TempDir::new().unwrap();
    let store = DirStore::open(tmp.path()).await.unwrap();
    CollectionStore::save(&store, &collection("col_a", 0)).await.unwrap();
    CollectionStore::save(&store, &collection("col_b", 0)).await.unwrap();

    CollectionStore::delete(&store, "col_a").await.unwrap();
    let err = CollectionStore::delete(&store, "col_a").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(CollectionStore::list_all(&store).await.unwrap().len(), 1);

    store.clear().await.unwrap();
    assert!(CollectionStore::list_all(&store).await.unwrap().is_empty());
}

#[tokio::test]
async fn dir_store_rejects_path_like_ids() {
    let tmp = TempDir::new().unwrap();
    let store = DirStore::open(tmp.path()).await.unwrap();
    let err = CollectionStore::save(&store, &collection("../escape", 0)).await.unwrap_err();
    assert!(matches!(err, StoreError::Backend(_)));
}

#[tokio::test]
async fn dir_store_files() {
    let tmp = TempDir::new().unwrap();
    let store = DirStore::open(tmp.path()).await.unwrap();
    FileStore::save(&store, &file("abc123", "notes.txt")).await.unwrap();
    let files = FileStore::list_all(&store).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "notes.txt");
    FileStore::delete(&store, "abc123").await.unwrap();
    assert!(FileStore::list_all(&store).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_saves_of_one_file_all_land() {
    let tmp = TempDir::new().unwrap();
    let store = DirStore::open(tmp.path()).await.unwrap();
    let (a, b, c, d) = (file("dup", "a.txt"), file("dup", "b.txt"), file("dup", "c.txt"), file("dup", "d.txt"));
    let results = tokio::join!(
        FileStore::save(&store, &a),
        FileStore::save(&store, &b),
        FileStore::save(&store, &c),
        FileStore::save(&store, &d),
    );
    results.0.unwrap();
    results.1.unwrap();
    results.2.unwrap();
    results.3.unwrap();

    let files = FileStore::list_all(&store).await.unwrap();
    assert_eq!(files.len(), 1);
    assert!(["a.txt", "b.txt", "c.txt", "d.txt"].contains(&files[0].name.as_str()));
    let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join("files"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[tokio::test]
async fn experiment_log_appends_in_order() {
    let tmp = TempDir::new().unwrap();
    let log = JsonExperimentLog::new(tmp.path().join("nested").join(EXPERIMENTS_FILE));
    assert!(log.load().await.unwrap().is_empty());

    log.append(&experiment("exp_1")).await.unwrap();
    log.append(&experiment("exp_2")).await.unwrap();

    let all = log.load().await.unwrap();
    let ids: Vec<&str> = all.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["exp_1", "exp_2"]);
    assert_eq!(all[0].chunk_counts[&ChunkMethod::Fixed], 4);
}

#[tokio::test]
async fn memory_store_shares_state_between_clones() {
    let store = MemoryStore::new();
    let other = store.clone();
    CollectionStore::save(&store, &collection("col_x", 0)).await.unwrap();
    other.append(&experiment("exp_1")).await.unwrap();

    assert_eq!(CollectionStore::list_all(&other).await.unwrap().len(), 1);
    assert_eq!(store.load().await.unwrap().len(), 1);
    assert!(FileStore::delete(&store, "missing").await.is_err());
}
