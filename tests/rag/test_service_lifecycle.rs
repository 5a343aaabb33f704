// Service state machine: initialization, degradation, and artifact pairing.

use foodscope_node::chunks::{build_chunks, ChunkStore};
use foodscope_node::config::NodeConfig;
use foodscope_node::dataset::CountyRecord;
use foodscope_node::embeddings::{EmbedderBackend, HashingEmbedder, TextEmbedder};
use foodscope_node::generation::GenerationError;
use foodscope_node::index::FlatIpIndex;
use foodscope_node::service::{RagError, RagService, ServiceState};
use std::path::Path;
use tempfile::tempdir;

fn records() -> Vec<CountyRecord> {
    ["Alpha", "Beta", "Gamma"]
        .iter()
        .map(|county| CountyRecord {
            county: county.to_string(),
            state: "CA".to_string(),
            poverty_rate: Some(12.0),
            ..Default::default()
        })
        .collect()
}

async fn write_artifacts(dir: &Path) -> NodeConfig {
    let store = ChunkStore::new(build_chunks(&records())).unwrap();
    let embedder = HashingEmbedder::default();
    let embeddings = embedder.embed_batch(&store.texts()).await.unwrap();
    let index = FlatIpIndex::build(
        &embeddings,
        embedder.dimension(),
        store.fingerprint().to_string(),
    )
    .unwrap();

    let index_path = dir.join("index.bin");
    let chunks_path = dir.join("chunks.json");
    index.save(&index_path).unwrap();
    store.save(&chunks_path).unwrap();

    NodeConfig {
        index_path,
        chunks_path,
        embedder: EmbedderBackend::Hashing,
        ..NodeConfig::default()
    }
}

#[tokio::test]
async fn test_valid_pair_reaches_ready() {
    let dir = tempdir().unwrap();
    let config = write_artifacts(dir.path()).await;

    let service = RagService::new(config);
    assert_eq!(service.initialize().await, ServiceState::Ready);
    assert_eq!(service.indexed_count().await, 3);
}

#[tokio::test]
async fn test_ready_without_credential_yields_typed_generation_error() {
    let dir = tempdir().unwrap();
    let config = write_artifacts(dir.path()).await;

    let service = RagService::new(config);
    service.initialize().await;

    // Retrieval works, generation has no credential: a structured failure,
    // not a panic and not the retrieval-unavailable fallback
    let result = service.ask("how is poverty in Alpha?").await;
    assert!(matches!(
        result,
        Err(RagError::Generation(GenerationError::MissingCredential))
    ));
}

#[tokio::test]
async fn test_missing_index_artifact_degrades() {
    let dir = tempdir().unwrap();
    let mut config = write_artifacts(dir.path()).await;
    std::fs::remove_file(&config.index_path).unwrap();
    config.embedder = EmbedderBackend::Hashing;

    let service = RagService::new(config);
    assert_eq!(service.initialize().await, ServiceState::Degraded);

    let response = service.ask("anything").await.unwrap();
    assert!(response.sources.is_empty());
    assert!(response.answer.contains("currently unavailable"));
}

#[tokio::test]
async fn test_count_mismatch_between_artifacts_degrades() {
    let dir = tempdir().unwrap();
    let config = write_artifacts(dir.path()).await;

    // Rewrite the chunk artifact with one chunk fewer than the index holds
    let mut chunks = build_chunks(&records());
    chunks.pop();
    let shorter = ChunkStore::new(chunks).unwrap();
    shorter.save(&config.chunks_path).unwrap();

    let service = RagService::new(config);
    assert_eq!(service.initialize().await, ServiceState::Degraded);
}

#[tokio::test]
async fn test_fingerprint_mismatch_between_artifacts_degrades() {
    let dir = tempdir().unwrap();
    let config = write_artifacts(dir.path()).await;

    // Same chunk count, but texts from a different source snapshot
    let mut other_records = records();
    other_records[0].poverty_rate = Some(99.0);
    let other = ChunkStore::new(build_chunks(&other_records)).unwrap();
    other.save(&config.chunks_path).unwrap();

    let service = RagService::new(config);
    assert_eq!(service.initialize().await, ServiceState::Degraded);
}
