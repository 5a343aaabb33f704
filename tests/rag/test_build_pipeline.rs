// Offline build pipeline: records -> profiles -> chunks -> index, and the
// positional coupling between chunk ids and index rows.

use foodscope_node::chunks::{build_chunks, ChunkStore};
use foodscope_node::dataset::{CountyRecord, RiskAnnotation};
use foodscope_node::embeddings::{HashingEmbedder, TextEmbedder};
use foodscope_node::index::FlatIpIndex;
use tempfile::tempdir;

fn sample_records() -> Vec<CountyRecord> {
    vec![
        CountyRecord {
            county: "Alpha".to_string(),
            state: "CA".to_string(),
            obesity_rate: Some(40.0),
            poverty_rate: Some(20.0),
            risk: Some(RiskAnnotation {
                composite_risk: 8.2,
                cluster: 1,
            }),
            ..Default::default()
        },
        CountyRecord {
            county: "Beta".to_string(),
            state: "TX".to_string(),
            obesity_rate: Some(10.0),
            poverty_rate: Some(5.0),
            ..Default::default()
        },
        CountyRecord {
            county: "Gamma".to_string(),
            state: "NY".to_string(),
            obesity_rate: Some(25.0),
            ..Default::default()
        },
    ]
}

async fn build_pair() -> (FlatIpIndex, ChunkStore) {
    let store = ChunkStore::new(build_chunks(&sample_records())).unwrap();
    let embedder = HashingEmbedder::default();
    let embeddings = embedder.embed_batch(&store.texts()).await.unwrap();
    let index = FlatIpIndex::build(
        &embeddings,
        embedder.dimension(),
        store.fingerprint().to_string(),
    )
    .unwrap();
    (index, store)
}

#[tokio::test]
async fn test_positional_invariant_holds_after_build() {
    let (index, store) = build_pair().await;

    assert_eq!(index.len(), store.len());
    for i in 0..store.len() {
        assert_eq!(store.get(i).unwrap().chunk_id, i);
    }

    // The i-th vector corresponds to chunk i: querying with chunk i's own
    // text must rank row i first
    let embedder = HashingEmbedder::default();
    for i in 0..store.len() {
        let query = embedder.embed(&store.get(i).unwrap().text).await.unwrap();
        let hits = index.search(&query, 1).unwrap();
        assert_eq!(hits[0].row, i);
    }
}

#[tokio::test]
async fn test_chunk_metadata_carries_risk_flag() {
    let (_, store) = build_pair().await;
    assert!(store.get(0).unwrap().metadata.is_high_risk);
    assert!(!store.get(1).unwrap().metadata.is_high_risk);
    assert!(store
        .get(0)
        .unwrap()
        .text
        .contains("Highest Composite Health Risk area (Cluster 1)"));
}

#[tokio::test]
async fn test_persisted_pair_reproduces_rankings() {
    let dir = tempdir().unwrap();
    let index_path = dir.path().join("index.bin");
    let chunks_path = dir.path().join("chunks.json");

    let (index, store) = build_pair().await;
    index.save(&index_path).unwrap();
    store.save(&chunks_path).unwrap();

    let reloaded_index = FlatIpIndex::load(&index_path).unwrap();
    let reloaded_store = ChunkStore::load(&chunks_path).unwrap();

    assert_eq!(reloaded_index.fingerprint(), reloaded_store.fingerprint());
    assert_eq!(reloaded_index.len(), reloaded_store.len());

    let embedder = HashingEmbedder::default();
    let query = embedder.embed("poverty and obesity").await.unwrap();
    assert_eq!(
        index.search(&query, 3).unwrap(),
        reloaded_index.search(&query, 3).unwrap()
    );
}
