// Query-time retrieval scenarios over a small known corpus.

use foodscope_node::chunks::{Chunk, ChunkMetadata, ChunkStore};
use foodscope_node::embeddings::{HashingEmbedder, TextEmbedder};
use foodscope_node::index::FlatIpIndex;
use foodscope_node::retriever::Retriever;
use std::sync::Arc;

fn chunk(id: usize, county: &str, state: &str, text: &str) -> Chunk {
    Chunk {
        chunk_id: id,
        text: text.to_string(),
        metadata: ChunkMetadata {
            county: county.to_string(),
            state: state.to_string(),
            is_high_risk: false,
            composite_risk: None,
        },
    }
}

async fn obesity_corpus() -> Retriever {
    let chunks = vec![
        chunk(0, "Alpha", "CA", "Alpha, CA: high obesity 40%"),
        chunk(1, "Beta", "TX", "Beta, TX: low obesity 10%"),
        chunk(2, "Gamma", "NY", "Gamma, NY: moderate obesity 25%"),
    ];
    let embedder = Arc::new(HashingEmbedder::default());
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await.unwrap();
    let index = FlatIpIndex::build(&embeddings, embedder.dimension(), "fp".to_string()).unwrap();
    Retriever::new(
        embedder,
        Arc::new(index),
        Arc::new(ChunkStore::new(chunks).unwrap()),
    )
}

#[tokio::test]
async fn test_highest_obesity_query_ranks_alpha_first() {
    let retriever = obesity_corpus().await;
    let results = retriever
        .retrieve("which county has the highest obesity rate", 3)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].chunk.metadata.county, "Alpha");
    assert_eq!(results[0].chunk.metadata.state, "CA");
}

#[tokio::test]
async fn test_scores_bounded_and_monotonic() {
    let retriever = obesity_corpus().await;
    let results = retriever
        .retrieve("which county has the highest obesity rate", 3)
        .await
        .unwrap();

    for result in &results {
        assert!(result.similarity >= 0.0);
        assert!(result.similarity <= 1.0);
    }
    assert!(results[0].similarity >= results[1].similarity);
    assert!(results[1].similarity >= results[2].similarity);
}

#[tokio::test]
async fn test_k_overflow_returns_full_corpus() {
    let retriever = obesity_corpus().await;
    let results = retriever.retrieve("obesity", 100).await.unwrap();
    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn test_exact_chunk_text_retrieves_itself() {
    let retriever = obesity_corpus().await;
    let results = retriever
        .retrieve("Beta, TX: low obesity 10%", 1)
        .await
        .unwrap();
    assert_eq!(results[0].chunk.metadata.county, "Beta");
    assert!(results[0].similarity > 0.99);
}
