// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query-time retrieval
//!
//! Embeds a query as a single-item batch, searches the vector index, and
//! resolves hits positionally against the chunk store. Similarity scores are
//! clamped to [0, 1] before leaving this module; float drift in normalized
//! inner products can push them fractionally outside.

use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use crate::chunks::{Chunk, ChunkStore};
use crate::embeddings::TextEmbedder;
use crate::index::FlatIpIndex;

/// One retrieved chunk with its clamped similarity score
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Retrieval over a loaded index + chunk store pair
pub struct Retriever {
    embedder: Arc<dyn TextEmbedder>,
    index: Arc<FlatIpIndex>,
    chunks: Arc<ChunkStore>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        index: Arc<FlatIpIndex>,
        chunks: Arc<ChunkStore>,
    ) -> Self {
        Self {
            embedder,
            index,
            chunks,
        }
    }

    /// Number of vectors available for retrieval
    pub fn indexed_count(&self) -> usize {
        self.index.len()
    }

    /// Retrieve the `top_k` most similar chunks for a query.
    ///
    /// An empty index or chunk store yields an empty result, not an error.
    /// A search hit pointing outside the chunk store is a corruption
    /// condition: it is logged and skipped, degrading the result count
    /// instead of failing the request.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if self.index.is_empty() || self.chunks.is_empty() {
            return Ok(vec![]);
        }

        let query_vector = self.embedder.embed(query).await?;
        let hits = self.index.search(&query_vector, top_k)?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.chunks.get(hit.row) {
                Some(chunk) => results.push(RetrievedChunk {
                    chunk: chunk.clone(),
                    similarity: hit.score.clamp(0.0, 1.0),
                }),
                None => {
                    warn!(
                        "Search returned row {} but chunk store holds {} chunks; skipping corrupt hit",
                        hit.row,
                        self.chunks.len()
                    );
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{Chunk, ChunkMetadata};
    use crate::embeddings::HashingEmbedder;

    fn chunk(id: usize, text: &str, county: &str) -> Chunk {
        Chunk {
            chunk_id: id,
            text: text.to_string(),
            metadata: ChunkMetadata {
                county: county.to_string(),
                state: "CA".to_string(),
                is_high_risk: false,
                composite_risk: None,
            },
        }
    }

    async fn build_retriever(texts: &[&str]) -> Retriever {
        let embedder = Arc::new(HashingEmbedder::default());
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let embeddings = embedder.embed_batch(&owned).await.unwrap();
        let index =
            FlatIpIndex::build(&embeddings, embedder.dimension(), "fp".to_string()).unwrap();
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| chunk(i, t, &format!("County{}", i)))
            .collect();
        Retriever::new(
            embedder,
            Arc::new(index),
            Arc::new(ChunkStore::new(chunks).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_scores_clamped_and_sorted() {
        let retriever = build_retriever(&[
            "grocery stores and farmers markets",
            "fast food density and gyms",
            "food insecurity and low access",
        ])
        .await;

        let results = retriever.retrieve("farmers markets access", 3).await.unwrap();
        assert!(!results.is_empty());
        for result in &results {
            assert!(result.similarity >= 0.0 && result.similarity <= 1.0);
        }
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[tokio::test]
    async fn test_top_k_overflow_returns_all_chunks() {
        let retriever = build_retriever(&["one county", "another county"]).await;
        let results = retriever.retrieve("county", 50).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_hit_is_skipped() {
        // Index over 3 texts, but a chunk store holding only 2 entries:
        // the dangling hit must be skipped, not panic or error
        let embedder = Arc::new(HashingEmbedder::default());
        let texts = vec![
            "alpha grocery".to_string(),
            "beta grocery".to_string(),
            "gamma grocery".to_string(),
        ];
        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        let index =
            FlatIpIndex::build(&embeddings, embedder.dimension(), "fp".to_string()).unwrap();
        let store = ChunkStore::new(vec![
            chunk(0, "alpha grocery", "Alpha"),
            chunk(1, "beta grocery", "Beta"),
        ])
        .unwrap();

        let retriever = Retriever::new(embedder, Arc::new(index), Arc::new(store));
        let results = retriever.retrieve("grocery", 3).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.chunk.chunk_id < 2));
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let embedder: Arc<dyn TextEmbedder> = Arc::new(HashingEmbedder::default());
        let index = FlatIpIndex::build(&[], embedder.dimension(), "fp".to_string()).unwrap();
        let store = ChunkStore::new(vec![]).unwrap();
        let retriever = Retriever::new(embedder, Arc::new(index), Arc::new(store));

        let results = retriever.retrieve("anything", 5).await.unwrap();
        assert!(results.is_empty());
    }
}
