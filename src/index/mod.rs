// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Exact inner-product vector index
//!
//! A flat index over L2-normalized vectors stored in insertion order. Search
//! is an exhaustive scan: at this corpus scale (one vector per county) exact
//! search is cheap, and approximate structures would only add risk. Row ids
//! are positional and line up one-to-one with chunk ids.
//!
//! Persistence is a single bincode artifact. Reloading reconstructs the same
//! vectors in the same order, so search rankings are identical across a
//! save/load cycle.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One search hit: positional row id plus raw inner-product score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub row: usize,
    pub score: f32,
}

/// On-disk shape of the index artifact
#[derive(Serialize, Deserialize)]
struct IndexArtifact {
    format_version: u32,
    dimension: u32,
    count: u64,
    fingerprint: String,
    /// Row-major normalized vectors, count * dimension values
    vectors: Vec<f32>,
}

const FORMAT_VERSION: u32 = 1;

/// Flat exact inner-product index over normalized vectors
#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    dimension: usize,
    fingerprint: String,
    /// Row-major, L2-normalized
    vectors: Vec<f32>,
}

fn normalize_in_place(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

impl FlatIpIndex {
    /// Build an index from ordered embedding vectors.
    ///
    /// Vectors are normalized on the way in and stored in input order; the
    /// i-th input row becomes search row i. The fingerprint ties this index
    /// to the chunk list built from the same source snapshot.
    pub fn build(embeddings: &[Vec<f32>], dimension: usize, fingerprint: String) -> Result<Self> {
        if dimension == 0 {
            bail!("Index dimension must be greater than 0");
        }

        let mut vectors = Vec::with_capacity(embeddings.len() * dimension);
        for (row, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimension {
                bail!(
                    "Vector {} has wrong dimensions: expected {}, got {}",
                    row,
                    dimension,
                    embedding.len()
                );
            }
            if embedding.iter().any(|v| !v.is_finite()) {
                bail!("Vector {} contains NaN or Infinity values", row);
            }

            let start = vectors.len();
            vectors.extend_from_slice(embedding);
            normalize_in_place(&mut vectors[start..]);
        }

        Ok(Self {
            dimension,
            fingerprint,
            vectors,
        })
    }

    /// Number of vectors in the index
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Search for the k nearest rows by inner product.
    ///
    /// The query is normalized first, so scores are cosine similarities of
    /// the stored vectors. Results come back ordered by descending score;
    /// equal scores order by smaller row id, which is stable because row
    /// order reflects original record order. `k` larger than the index is
    /// clamped, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            bail!(
                "Query has wrong dimensions: expected {}, got {}",
                self.dimension,
                query.len()
            );
        }
        if query.iter().any(|v| !v.is_finite()) {
            bail!("Query contains NaN or Infinity values");
        }
        if self.is_empty() || k == 0 {
            return Ok(vec![]);
        }

        let mut normalized = query.to_vec();
        normalize_in_place(&mut normalized);

        let mut hits: Vec<SearchHit> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, stored)| SearchHit {
                row,
                score: stored.iter().zip(&normalized).map(|(a, b)| a * b).sum(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.row.cmp(&b.row))
        });
        hits.truncate(k.min(self.len()));

        Ok(hits)
    }

    /// Persist the index as a single artifact file, temp-write + rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let artifact = IndexArtifact {
            format_version: FORMAT_VERSION,
            dimension: self.dimension as u32,
            count: self.len() as u64,
            fingerprint: self.fingerprint.clone(),
            vectors: self.vectors.clone(),
        };
        let bytes = bincode::serialize(&artifact).context("Failed to encode index")?;

        let tmp_path = path.with_extension("bin.tmp");
        fs::write(&tmp_path, bytes)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move index artifact into {}", path.display()))?;
        Ok(())
    }

    /// Load a persisted index, validating its structural integrity.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Index artifact not found at {}", path.display()))?;
        let artifact: IndexArtifact =
            bincode::deserialize(&bytes).context("Failed to parse index artifact")?;

        if artifact.format_version != FORMAT_VERSION {
            bail!(
                "Unsupported index format version {} (expected {})",
                artifact.format_version,
                FORMAT_VERSION
            );
        }
        let dimension = artifact.dimension as usize;
        let expected_values = artifact.count as usize * dimension;
        if dimension == 0 || artifact.vectors.len() != expected_values {
            bail!(
                "Index artifact {} is corrupt: {} values for {} rows of {}d",
                path.display(),
                artifact.vectors.len(),
                artifact.count,
                dimension
            );
        }

        Ok(Self {
            dimension,
            fingerprint: artifact.fingerprint,
            vectors: artifact.vectors,
        })
    }
}
