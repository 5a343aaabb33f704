// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chunk construction and persistence
//!
//! A chunk is one retrievable unit of knowledge: the rendered profile text of
//! one county plus fixed-field metadata and a positional id. The chunk id of
//! every chunk equals its row position, and that position equals the row of
//! its vector in the index; retrieval resolves hits by position, so the
//! order written here must never change between build and load.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::dataset::CountyRecord;
use crate::profile::render_profile;

/// Fixed-field chunk metadata
///
/// The field set is stable and known in advance, so this is a struct rather
/// than an open-ended map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub county: String,
    pub state: String,
    pub is_high_risk: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_risk: Option<f64>,
}

/// One immutable unit of retrievable knowledge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: usize,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Build the ordered chunk sequence from the joined record collection.
///
/// One chunk per record, in record order, with `chunk_id` equal to the
/// 0-based position. No reordering, filtering, or deduplication.
pub fn build_chunks(records: &[CountyRecord]) -> Vec<Chunk> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| Chunk {
            chunk_id: i,
            text: render_profile(record),
            metadata: ChunkMetadata {
                county: record.county.clone(),
                state: record.state.clone(),
                is_high_risk: record.risk.is_some(),
                composite_risk: record.risk.as_ref().map(|r| r.composite_risk),
            },
        })
        .collect()
}

/// Content fingerprint over an ordered sequence of chunk texts.
///
/// Stored in both persisted artifacts; a mismatch at load time means the
/// index and chunk list came from different source-data snapshots.
pub fn dataset_fingerprint<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for text in texts {
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// On-disk shape of the chunk-list artifact
#[derive(Serialize, Deserialize)]
struct ChunkArtifact {
    fingerprint: String,
    built_at: DateTime<Utc>,
    chunks: Vec<Chunk>,
}

/// Ordered, read-only collection of chunks
#[derive(Debug)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
    fingerprint: String,
}

impl ChunkStore {
    /// Wrap an ordered chunk sequence, validating the positional invariant.
    pub fn new(chunks: Vec<Chunk>) -> Result<Self> {
        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.chunk_id != i {
                bail!(
                    "Chunk id {} found at position {}: chunk ids must equal row position",
                    chunk.chunk_id,
                    i
                );
            }
        }
        let fingerprint = dataset_fingerprint(chunks.iter().map(|c| c.text.as_str()));
        Ok(Self {
            chunks,
            fingerprint,
        })
    }

    /// Positional lookup
    pub fn get(&self, chunk_id: usize) -> Option<&Chunk> {
        self.chunks.get(chunk_id)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Chunk texts in index order, for embedding and fingerprinting
    pub fn texts(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.text.clone()).collect()
    }

    /// Persist the ordered chunk list as a JSON artifact.
    ///
    /// Written to a sibling temp file first and renamed into place, so a
    /// crashed build never leaves a half-written artifact behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let artifact = ChunkArtifact {
            fingerprint: self.fingerprint.clone(),
            built_at: Utc::now(),
            chunks: self.chunks.clone(),
        };
        let json = serde_json::to_vec_pretty(&artifact).context("Failed to encode chunk list")?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move chunk artifact into {}", path.display()))?;
        Ok(())
    }

    /// Load a previously persisted chunk list.
    ///
    /// Re-validates the positional invariant and re-derives the fingerprint
    /// from the loaded texts; a fingerprint that no longer matches the stored
    /// one means the artifact was corrupted after build.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Chunk artifact not found at {}", path.display()))?;
        let artifact: ChunkArtifact =
            serde_json::from_slice(&bytes).context("Failed to parse chunk artifact")?;

        let store = Self::new(artifact.chunks)?;
        if store.fingerprint != artifact.fingerprint {
            bail!(
                "Chunk artifact {} is corrupt: stored fingerprint does not match content",
                path.display()
            );
        }
        Ok(store)
    }
}
