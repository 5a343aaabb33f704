// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic lexical feature-hashing embedder
//!
//! Maps text to a fixed-dimension vector without any model files: word
//! tokens and their prefixes are hashed into signed buckets, counted, and
//! L2-normalized. Texts sharing vocabulary land near each other under inner
//! product, which is what the retrieval tests and model-free deployments
//! need. Not a semantic model.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::TextEmbedder;

/// Minimum prefix length emitted per token. Prefix features give a crude
/// morphology: "highest" emits "high", so inflected query words still match
/// their stems in profile text.
const MIN_PREFIX_LEN: usize = 4;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        // Same dimension as all-MiniLM-L6-v2 so artifacts stay shape-compatible
        Self { dimension: 384 }
    }
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Lexical features of a text: each lowercase alphanumeric token plus its
    /// prefixes of length >= MIN_PREFIX_LEN.
    fn features(text: &str) -> Vec<String> {
        let mut features = Vec::new();
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            features.push(token.to_string());
            let chars: Vec<char> = token.chars().collect();
            for len in MIN_PREFIX_LEN..chars.len() {
                features.push(chars[..len].iter().collect());
            }
        }
        features
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for feature in Self::features(text) {
            // DefaultHasher::new() is deterministic (fixed keys), unlike a
            // hasher pulled from RandomState
            let mut hasher = DefaultHasher::new();
            feature.hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl TextEmbedder for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "lexical-hashing"
    }
}
