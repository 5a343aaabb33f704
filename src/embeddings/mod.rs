// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text embedding backends
//!
//! The retrieval pipeline is generic over a [`TextEmbedder`]: a deterministic
//! text-to-vector mapping with a fixed output dimension and batch support.
//! Two backends are provided:
//!
//! - [`MiniLmEmbedder`]: the all-MiniLM-L6-v2 sentence transformer via ONNX
//!   Runtime. Production quality, needs model files on disk.
//! - [`HashingEmbedder`]: deterministic lexical feature hashing. No model
//!   files, used by tests and model-free deployments.
//!
//! Both are stateless after load: embedding the same text twice yields the
//! same vector.

mod hashing;
mod minilm;

pub use hashing::HashingEmbedder;
pub use minilm::MiniLmEmbedder;

use anyhow::Result;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::NodeConfig;

/// A deterministic text-to-vector mapping with fixed output dimension
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed an ordered batch of texts, returning one vector per text in the
    /// same order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (a one-item batch).
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedder returned no vector for single-item batch"))
    }

    /// Output vector dimension
    fn dimension(&self) -> usize;

    /// Human-readable backend name for logs
    fn model_name(&self) -> &str;
}

/// Which embedding backend to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderBackend {
    MiniLm,
    Hashing,
}

impl FromStr for EmbedderBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minilm" | "onnx" => Ok(EmbedderBackend::MiniLm),
            "hashing" => Ok(EmbedderBackend::Hashing),
            other => anyhow::bail!("Unknown embedder backend: {}", other),
        }
    }
}

/// Load the configured embedding backend.
///
/// Failure here is reported to the service layer, which marks retrieval
/// unavailable rather than crashing the process.
pub async fn load_embedder(config: &NodeConfig) -> Result<Arc<dyn TextEmbedder>> {
    match config.embedder {
        EmbedderBackend::MiniLm => {
            let model = MiniLmEmbedder::new(&config.onnx_model_path, &config.tokenizer_path).await?;
            Ok(Arc::new(model))
        }
        EmbedderBackend::Hashing => Ok(Arc::new(HashingEmbedder::default())),
    }
}
