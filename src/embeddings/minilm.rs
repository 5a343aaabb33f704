// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! all-MiniLM-L6-v2 sentence embeddings via ONNX Runtime
//!
//! Loads the exported transformer and its BERT tokenizer from disk and
//! produces 384-dimensional sentence vectors by mean-pooling the token
//! embeddings under the attention mask. The single-text path is a one-item
//! batch, so both paths share the same tensor plumbing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::info;

/// Output dimension of all-MiniLM-L6-v2
const EMBEDDING_DIM: usize = 384;

/// ONNX-backed sentence embedder
///
/// The session is behind a mutex: ONNX inference takes `&mut Session`, and
/// embedding calls are short enough that serializing them is fine at this
/// corpus scale.
#[derive(Clone)]
pub struct MiniLmEmbedder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
}

impl std::fmt::Debug for MiniLmEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniLmEmbedder")
            .field("model_name", &self.model_name)
            .field("dimension", &EMBEDDING_DIM)
            .finish_non_exhaustive()
    }
}

/// Tokenized batch, padded to a common length
struct TokenBatch {
    input_ids: Array2<i64>,
    attention_mask: Array2<i64>,
    token_type_ids: Array2<i64>,
    /// Flat copy of the attention mask for pooling, row-major
    mask_values: Vec<i64>,
    rows: usize,
    padded_len: usize,
}

impl MiniLmEmbedder {
    /// Load the model and tokenizer from disk.
    ///
    /// Runs one probe inference so a wrong or truncated export fails here,
    /// at startup, instead of on the first query.
    pub async fn new(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let embedder = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name: "all-MiniLM-L6-v2".to_string(),
        };

        let probe = embedder.run_batch(&["probe".to_string()])?;
        if probe.len() != 1 || probe[0].len() != EMBEDDING_DIM {
            anyhow::bail!(
                "Model at {} does not produce {}-dimensional sentence embeddings",
                model_path.display(),
                EMBEDDING_DIM
            );
        }
        info!("Loaded embedding model {} ({}d)", embedder.model_name, EMBEDDING_DIM);

        Ok(embedder)
    }

    /// Tokenize a batch and pad every sequence to the longest one.
    fn tokenize_batch(&self, texts: &[String]) -> Result<TokenBatch> {
        let encodings = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let padded_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(1)
            .max(1);

        let rows = texts.len();
        let mut ids = Vec::with_capacity(rows * padded_len);
        let mut mask = Vec::with_capacity(rows * padded_len);

        for encoding in &encodings {
            let row_ids = encoding.get_ids();
            let row_mask = encoding.get_attention_mask();
            ids.extend(row_ids.iter().map(|&id| id as i64));
            mask.extend(row_mask.iter().map(|&m| m as i64));

            let padding = padded_len - row_ids.len();
            ids.extend(std::iter::repeat(0i64).take(padding));
            mask.extend(std::iter::repeat(0i64).take(padding));
        }

        let mask_values = mask.clone();
        let token_type = vec![0i64; rows * padded_len];

        Ok(TokenBatch {
            input_ids: Array2::from_shape_vec((rows, padded_len), ids)
                .context("Failed to shape input_ids")?,
            attention_mask: Array2::from_shape_vec((rows, padded_len), mask)
                .context("Failed to shape attention_mask")?,
            token_type_ids: Array2::from_shape_vec((rows, padded_len), token_type)
                .context("Failed to shape token_type_ids")?,
            mask_values,
            rows,
            padded_len,
        })
    }

    /// Tokenize, run inference, and mean-pool one batch.
    fn run_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let batch = self.tokenize_batch(texts)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Embedding session poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(batch.input_ids.clone())?,
            "attention_mask" => Value::from_array(batch.attention_mask.clone())?,
            "token_type_ids" => Value::from_array(batch.token_type_ids.clone())?
        ])?;

        // Token-level output is [batch, seq_len, hidden]; output index 0 is
        // used because export pipelines disagree on the output name
        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        if output.ndim() != 3 || output.shape()[2] != EMBEDDING_DIM {
            anyhow::bail!(
                "Unexpected model output shape {:?} (expected [batch, seq, {}])",
                output.shape(),
                EMBEDDING_DIM
            );
        }

        let mut embeddings = Vec::with_capacity(batch.rows);
        for row in 0..batch.rows {
            let token_embeddings = output.index_axis(Axis(0), row);
            let row_mask =
                &batch.mask_values[row * batch.padded_len..(row + 1) * batch.padded_len];
            embeddings.push(mean_pool(&token_embeddings, row_mask));
        }
        Ok(embeddings)
    }
}

/// Mean-pool token embeddings, weighted by the attention mask so padding
/// tokens contribute nothing.
fn mean_pool(token_embeddings: &ndarray::ArrayViewD<'_, f32>, mask: &[i64]) -> Vec<f32> {
    let seq_len = token_embeddings.shape()[0];
    let hidden = token_embeddings.shape()[1];

    let mut pooled = vec![0.0f32; hidden];
    let mut mask_sum = 0.0f32;

    for i in 0..seq_len {
        let weight = mask[i] as f32;
        mask_sum += weight;
        for j in 0..hidden {
            pooled[j] += token_embeddings[[i, j]] * weight;
        }
    }

    let denom = mask_sum.max(1e-9);
    for value in &mut pooled {
        *value /= denom;
    }
    pooled
}

#[async_trait]
impl super::TextEmbedder for MiniLmEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.run_batch(texts)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
