// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! RAG service orchestration
//!
//! Owns the lifecycle of the loaded embedding model, vector index, chunk
//! store, and completion client. Initialization loads what it can and marks
//! the rest unavailable; a missing artifact degrades the service, it never
//! takes the process down. After `initialize()` completes, the loaded state
//! is read-only, so concurrent `ask()` calls share it without further
//! locking discipline.

mod errors;

pub use errors::RagError;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::chunks::ChunkStore;
use crate::config::NodeConfig;
use crate::embeddings::load_embedder;
use crate::generation::{AnswerGenerator, SourceAttribution};
use crate::index::FlatIpIndex;
use crate::retriever::Retriever;

/// Fixed answer returned while retrieval is unavailable
const UNAVAILABLE_ANSWER: &str =
    "The AI assistant is currently unavailable. Please try again later.";

/// Service lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    /// Index, chunks, and embedding model all loaded
    Ready,
    /// Initialization finished with at least one capability missing
    Degraded,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Uninitialized => "uninitialized",
            ServiceState::Initializing => "initializing",
            ServiceState::Ready => "ready",
            ServiceState::Degraded => "degraded",
        }
    }
}

/// Answer plus ranked source attributions, as returned to the caller
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<SourceAttribution>,
}

struct ServiceInner {
    state: ServiceState,
    retriever: Option<Retriever>,
    generator: Option<AnswerGenerator>,
}

/// Process-wide RAG service
///
/// Constructed once by the hosting application's startup routine and shared
/// behind an `Arc` with request handlers; there is no hidden global state.
pub struct RagService {
    config: NodeConfig,
    inner: RwLock<ServiceInner>,
}

impl RagService {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(ServiceInner {
                state: ServiceState::Uninitialized,
                retriever: None,
                generator: None,
            }),
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> ServiceState {
        self.inner.read().await.state
    }

    /// Number of vectors available for retrieval (0 while unavailable)
    pub async fn indexed_count(&self) -> usize {
        self.inner
            .read()
            .await
            .retriever
            .as_ref()
            .map(|r| r.indexed_count())
            .unwrap_or(0)
    }

    /// Load models, artifacts, and the completion client.
    ///
    /// Idempotent: once initialization has completed (READY or DEGRADED),
    /// calling again is a no-op. Individual load failures are logged once
    /// and the capability is marked unavailable; initialization always runs
    /// to completion.
    pub async fn initialize(&self) -> ServiceState {
        let mut inner = self.inner.write().await;
        if inner.state != ServiceState::Uninitialized {
            return inner.state;
        }
        inner.state = ServiceState::Initializing;

        // Embedding model
        let embedder = match load_embedder(&self.config).await {
            Ok(embedder) => {
                info!("Embedding model loaded: {}", embedder.model_name());
                Some(embedder)
            }
            Err(e) => {
                error!("Failed to load embedding model: {:#}", e);
                None
            }
        };

        // Persisted artifact pair
        let index = match FlatIpIndex::load(&self.config.index_path) {
            Ok(index) => {
                info!(
                    "Vector index loaded from {} ({} vectors, {}d)",
                    self.config.index_path.display(),
                    index.len(),
                    index.dimension()
                );
                Some(index)
            }
            Err(e) => {
                error!("Failed to load vector index: {:#}", e);
                None
            }
        };
        let chunks = match ChunkStore::load(&self.config.chunks_path) {
            Ok(store) => {
                info!(
                    "Chunk store loaded from {} ({} chunks)",
                    self.config.chunks_path.display(),
                    store.len()
                );
                Some(store)
            }
            Err(e) => {
                error!("Failed to load chunk store: {:#}", e);
                None
            }
        };

        // The two artifacts are only usable as a matched pair
        let pair = match (index, chunks) {
            (Some(index), Some(chunks)) => {
                if index.len() != chunks.len() {
                    error!(
                        "Artifact corruption: index holds {} vectors but chunk store holds {} chunks; retrieval disabled",
                        index.len(),
                        chunks.len()
                    );
                    None
                } else if index.fingerprint() != chunks.fingerprint() {
                    error!(
                        "Artifact corruption: index and chunk store were built from different source snapshots; retrieval disabled"
                    );
                    None
                } else {
                    Some((index, chunks))
                }
            }
            _ => None,
        };

        inner.retriever = match (embedder, pair) {
            (Some(embedder), Some((index, chunks))) => Some(Retriever::new(
                embedder,
                Arc::new(index),
                Arc::new(chunks),
            )),
            _ => None,
        };

        // Completion client: missing credential degrades generation only
        let generator = AnswerGenerator::new(self.config.completion.clone());
        if !generator.is_available() {
            warn!("No completion credential configured; generation unavailable");
        }
        inner.generator = Some(generator);

        inner.state = if inner.retriever.is_some() {
            ServiceState::Ready
        } else {
            ServiceState::Degraded
        };
        info!("RAG service initialized: {}", inner.state.as_str());
        inner.state
    }

    /// Answer one question.
    ///
    /// Lazily initializes on first use. While retrieval is unavailable the
    /// caller gets the fixed unavailability answer with empty sources rather
    /// than an error; generation faults surface as typed errors for the
    /// transport layer to shape.
    pub async fn ask(&self, query: &str) -> Result<AskResponse, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        if self.state().await == ServiceState::Uninitialized {
            self.initialize().await;
        }

        let inner = self.inner.read().await;
        let retriever = match &inner.retriever {
            Some(retriever) => retriever,
            None => {
                return Ok(AskResponse {
                    answer: UNAVAILABLE_ANSWER.to_string(),
                    sources: vec![],
                })
            }
        };

        let retrieved = retriever
            .retrieve(query, self.config.top_k)
            .await
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        let generator = inner
            .generator
            .as_ref()
            .ok_or(RagError::Generation(
                crate::generation::GenerationError::MissingCredential,
            ))?;
        let generated = generator.generate(query, &retrieved).await?;

        Ok(AskResponse {
            answer: generated.answer,
            sources: generated.sources,
        })
    }
}
