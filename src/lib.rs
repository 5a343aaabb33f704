// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod chunks;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod profile;
pub mod retriever;
pub mod service;
pub mod version;

// Re-export the types most callers need
pub use chunks::{Chunk, ChunkMetadata, ChunkStore};
pub use config::{CompletionConfig, NodeConfig};
pub use embeddings::{EmbedderBackend, HashingEmbedder, TextEmbedder};
pub use generation::{AnswerGenerator, GeneratedAnswer, GenerationError, SourceAttribution};
pub use index::{FlatIpIndex, SearchHit};
pub use retriever::{RetrievedChunk, Retriever};
pub use service::{AskResponse, RagError, RagService, ServiceState};
