// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the RAG service boundary
//!
//! Every fault a request can hit is caught at the component that produced it
//! and converted into one of these variants; callers never see a raw panic
//! or an unclassified error.

use thiserror::Error;

use crate::generation::GenerationError;

/// Faults surfaced by [`RagService`](super::RagService)
#[derive(Error, Debug)]
pub enum RagError {
    /// Query failed validation before any embedding was attempted
    #[error("Query must be a non-empty string")]
    EmptyQuery,

    /// Query embedding failed
    #[error("Failed to embed query: {0}")]
    Embedding(String),

    /// The completion capability failed or is unavailable
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl RagError {
    /// Human-readable message for API responses
    pub fn user_message(&self) -> String {
        match self {
            RagError::EmptyQuery => "Please provide a non-empty question.".to_string(),
            RagError::Embedding(_) => {
                "The assistant could not process this question. Please try again later.".to_string()
            }
            RagError::Generation(e) => e.user_message(),
        }
    }

    /// Stable code for logging and metrics
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::EmptyQuery => "EMPTY_QUERY",
            RagError::Embedding(_) => "EMBEDDING_FAILED",
            RagError::Generation(e) => e.error_code(),
        }
    }
}
