// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Grounded answer generation
//!
//! Assembles a single prompt from the retrieved chunks and asks a remote
//! chat-completion endpoint to synthesize the answer. Every failure mode is
//! a typed [`GenerationError`]; nothing in here panics a request.

mod client;

pub use client::CompletionClient;

use serde::Serialize;
use thiserror::Error;

use crate::config::CompletionConfig;
use crate::retriever::RetrievedChunk;

/// Errors from the completion capability
#[derive(Error, Debug)]
pub enum GenerationError {
    /// No credential configured; generation is unavailable, not broken
    #[error("Completion credential is not configured")]
    MissingCredential,

    /// The endpoint did not answer within the request timeout
    #[error("Completion request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The endpoint rejected the request
    #[error("Completion API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure reaching the endpoint
    #[error("Completion request failed: {0}")]
    Network(String),

    /// The endpoint answered with something we cannot use
    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Human-readable fallback message for API responses
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::MissingCredential => {
                "The assistant is not configured with a completion credential.".to_string()
            }
            _ => "The AI assistant is currently unavailable. Please try again later.".to_string(),
        }
    }

    /// Stable code for logging and metrics
    pub fn error_code(&self) -> &'static str {
        match self {
            GenerationError::MissingCredential => "MISSING_CREDENTIAL",
            GenerationError::Timeout { .. } => "COMPLETION_TIMEOUT",
            GenerationError::Api { .. } => "COMPLETION_API_ERROR",
            GenerationError::Network(_) => "COMPLETION_NETWORK_ERROR",
            GenerationError::InvalidResponse(_) => "COMPLETION_INVALID_RESPONSE",
        }
    }
}

/// Source attribution returned alongside the answer, ranked most relevant
/// first
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceAttribution {
    pub county: String,
    pub state: String,
    pub is_high_risk: bool,
    pub similarity: f32,
}

/// A synthesized answer plus the counties it was grounded in
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub sources: Vec<SourceAttribution>,
}

const SYSTEM_FRAMING: &str = "\
You are an expert in U.S. food environment and health analysis.
Use the following retrieved context to answer the user's question accurately.

FORMATTING & STYLE RULES:
1. NEVER mention words like \"context\", \"provided data\", \"the text above\", or \"based on the information\" in your response.
2. Speak directly as an expert performing the analysis.
3. Use **bold text** for key metrics like percentages or scores.
4. Use bullet points for lists of facts or recommendations.
5. Use Markdown TABLES when comparing data for two or more counties.
6. Keep your tone professional, authoritative, and data-driven.";

/// Build the single grounded prompt: fixed framing, source-tagged context
/// block, then the literal user question.
pub fn build_prompt(query: &str, chunks: &[RetrievedChunk]) -> String {
    let context = chunks
        .iter()
        .map(|retrieved| {
            format!(
                "[Source: {}, {}] {}",
                retrieved.chunk.metadata.county, retrieved.chunk.metadata.state, retrieved.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\nContext:\n{}\n\nUser Question: {}\n\nAnswer:",
        SYSTEM_FRAMING, context, query
    )
}

/// Answer generator over a completion client
pub struct AnswerGenerator {
    client: CompletionClient,
}

impl AnswerGenerator {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            client: CompletionClient::new(config),
        }
    }

    /// Whether a credential is configured
    pub fn is_available(&self) -> bool {
        self.client.is_configured()
    }

    /// Generate a grounded answer from the retrieved chunks.
    ///
    /// The sources list mirrors the retrieval order (most relevant first)
    /// with each chunk's similarity attached.
    pub async fn generate(
        &self,
        query: &str,
        chunks: &[RetrievedChunk],
    ) -> Result<GeneratedAnswer, GenerationError> {
        let prompt = build_prompt(query, chunks);
        let answer = self.client.complete(&prompt).await?;

        let sources = chunks
            .iter()
            .map(|retrieved| SourceAttribution {
                county: retrieved.chunk.metadata.county.clone(),
                state: retrieved.chunk.metadata.state.clone(),
                is_high_risk: retrieved.chunk.metadata.is_high_risk,
                similarity: retrieved.similarity,
            })
            .collect();

        Ok(GeneratedAnswer { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{Chunk, ChunkMetadata};

    fn retrieved(county: &str, state: &str, text: &str, similarity: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                chunk_id: 0,
                text: text.to_string(),
                metadata: ChunkMetadata {
                    county: county.to_string(),
                    state: state.to_string(),
                    is_high_risk: false,
                    composite_risk: None,
                },
            },
            similarity,
        }
    }

    #[test]
    fn test_prompt_contains_tagged_context_and_question() {
        let chunks = vec![
            retrieved("Alpha", "CA", "Profile text for Alpha.", 0.9),
            retrieved("Beta", "TX", "Profile text for Beta.", 0.5),
        ];
        let prompt = build_prompt("which county is worse off?", &chunks);

        assert!(prompt.contains("[Source: Alpha, CA] Profile text for Alpha."));
        assert!(prompt.contains("[Source: Beta, TX] Profile text for Beta."));
        assert!(prompt.contains("User Question: which county is worse off?"));
        assert!(prompt.contains("Markdown TABLES"));
        // Framing precedes context, context precedes the question
        let framing_pos = prompt.find("expert in U.S. food environment").unwrap();
        let context_pos = prompt.find("[Source: Alpha").unwrap();
        let question_pos = prompt.find("User Question:").unwrap();
        assert!(framing_pos < context_pos && context_pos < question_pos);
    }

    #[test]
    fn test_prompt_with_no_chunks_still_carries_question() {
        let prompt = build_prompt("anything at all", &[]);
        assert!(prompt.contains("User Question: anything at all"));
    }

    #[tokio::test]
    async fn test_generate_without_credential_is_structured_failure() {
        let generator = AnswerGenerator::new(CompletionConfig::default());
        assert!(!generator.is_available());

        let result = generator.generate("question", &[]).await;
        assert!(matches!(result, Err(GenerationError::MissingCredential)));
    }

    #[test]
    fn test_user_messages_are_friendly() {
        let err = GenerationError::Timeout { timeout_secs: 30 };
        assert!(err.user_message().contains("currently unavailable"));
        assert_eq!(err.error_code(), "COMPLETION_TIMEOUT");
    }
}
