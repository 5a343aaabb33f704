// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! All settings come from environment variables with working defaults, so the
//! node can start with nothing but the artifact files in place. `dotenv` is
//! loaded by the binaries before this module is consulted.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::embeddings::EmbedderBackend;

/// Default Groq OpenAI-compatible chat completions endpoint
const DEFAULT_COMPLETION_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default completion model
const DEFAULT_COMPLETION_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuration for the remote chat-completion endpoint
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_url: String,
    /// Credential for the completion endpoint. Absence degrades generation,
    /// it never prevents the node from starting.
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_COMPLETION_URL.to_string(),
            api_key: None,
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Top-level node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub listen_addr: String,
    /// Serialized vector index artifact
    pub index_path: PathBuf,
    /// Serialized ordered chunk list artifact (paired with `index_path`)
    pub chunks_path: PathBuf,
    pub embedder: EmbedderBackend,
    pub onnx_model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub completion: CompletionConfig,
    /// Number of chunks retrieved per question
    pub top_k: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            index_path: PathBuf::from("./assets/county_index.bin"),
            chunks_path: PathBuf::from("./assets/county_chunks.json"),
            embedder: EmbedderBackend::MiniLm,
            onnx_model_path: PathBuf::from("./models/all-MiniLM-L6-v2-onnx/model.onnx"),
            tokenizer_path: PathBuf::from("./models/all-MiniLM-L6-v2-onnx/tokenizer.json"),
            completion: CompletionConfig::default(),
            top_k: 10,
        }
    }
}

impl NodeConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let completion_defaults = CompletionConfig::default();

        let completion = CompletionConfig {
            api_url: env_or("COMPLETION_API_URL", completion_defaults.api_url),
            api_key: env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()),
            model: env_or("COMPLETION_MODEL", completion_defaults.model),
            temperature: env_parsed("COMPLETION_TEMPERATURE", completion_defaults.temperature),
            max_tokens: env_parsed("COMPLETION_MAX_TOKENS", completion_defaults.max_tokens),
            request_timeout: Duration::from_secs(env_parsed(
                "COMPLETION_TIMEOUT_SECS",
                completion_defaults.request_timeout.as_secs(),
            )),
        };

        Self {
            listen_addr: env_or("LISTEN_ADDR", defaults.listen_addr),
            index_path: PathBuf::from(env_or(
                "INDEX_PATH",
                defaults.index_path.display().to_string(),
            )),
            chunks_path: PathBuf::from(env_or(
                "CHUNKS_PATH",
                defaults.chunks_path.display().to_string(),
            )),
            embedder: env::var("EMBEDDER_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.embedder),
            onnx_model_path: PathBuf::from(env_or(
                "ONNX_MODEL_PATH",
                defaults.onnx_model_path.display().to_string(),
            )),
            tokenizer_path: PathBuf::from(env_or(
                "TOKENIZER_PATH",
                defaults.tokenizer_path.display().to_string(),
            )),
            completion,
            top_k: env_parsed("RETRIEVAL_TOP_K", defaults.top_k),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
