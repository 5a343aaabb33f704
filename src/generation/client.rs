// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::GenerationError;
use crate::config::CompletionConfig;

/// Minimal client for an OpenAI-compatible chat-completions endpoint
pub struct CompletionClient {
    config: CompletionConfig,
    http: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> Self {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self { config, http }
    }

    /// Whether a credential is configured
    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Send one prompt and return the completion text.
    ///
    /// Sampling is pinned low (the configured temperature defaults to 0.2)
    /// and output length is bounded by `max_tokens`; answers should be
    /// grounded and repeatable, not creative.
    pub async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingCredential)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(
            "Sending completion request to {} (model {}, prompt {} chars)",
            self.config.api_url,
            self.config.model,
            prompt.len()
        );

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        timeout_secs: self.config.request_timeout.as_secs(),
                    }
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("response held no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_configured_tracks_credential() {
        let mut config = CompletionConfig::default();
        assert!(!CompletionClient::new(config.clone()).is_configured());

        config.api_key = Some("key".to_string());
        assert!(CompletionClient::new(config).is_configured());
    }

    #[tokio::test]
    async fn test_complete_without_credential() {
        let client = CompletionClient::new(CompletionConfig::default());
        let result = client.complete("prompt").await;
        assert!(matches!(result, Err(GenerationError::MissingCredential)));
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "Alpha County has the highest rate."}}
            ]
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.choices[0].message.content,
            "Alpha County has the highest rate."
        );
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "llama-3.3-70b-versatile",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            temperature: 0.2,
            max_tokens: 1024,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 1024);
    }
}
