//! Ollama chat client used as the fallback answer model.

use crate::domain::ports::AnswerModel;
use crate::utils::error::{BridgeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";

pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OllamaClient {
    pub fn new(endpoint: String, model: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            model,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl AnswerModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatTurn {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        tracing::debug!(model = %self.model, "Sending chat request to {}", self.chat_url());

        let response = self
            .http
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::LlmError {
                message: format!("request to {} failed: {}", self.chat_url(), e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::LlmError {
                message: format!("Ollama returned HTTP {}: {}", status.as_u16(), body),
            });
        }

        let parsed: ChatResponse =
            response.json().await.map_err(|e| BridgeError::LlmError {
                message: format!("unexpected response shape: {}", e),
            })?;
        Ok(parsed.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_url_handles_trailing_slash() {
        let client = OllamaClient::new(
            "http://localhost:11434/".to_string(),
            DEFAULT_MODEL.to_string(),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.chat_url(), "http://localhost:11434/api/chat");
    }
}
