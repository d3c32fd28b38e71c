//! Model inference via a local Ollama server (`POST /api/chat`).

use crate::types::ChatMessage;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Inference client wrapping the Ollama chat API.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

// -- Ollama request/response types -------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl InferenceClient {
    /// Create a new inference client.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build inference HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send the conversation and return the model's text reply.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        debug!(
            "Inference request to model {} ({} messages)",
            self.model,
            messages.len()
        );

        let resp = self
            .http
            .post(&url)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                stream: false,
            })
            .send()
            .await
            .context("Inference request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Inference failed ({}): {}", status, body);
        }

        let body: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse inference response")?;

        match body.message {
            Some(message) => Ok(message.content),
            None => bail!("Inference response carried no message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn chat_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama3",
                "stream": false,
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3",
                "message": {"role": "assistant", "content": "hello"},
                "done": true
            })))
            .mount(&server)
            .await;

        let client = InferenceClient::new(&server.uri(), "llama3", Duration::from_secs(5)).unwrap();
        let reply = client.chat(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(reply, "hello");
    }

    #[tokio::test]
    async fn chat_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client =
            InferenceClient::new(&server.uri(), "missing", Duration::from_secs(5)).unwrap();
        let err = client.chat(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }
}
