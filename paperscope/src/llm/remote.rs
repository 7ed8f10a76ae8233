use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AnalysisProvider, LlmRequest, LlmResponse, UsageMetadata};
use crate::errors::AnalysisError;

/// Remote analysis provider using an OpenAI-compatible HTTP API
pub struct RemoteAnalysisProvider {
    chat_url: String,
    api_key: String,
    model: String,
    default_timeout: Duration,
    default_max_tokens: usize,
    default_temperature: f32,
    client: reqwest::Client,
}

impl RemoteAnalysisProvider {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            chat_url: chat_completions_url(endpoint),
            api_key: api_key.into(),
            model: model.into(),
            default_timeout: Duration::from_secs(30),
            default_max_tokens: 800,
            default_temperature: 0.3,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_defaults(
        mut self,
        timeout_secs: u64,
        max_tokens: usize,
        temperature: f32,
    ) -> Self {
        self.default_timeout = Duration::from_secs(timeout_secs);
        self.default_max_tokens = max_tokens;
        self.default_temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Normalizes a configured endpoint to the chat-completions URL.
/// Accepts a bare host, a `/v1` base, or the full completions path.
fn chat_completions_url(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for RemoteAnalysisProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, AnalysisError> {
        let timeout = request
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(Message {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(Message {
            role: "user".to_string(),
            content: request.prompt,
        });

        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(request.max_tokens.unwrap_or(self.default_max_tokens)),
            temperature: Some(request.temperature.unwrap_or(self.default_temperature)),
        };

        // The timeout covers the whole exchange, body included; reqwest's
        // own timeout is left unset so this is the single knob.
        let exchange = async {
            let response = self
                .client
                .post(&self.chat_url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AnalysisError::Api { status, body });
            }

            response
                .json::<ChatResponse>()
                .await
                .map_err(|e| AnalysisError::Protocol(format!("invalid completion payload: {e}")))
        };

        let payload = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| AnalysisError::Timeout(timeout.as_secs()))??;

        let choice = payload
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::Protocol("completion had no choices".to_string()))?;

        let usage = payload.usage.unwrap_or_default();

        Ok(LlmResponse {
            content: choice.message.content,
            usage: UsageMetadata {
                prompt_tokens: usage.prompt_tokens.unwrap_or(0),
                completion_tokens: usage.completion_tokens.unwrap_or(0),
                total_tokens: usage.total_tokens.unwrap_or(0),
            },
            model: payload.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

// OpenAI wire structures
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalization() {
        assert_eq!(
            chat_completions_url("https://ai.example"),
            "https://ai.example/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://ai.example/v1"),
            "https://ai.example/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://ai.example/v1/"),
            "https://ai.example/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://ai.example/v1/chat/completions"),
            "https://ai.example/v1/chat/completions"
        );
    }
}
