//! Text-completion collaborator.
//!
//! The pipeline only needs `prompt -> text`. [`OpenRouterClient`] provides it
//! over the OpenAI-compatible chat completions endpoint.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use dailyvocab_shared::{AppConfig, Result, VocabError, resolve_api_key};

/// A black-box text generator.
pub trait TextCompletion: Send + Sync {
    /// Send `prompt` and return the model's reply text.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Chat-completions client for OpenRouter (or any OpenAI-compatible API).
pub struct OpenRouterClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    /// Build a client against `base_url` (e.g. `https://openrouter.ai/api/v1`).
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dailyvocab/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| VocabError::Completion(format!("client build: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build a client from the `[openrouter]` config section.
    ///
    /// Fails when the API key env var is unset.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        Self::new(
            api_key,
            config.openrouter.default_model.clone(),
            &config.openrouter.base_url,
            Duration::from_secs(config.openrouter.timeout_secs),
        )
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextCompletion for OpenRouterClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .header("X-Title", "dailyvocab")
            .json(&body)
            .send()
            .await
            .map_err(|e| VocabError::Completion(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            let snippet: String = text.chars().take(200).collect();
            return Err(VocabError::Completion(format!("HTTP {status}: {snippet}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| VocabError::Completion(format!("invalid response body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| VocabError::Completion("model returned no content".into()))?;

        debug!(reply_len = text.len(), "completion received");
        Ok(text)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
