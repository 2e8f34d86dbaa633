//! OpenAI embedding provider and chat model using the OpenAI HTTP API.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::DEFAULT_MODEL_TIMEOUT;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

/// The default OpenAI API base.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default chat model used for answers.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

const PROVIDER: &str = "OpenAI";

const SYSTEM_PROMPT: &str = "You answer questions about news articles using only the \
    supplied extracts, and you always finish with a SOURCES line.";

fn check_api_key(api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(RagError::Config("OpenAI API key must not be empty".into()));
    }
    Ok(())
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::Config(format!("failed to build OpenAI HTTP client: {e}")))
}

async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// Uses `reqwest` to call the `/v1/embeddings` endpoint directly.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
/// - `base_url` – any server speaking the OpenAI protocol.
///
/// # Example
///
/// ```rust,ignore
/// use insight_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        check_api_key(&api_key)?;
        Ok(Self {
            client: build_client(DEFAULT_MODEL_TIMEOUT)?,
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
        })
    }

    /// Create a new provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::Config("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use an OpenAI-compatible server instead of the public API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::Embedding {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest { model: &self.model, input: texts.to_vec() };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::Embedding {
                    provider: PROVIDER.into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = PROVIDER, %message, "API error");
            return Err(RagError::Embedding { provider: PROVIDER.into(), message });
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::Embedding {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if embedding_response.data.len() != texts.len() {
            return Err(RagError::Embedding {
                provider: PROVIDER.into(),
                message: format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    embedding_response.data.len()
                ),
            });
        }
        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// A [`LanguageModel`] backed by the OpenAI chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    /// Create a chat model client with the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        check_api_key(&api_key)?;
        Ok(Self {
            client: build_client(DEFAULT_MODEL_TIMEOUT)?,
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: 0.0,
        })
    }

    /// Set the chat model (e.g. `gpt-4o`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use an OpenAI-compatible server instead of the public API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::Generation {
                    provider: PROVIDER.into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = PROVIDER, %message, "API error");
            return Err(RagError::Generation { provider: PROVIDER.into(), message });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::Generation {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        parsed.choices.into_iter().find_map(|choice| choice.message.content).ok_or_else(|| {
            RagError::Generation {
                provider: PROVIDER.into(),
                message: "response contained no message content".into(),
            }
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}
