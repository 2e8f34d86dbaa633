//! Ollama embedding provider and language model over Ollama's HTTP API.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::DEFAULT_MODEL_TIMEOUT;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

/// The default Ollama server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const PROVIDER: &str = "Ollama";

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::Config(format!("failed to build Ollama HTTP client: {e}")))
}

fn normalize_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

/// Turn a failed response into a readable message, preferring Ollama's `error` field.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use insight_rag::ollama::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new("llama3")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for `model` on the default local server.
    pub fn new(model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_MODEL_TIMEOUT)?,
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.into(),
        })
    }

    /// Point the provider at another Ollama server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url);
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
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
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

        let request_body = EmbedRequest { model: &self.model, input: texts.to_vec() };
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
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

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::Embedding {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(RagError::Embedding {
                provider: PROVIDER.into(),
                message: format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            });
        }
        Ok(parsed.embeddings)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// A [`LanguageModel`] backed by Ollama's `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaLanguageModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OllamaLanguageModel {
    /// Create a model client for `model` on the default local server.
    pub fn new(model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_MODEL_TIMEOUT)?,
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.into(),
            temperature: None,
        })
    }

    /// Point the client at another Ollama server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url);
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

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl LanguageModel for OllamaLanguageModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.temperature.map(|temperature| GenerateOptions { temperature }),
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request_body)
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

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::Generation {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;
        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
