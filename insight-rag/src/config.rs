//! Configuration for the pipeline and its model backends.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::DEFAULT_CHUNK_SIZE;
use crate::error::{RagError, Result};
use crate::index::DEFAULT_TOP_K;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Optional cap on the characters of retrieved text stuffed into the prompt.
    pub max_context_chars: Option<usize>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, top_k: DEFAULT_TOP_K, max_context_chars: None }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Cap the retrieved context stuffed into the prompt.
    pub fn max_context_chars(mut self, limit: usize) -> Self {
        self.config.max_context_chars = Some(limit);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0`
    /// - `top_k == 0`
    /// - `max_context_chars == Some(0)`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.config.max_context_chars == Some(0) {
            return Err(RagError::Config(
                "max_context_chars must be greater than zero when set".to_string(),
            ));
        }
        Ok(self.config)
    }
}

/// Which backend serves embeddings and completions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// A local or remote Ollama server.
    #[default]
    Ollama,
    /// The OpenAI API, or any server speaking its protocol.
    OpenAI,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => f.write_str("ollama"),
            Self::OpenAI => f.write_str("openai"),
        }
    }
}

impl FromStr for Provider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            other => Err(RagError::Config(format!(
                "unsupported provider '{other}'; use ollama or openai"
            ))),
        }
    }
}

/// Model selection and credentials for the embedding and completion backends.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Backend serving both models.
    pub provider: Provider,
    /// Completion model.
    pub model: String,
    /// Embedding model.
    pub embedding_model: String,
    /// Override for the backend base URL.
    pub base_url: Option<String>,
    /// API key, required by OpenAI.
    pub api_key: Option<String>,
    /// Per-request timeout for model calls.
    pub timeout: Duration,
}

/// Default model for both completions and embeddings.
pub const DEFAULT_MODEL: &str = "llama3";

/// Default timeout for a single model request.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_MODEL.to_string(),
            base_url: None,
            api_key: None,
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }
}

impl ModelConfig {
    /// Read model settings from the environment.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `INSIGHT_PROVIDER` | `ollama` (default) or `openai` |
    /// | `INSIGHT_MODEL` | completion model |
    /// | `INSIGHT_EMBEDDING_MODEL` | embedding model |
    /// | `OLLAMA_HOST` / `OPENAI_BASE_URL` | base URL for the chosen provider |
    /// | `OPENAI_API_KEY` | OpenAI credential |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = match lookup("INSIGHT_PROVIDER") {
            Some(value) => value.parse()?,
            None => Provider::default(),
        };
        let defaults = match provider {
            Provider::Ollama => Self::default(),
            Provider::OpenAI => Self::openai_defaults(),
        };
        let base_url = match provider {
            Provider::Ollama => lookup("OLLAMA_HOST"),
            Provider::OpenAI => lookup("OPENAI_BASE_URL"),
        };
        let api_key = match provider {
            Provider::Ollama => None,
            Provider::OpenAI => lookup("OPENAI_API_KEY"),
        };

        Ok(Self {
            provider,
            model: lookup("INSIGHT_MODEL").unwrap_or(defaults.model),
            embedding_model: lookup("INSIGHT_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            base_url: base_url.filter(|s| !s.trim().is_empty()),
            api_key: api_key.filter(|s| !s.trim().is_empty()),
            timeout: defaults.timeout,
        })
    }

    /// Defaults used when the OpenAI provider is selected.
    pub fn openai_defaults() -> Self {
        Self {
            provider: Provider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            ..Self::default()
        }
    }

    /// Check that the selected provider has what it needs.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() || self.embedding_model.trim().is_empty() {
            return Err(RagError::Config("model names must not be empty".to_string()));
        }
        if self.provider == Provider::OpenAI && self.api_key.is_none() {
            return Err(RagError::Config(
                "OPENAI_API_KEY must be set for the openai provider".to_string(),
            ));
        }
        Ok(())
    }
}
