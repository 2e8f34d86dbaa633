//! Construct the embedding provider and language model named by a [`ModelConfig`].

use std::sync::Arc;

use tracing::info;

use crate::config::{ModelConfig, Provider};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

/// The embedding provider and language model for one backend.
pub struct ModelBackends {
    /// Used for both chunk and question embeddings.
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    /// Used to write answers.
    pub llm: Arc<dyn LanguageModel>,
}

/// Build both model clients for `config.provider`.
///
/// # Errors
///
/// Returns [`RagError::Config`] when the config is incomplete, an HTTP client
/// cannot be built, or the crate was compiled without the provider's feature.
pub fn build_backends(config: &ModelConfig) -> Result<ModelBackends> {
    config.validate()?;
    info!(
        provider = %config.provider,
        model = %config.model,
        embedding_model = %config.embedding_model,
        "configuring model backends"
    );
    match config.provider {
        Provider::Ollama => ollama_backends(config),
        Provider::OpenAI => openai_backends(config),
    }
}

#[cfg(feature = "ollama")]
fn ollama_backends(config: &ModelConfig) -> Result<ModelBackends> {
    use crate::ollama::{DEFAULT_OLLAMA_URL, OllamaEmbeddingProvider, OllamaLanguageModel};

    let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
    let embedder = OllamaEmbeddingProvider::new(&config.embedding_model)?
        .with_base_url(base_url)
        .with_timeout(config.timeout)?;
    let llm = OllamaLanguageModel::new(&config.model)?
        .with_base_url(base_url)
        .with_timeout(config.timeout)?;
    Ok(ModelBackends { embedding_provider: Arc::new(embedder), llm: Arc::new(llm) })
}

#[cfg(not(feature = "ollama"))]
fn ollama_backends(_config: &ModelConfig) -> Result<ModelBackends> {
    Err(RagError::Config("built without the `ollama` feature".to_string()))
}

#[cfg(feature = "openai")]
fn openai_backends(config: &ModelConfig) -> Result<ModelBackends> {
    use crate::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};

    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| RagError::Config("OpenAI API key is required".to_string()))?;
    let mut embedder = OpenAIEmbeddingProvider::new(api_key.clone())?
        .with_model(&config.embedding_model)
        .with_timeout(config.timeout)?;
    let mut llm =
        OpenAIChatModel::new(api_key)?.with_model(&config.model).with_timeout(config.timeout)?;
    if let Some(base_url) = &config.base_url {
        embedder = embedder.with_base_url(base_url);
        llm = llm.with_base_url(base_url);
    }
    Ok(ModelBackends { embedding_provider: Arc::new(embedder), llm: Arc::new(llm) })
}

#[cfg(not(feature = "openai"))]
fn openai_backends(_config: &ModelConfig) -> Result<ModelBackends> {
    Err(RagError::Config("built without the `openai` feature".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_without_key_is_rejected() {
        let config = ModelConfig::openai_defaults();
        assert!(matches!(build_backends(&config), Err(RagError::Config(_))));
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn ollama_backends_use_configured_models() {
        let config =
            ModelConfig { embedding_model: "nomic-embed-text".into(), ..Default::default() };
        let backends = build_backends(&config).unwrap();
        assert_eq!(backends.embedding_provider.model(), "nomic-embed-text");
        assert_eq!(backends.llm.name(), "llama3");
    }

    #[cfg(feature = "openai")]
    #[test]
    fn openai_backends_use_configured_models() {
        let config = ModelConfig {
            api_key: Some("sk-test".into()),
            base_url: Some("http://127.0.0.1:9/v1".into()),
            ..ModelConfig::openai_defaults()
        };
        let backends = build_backends(&config).unwrap();
        assert_eq!(backends.embedding_provider.model(), "text-embedding-3-small");
        assert_eq!(backends.llm.name(), "gpt-4o-mini");
    }
}
