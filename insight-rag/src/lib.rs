//! # insight-rag
//!
//! Retrieval-augmented question answering over a handful of news articles.
//!
//! ## Overview
//!
//! The crate covers the whole research flow:
//!
//! - [`collect_urls`] - validate up to three operator-supplied URLs
//! - [`WebLoader`] - fetch pages and extract the article text
//! - [`RecursiveCharacterSplitter`] - split text into chunks of at most 1000 characters
//! - [`EmbeddingProvider`] - turn chunks and questions into vectors
//! - [`VectorIndex`] / [`IndexStore`] - a flat cosine index persisted as one file
//! - [`QaWithSourcesChain`] - answer from the closest chunks and cite their URLs
//!
//! [`InsightPipeline`] ties these together behind two calls,
//! [`process_urls`](InsightPipeline::process_urls) and
//! [`ask`](InsightPipeline::ask).
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` (default) | [`ollama::OllamaEmbeddingProvider`] and [`ollama::OllamaLanguageModel`] |
//! | `openai` | [`openai::OpenAIEmbeddingProvider`] and [`openai::OpenAIChatModel`] |
//! | `full` | Both backends |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use insight_rag::{InsightPipeline, ModelConfig, WebLoader, build_backends};
//! use std::sync::Arc;
//!
//! let backends = build_backends(&ModelConfig::from_env()?)?;
//! let pipeline = InsightPipeline::builder()
//!     .loader(Arc::new(WebLoader::new()?))
//!     .embedding_provider(backends.embedding_provider)
//!     .llm(backends.llm)
//!     .build()?;
//!
//! pipeline.process_urls(&["https://news.example/markets/apple"]).await?;
//! let answer = pipeline.ask("What did Apple's stock do?").await?;
//! println!("{}\nSources: {}", answer.answer, answer.sources_text());
//! ```

pub mod backend;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod input;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod qa;
pub mod store;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use backend::{ModelBackends, build_backends};
pub use chunking::{Chunker, DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATORS, RecursiveCharacterSplitter};
pub use config::{
    DEFAULT_MODEL, DEFAULT_MODEL_TIMEOUT, ModelConfig, Provider, RagConfig, RagConfigBuilder,
};
pub use document::{AnswerResult, Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::{DEFAULT_TOP_K, INDEX_FORMAT_VERSION, VectorIndex};
pub use input::{MAX_URL_FIELDS, collect_urls, validate_question};
pub use llm::LanguageModel;
pub use loader::{DEFAULT_FETCH_TIMEOUT, DocumentLoader, WebLoader};
pub use pipeline::{InsightPipeline, InsightPipelineBuilder, ProcessReport, ProcessStage};
pub use qa::QaWithSourcesChain;
pub use store::{DEFAULT_INDEX_PATH, IndexStore};
