//! Pipeline orchestrator.
//!
//! The [`InsightPipeline`] coordinates the two operator actions:
//! processing URLs (load → split → embed → build → save) and asking a
//! question (load index → answering chain).
//!
//! # Example
//!
//! ```rust,ignore
//! use insight_rag::{InsightPipeline, RagConfig, IndexStore, WebLoader};
//!
//! let pipeline = InsightPipeline::builder()
//!     .config(RagConfig::default())
//!     .loader(Arc::new(WebLoader::new()?))
//!     .embedding_provider(Arc::new(embedder))
//!     .llm(Arc::new(llm))
//!     .store(Arc::new(IndexStore::new("insight_store.json")))
//!     .build()?;
//!
//! pipeline.process_urls(&["https://news.example/story"]).await?;
//! let answer = pipeline.ask("What happened?").await?;
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveCharacterSplitter};
use crate::config::RagConfig;
use crate::document::{AnswerResult, Chunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::input::{collect_urls, validate_question};
use crate::llm::LanguageModel;
use crate::loader::DocumentLoader;
use crate::qa::QaWithSourcesChain;
use crate::store::IndexStore;

/// Progress markers emitted while URLs are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStage {
    /// Fetching the pages.
    Loading,
    /// Splitting page text into chunks.
    Splitting,
    /// Computing chunk embeddings.
    Embedding,
    /// Building and writing the index.
    Saving,
}

impl fmt::Display for ProcessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Loading => "Data loading started",
            Self::Splitting => "Text splitting started",
            Self::Embedding => "Embedding vectors started",
            Self::Saving => "Saving index",
        };
        f.write_str(label)
    }
}

/// Summary of a successful processing action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessReport {
    /// URLs that were loaded, in order.
    pub documents: Vec<String>,
    /// Number of chunks stored in the index.
    pub chunks: usize,
    /// Embedding dimensionality.
    pub dimensions: usize,
    /// Where the index was written.
    pub index_path: PathBuf,
}

/// The pipeline orchestrator.
///
/// Construct one via [`InsightPipeline::builder()`].
pub struct InsightPipeline {
    config: RagConfig,
    loader: Arc<dyn DocumentLoader>,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    store: Arc<IndexStore>,
    chain: QaWithSourcesChain,
}

impl InsightPipeline {
    /// Create a new [`InsightPipelineBuilder`].
    pub fn builder() -> InsightPipelineBuilder {
        InsightPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the index store.
    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    /// Process the operator's URL fields and replace the stored index.
    ///
    /// # Errors
    ///
    /// Input errors are reported before anything is fetched. Any fetch,
    /// embedding or storage failure aborts the action and leaves the
    /// previous index untouched.
    pub async fn process_urls<S: AsRef<str>>(&self, fields: &[S]) -> Result<ProcessReport> {
        self.process_urls_with_progress(fields, |_| {}).await
    }

    /// Like [`process_urls`](Self::process_urls), reporting each stage to `on_stage`.
    pub async fn process_urls_with_progress<S, F>(
        &self,
        fields: &[S],
        mut on_stage: F,
    ) -> Result<ProcessReport>
    where
        S: AsRef<str>,
        F: FnMut(ProcessStage) + Send,
    {
        let urls = collect_urls(fields)?;

        // 1. Load
        on_stage(ProcessStage::Loading);
        info!(url_count = urls.len(), "loading documents");
        let documents = self.loader.load_all(&urls).await.map_err(|e| {
            error!(error = %e, "loading failed");
            e
        })?;

        // 2. Split
        on_stage(ProcessStage::Splitting);
        let mut chunks: Vec<Chunk> = Vec::new();
        for document in &documents {
            let produced = self.chunker.chunk(document);
            let before = produced.len();
            let kept: Vec<Chunk> =
                produced.into_iter().filter(|c| !c.text.trim().is_empty()).collect();
            if kept.is_empty() {
                return Err(RagError::Fetch {
                    url: document.url.clone(),
                    message: "document produced no text chunks".to_string(),
                });
            }
            if kept.len() < before {
                let dropped = before - kept.len();
                warn!(document.id = %document.id, dropped, "dropped blank chunks");
            }
            info!(document.id = %document.id, chunk_count = kept.len(), "split document");
            chunks.extend(kept);
        }

        // 3. Embed
        on_stage(ProcessStage::Embedding);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(error = %e, "embedding failed during processing");
            e
        })?;

        // 4. Build and save
        on_stage(ProcessStage::Saving);
        let index = VectorIndex::build(self.embedding_provider.model(), chunks, vectors)?;
        self.store.replace(&index).await.map_err(|e| {
            error!(error = %e, "failed to persist index");
            e
        })?;

        let report = ProcessReport {
            documents: urls,
            chunks: index.len(),
            dimensions: index.dimensions(),
            index_path: self.store.path().to_path_buf(),
        };
        info!(
            documents = report.documents.len(),
            chunks = report.chunks,
            dimensions = report.dimensions,
            "processing completed"
        );
        Ok(report)
    }

    /// Answer a question from the stored index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexNotFound`] when no URLs have been processed
    /// yet, [`RagError::CorruptIndex`] when the stored index cannot be read,
    /// and passes through embedding and generation failures.
    pub async fn ask(&self, question: &str) -> Result<AnswerResult> {
        let question = validate_question(question)?;
        let index = self.store.load().await.map_err(|e| {
            match &e {
                RagError::IndexNotFound { .. } => warn!(error = %e, "asked before processing"),
                _ => error!(error = %e, "failed to load index"),
            }
            e
        })?;
        self.chain.ask(&index, question).await
    }
}

/// Builder for constructing an [`InsightPipeline`].
///
/// `loader`, `embedding_provider` and `llm` are required. The config
/// defaults to [`RagConfig::default`], the chunker to a
/// [`RecursiveCharacterSplitter`] sized from the config, and the store to
/// [`IndexStore::default`].
#[derive(Default)]
pub struct InsightPipelineBuilder {
    config: Option<RagConfig>,
    loader: Option<Arc<dyn DocumentLoader>>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    llm: Option<Arc<dyn LanguageModel>>,
    store: Option<Arc<IndexStore>>,
}

impl InsightPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document loader.
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the language model used to answer questions.
    pub fn llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the index store.
    pub fn store(mut self, store: Arc<IndexStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the [`InsightPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing.
    pub fn build(self) -> Result<InsightPipeline> {
        let config = self.config.unwrap_or_default();
        let loader =
            self.loader.ok_or_else(|| RagError::Config("loader is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let llm = self.llm.ok_or_else(|| RagError::Config("llm is required".to_string()))?;
        let chunker = self
            .chunker
            .unwrap_or_else(|| Arc::new(RecursiveCharacterSplitter::new(config.chunk_size)));
        let store = self.store.unwrap_or_default();

        let chain = QaWithSourcesChain::new(embedding_provider.clone(), llm)
            .with_top_k(config.top_k)
            .with_max_context_chars(config.max_context_chars);

        Ok(InsightPipeline { config, loader, chunker, embedding_provider, store, chain })
    }
}
