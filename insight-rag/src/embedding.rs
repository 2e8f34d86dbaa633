//! The embedding backend seam.
//!
//! Chunks are embedded once while processing; each question is embedded
//! again at ask time with the same provider, so both sides of a query land
//! in the same vector space.

use async_trait::async_trait;

use crate::error::Result;

/// Maps text to a fixed-length vector.
///
/// A given `(model, text)` pair must always produce the same vector, or a
/// rebuilt index would rank chunks differently.
///
/// ```rust,ignore
/// use insight_rag::EmbeddingProvider;
/// use insight_rag::ollama::OllamaEmbeddingProvider;
///
/// let embedder = OllamaEmbeddingProvider::new("llama3")?;
/// let question_vector = embedder.embed("What did the central bank do?").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, returning vectors in input order.
    ///
    /// Falls back to one [`embed`](Self::embed) call per text. Backends
    /// with a batch endpoint send everything in one request instead.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Model identifier, stored alongside the vectors in the index file.
    fn model(&self) -> &str;
}
