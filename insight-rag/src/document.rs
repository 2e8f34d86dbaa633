//! Data types for documents, chunks, search results and answers.

use serde::{Deserialize, Serialize};

/// A fetched article: the URL it came from and its extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document. Loaders use the URL.
    pub id: String,
    /// The URL the text was loaded from.
    pub url: String,
    /// Page title, when the loader could extract one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The extracted text content.
    pub text: String,
}

impl Document {
    /// Create a document whose id is its URL.
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        let url = url.into();
        Self { id: url.clone(), url, title: None, text: text.into() }
    }

    /// Attach a page title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A bounded segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{source}#{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until embedded.
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// URL of the parent document, used for source attribution.
    pub source: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The cosine similarity score (higher is more relevant).
    pub score: f32,
}

/// The answer to a single question and the URLs it was drawn from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnswerResult {
    /// Free-text answer produced by the language model.
    pub answer: String,
    /// Source URLs, deduplicated, in the order the model cited them.
    pub sources: Vec<String>,
}

impl AnswerResult {
    /// Sources joined one per line, the way they are displayed.
    pub fn sources_text(&self) -> String {
        self.sources.join("\n")
    }
}
