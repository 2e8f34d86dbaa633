//! Document chunking.
//!
//! [`RecursiveCharacterSplitter`] breaks article text into chunks of at most
//! `chunk_size` characters, preferring paragraph breaks, then line breaks,
//! then sentence ends, then commas. Chunks never overlap and, concatenated
//! in order, reproduce the input text exactly.

use crate::document::{Chunk, Document};

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Separators tried in order, coarsest first.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", ","];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and source but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically by a list of separators.
///
/// The first separator that occurs in the text is used to cut it into
/// pieces, each keeping its trailing separator. Consecutive pieces are
/// merged while they fit in `chunk_size`; a piece that is too long on its
/// own is split again with the remaining separators, and hard-cut once none
/// are left.
///
/// # Example
///
/// ```rust
/// use insight_rag::RecursiveCharacterSplitter;
///
/// let splitter = RecursiveCharacterSplitter::new(20);
/// let chunks = splitter.split_text("First paragraph.\n\nSecond one here.");
/// assert_eq!(chunks, vec!["First paragraph.\n\n", "Second one here."]);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    separators: Vec<String>,
}

impl Default for RecursiveCharacterSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default separators.
    ///
    /// A `chunk_size` of zero is treated as one.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the separator list. Empty separators are ignored.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators =
            separators.into_iter().map(Into::into).filter(|s: &String| !s.is_empty()).collect();
        self
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        let Some(position) = separators.iter().position(|sep| text.contains(sep)) else {
            return hard_cut(text, self.chunk_size);
        };
        let separator = separators[position];
        let remaining = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for piece in split_keeping_separator(text, separator) {
            let piece_len = char_len(piece);
            if piece_len > self.chunk_size {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                chunks.extend(self.split_recursive(piece, remaining));
                continue;
            }
            if current_len + piece_len > self.chunk_size {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push_str(piece);
            current_len += piece_len;
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

impl Chunker for RecursiveCharacterSplitter {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                id: format!("{}#{i}", document.url),
                text,
                embedding: Vec::new(),
                source: document.url.clone(),
                chunk_index: i,
            })
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Cut text every `chunk_size` characters, respecting char boundaries.
fn hard_cut(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == chunk_size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
