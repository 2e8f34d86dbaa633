//! Flat nearest-neighbor index with single-file persistence.
//!
//! [`VectorIndex`] keeps every chunk with its embedding and answers queries
//! by exhaustive cosine similarity. The whole index is written to, and read
//! from, one JSON file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// Number of chunks retrieved per question when nothing else is configured.
pub const DEFAULT_TOP_K: usize = 4;

/// Version written into every saved index. Loading any other version fails.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// An in-memory nearest-neighbor index over embedded chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    format_version: u32,
    embedding_model: String,
    dimensions: usize,
    entries: Vec<Chunk>,
}

impl VectorIndex {
    /// Build a fresh index from parallel chunk and vector arrays.
    ///
    /// Each vector is stored as the embedding of the chunk at the same
    /// position; any embedding already on the chunk is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] if the arrays differ in length, are empty,
    /// the vectors do not all share one non-zero dimension, or any component
    /// is NaN or infinite.
    pub fn build(
        embedding_model: impl Into<String>,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(RagError::Index(format!(
                "got {} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        let Some(dimensions) = vectors.first().map(Vec::len) else {
            return Err(RagError::Index("cannot build an index from zero chunks".to_string()));
        };
        if dimensions == 0 {
            return Err(RagError::Index("embedding vectors must not be empty".to_string()));
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for (mut chunk, vector) in chunks.into_iter().zip(vectors) {
            if vector.len() != dimensions {
                return Err(RagError::Index(format!(
                    "chunk '{}' has {} dimensions, expected {dimensions}",
                    chunk.id,
                    vector.len()
                )));
            }
            if !is_finite(&vector) {
                return Err(RagError::Index(format!(
                    "chunk '{}' has a non-finite embedding component",
                    chunk.id
                )));
            }
            chunk.embedding = vector;
            entries.push(chunk);
        }

        Ok(Self {
            format_version: INDEX_FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimensions,
            entries,
        })
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality shared by every stored vector.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The embedding model the vectors came from.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// The stored chunks, in insertion order.
    pub fn entries(&self) -> &[Chunk] {
        &self.entries
    }

    /// Distinct source URLs, in the order they were first indexed.
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for chunk in &self.entries {
            if !sources.contains(&chunk.source.as_str()) {
                sources.push(&chunk.source);
            }
        }
        sources
    }

    /// Return up to `k` chunks closest to `vector`, best first.
    ///
    /// Ties keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] if `vector` has the wrong dimension or a
    /// non-finite component.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if vector.len() != self.dimensions {
            return Err(RagError::Index(format!(
                "query vector has {} dimensions, index has {}",
                vector.len(),
                self.dimensions
            )));
        }
        if !is_finite(vector) {
            return Err(RagError::Index("query vector has a non-finite component".to_string()));
        }

        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|chunk| SearchResult {
                chunk: chunk.clone(),
                score: cosine_similarity(&chunk.embedding, vector),
            })
            .collect();

        // sort_by is stable, so equal scores stay in insertion order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        debug!(k, result_count = scored.len(), "index query");
        Ok(scored)
    }

    /// Write the whole index to `path`, replacing any existing file.
    ///
    /// The index is first written to a temporary file next to `path` and
    /// then renamed over it, so a reader never sees a partial file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let bytes = serde_json::to_vec(self).map_err(io::Error::other)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        info!(path = %path.display(), chunk_count = self.len(), bytes = bytes.len(), "saved index");
        Ok(())
    }

    /// Read an index previously written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotFound`] if there is no file at `path`.
    /// - [`RagError::CorruptIndex`] if the file cannot be decoded or was
    ///   written by an unsupported format version.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RagError::IndexNotFound { path: path.to_path_buf() });
            }
            Err(e) => {
                return Err(RagError::CorruptIndex {
                    path: path.to_path_buf(),
                    message: format!("failed to read: {e}"),
                });
            }
        };

        let index: Self = serde_json::from_slice(&bytes).map_err(|e| RagError::CorruptIndex {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if index.format_version != INDEX_FORMAT_VERSION {
            return Err(RagError::CorruptIndex {
                path: path.to_path_buf(),
                message: format!("unsupported format version {}", index.format_version),
            });
        }
        if index.entries.iter().any(|c| c.embedding.len() != index.dimensions) {
            return Err(RagError::CorruptIndex {
                path: path.to_path_buf(),
                message: "entry dimensions do not match the index header".to_string(),
            });
        }

        debug!(path = %path.display(), chunk_count = index.len(), "loaded index");
        Ok(index)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn is_finite(vector: &[f32]) -> bool {
    vector.iter().all(|v| v.is_finite())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, i: usize, text: &str) -> Chunk {
        Chunk {
            id: format!("{source}#{i}"),
            text: text.to_string(),
            embedding: Vec::new(),
            source: source.to_string(),
            chunk_index: i,
        }
    }

    fn sample() -> VectorIndex {
        VectorIndex::build(
            "test-model",
            vec![
                chunk("https://a", 0, "north"),
                chunk("https://b", 0, "east"),
                chunk("https://a", 1, "north-east"),
            ],
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]],
        )
        .unwrap()
    }

    #[test]
    fn build_rejects_mismatched_input() {
        let err = VectorIndex::build("m", vec![chunk("u", 0, "x")], vec![]).unwrap_err();
        assert!(matches!(err, RagError::Index(_)));

        let err = VectorIndex::build("m", vec![], vec![]).unwrap_err();
        assert!(matches!(err, RagError::Index(_)));

        let err = VectorIndex::build(
            "m",
            vec![chunk("u", 0, "x"), chunk("u", 1, "y")],
            vec![vec![1.0, 0.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, RagError::Index(_)));
    }

    #[test]
    fn build_rejects_non_finite_components() {
        for bad in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            let err = VectorIndex::build(
                "m",
                vec![chunk("u", 0, "x"), chunk("u", 1, "y")],
                vec![vec![1.0, 0.0], vec![bad, 1.0]],
            )
            .unwrap_err();
            assert!(matches!(err, RagError::Index(ref msg) if msg.contains("u#1")), "{err}");
        }
    }

    #[test]
    fn query_rejects_non_finite_vector() {
        let err = sample().query(&[f32::NAN, 1.0], 2).unwrap_err();
        assert!(matches!(err, RagError::Index(_)));
    }

    #[test]
    fn query_orders_by_similarity() {
        let index = sample();
        let results = index.query(&[0.0, 1.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "north");
        assert_eq!(results[1].chunk.text, "north-east");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn query_rejects_wrong_dimension() {
        assert!(matches!(sample().query(&[1.0, 0.0, 0.0], 3), Err(RagError::Index(_))));
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = VectorIndex::build(
            "m",
            vec![chunk("u", 0, "first"), chunk("u", 1, "second")],
            vec![vec![1.0, 0.0], vec![2.0, 0.0]],
        )
        .unwrap();
        let results = index.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].chunk.text, "first");
        assert_eq!(results[1].chunk.text, "second");
    }

    #[test]
    fn sources_are_distinct_in_order() {
        assert_eq!(sample().sources(), vec!["https://a", "https://b"]);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let index = sample();
        index.save(&path).unwrap();
        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.embedding_model(), "test-model");
    }

    #[test]
    fn load_reports_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        assert!(matches!(VectorIndex::load(&path), Err(RagError::IndexNotFound { .. })));

        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(VectorIndex::load(&path), Err(RagError::CorruptIndex { .. })));

        let mut value = serde_json::to_value(sample()).unwrap();
        value["format_version"] = serde_json::json!(99);
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
        assert!(matches!(VectorIndex::load(&path), Err(RagError::CorruptIndex { .. })));
    }
}
