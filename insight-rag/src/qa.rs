//! Question answering with source attribution.
//!
//! [`QaWithSourcesChain`] embeds the question, pulls the closest chunks out
//! of a [`VectorIndex`], stuffs them into a single prompt and asks the
//! language model for an answer that ends with a `SOURCES:` line. The
//! cited sources are checked against what was actually retrieved.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, error, info};

use crate::document::{AnswerResult, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{DEFAULT_TOP_K, VectorIndex};
use crate::llm::LanguageModel;

static SOURCES_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSOURCES?\s*:").expect("sources regex should compile"));

static FOLLOW_UP_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\n\s*QUESTION\s*:").expect("question regex should compile"));

static SOURCE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]+").expect("separator regex should compile"));

const INSTRUCTIONS: &str = "\
You are a news research assistant. Answer the question using only the article \
extracts below. If the extracts do not contain the answer, say that you don't \
know instead of making one up.

Finish your reply with a final line of the form
SOURCES: <source>, <source>
listing the Source value of every extract you used.";

/// Answers questions from an index, citing the URLs it drew from.
pub struct QaWithSourcesChain {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LanguageModel>,
    top_k: usize,
    max_context_chars: Option<usize>,
}

impl QaWithSourcesChain {
    /// Create a chain retrieving [`DEFAULT_TOP_K`] chunks per question.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self { embedding_provider, llm, top_k: DEFAULT_TOP_K, max_context_chars: None }
    }

    /// Set how many chunks are retrieved per question. Zero is treated as one.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Cap the retrieved text placed in the prompt.
    ///
    /// Lowest-ranked extracts are dropped until the rest fit; the best one
    /// is always kept.
    pub fn with_max_context_chars(mut self, limit: Option<usize>) -> Self {
        self.max_context_chars = limit;
        self
    }

    /// Answer `question` from `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingModelMismatch`] if `index` was built
    /// with another embedding model. Embedding, index and language model
    /// failures are returned unchanged; there is no retry.
    pub async fn ask(&self, index: &VectorIndex, question: &str) -> Result<AnswerResult> {
        let configured = self.embedding_provider.model();
        if index.embedding_model() != configured {
            let err = RagError::EmbeddingModelMismatch {
                indexed: index.embedding_model().to_string(),
                configured: configured.to_string(),
            };
            error!(error = %err, "index embedded with another model");
            return Err(err);
        }

        let query_embedding = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;

        let results = index.query(&query_embedding, self.top_k)?;
        let results = self.fit_context(results);
        debug!(retrieved = results.len(), "retrieved extracts");

        let prompt = build_prompt(question, &results);
        let completion = self.llm.generate(&prompt).await.map_err(|e| {
            error!(model = self.llm.name(), error = %e, "generation failed");
            e
        })?;

        if completion.trim().is_empty() {
            return Err(RagError::Generation {
                provider: self.llm.name().to_string(),
                message: "model returned an empty completion".to_string(),
            });
        }

        let answer = parse_completion(&completion, &results);
        info!(sources = answer.sources.len(), "question answered");
        Ok(answer)
    }

    fn fit_context(&self, mut results: Vec<SearchResult>) -> Vec<SearchResult> {
        let Some(limit) = self.max_context_chars else {
            return results;
        };
        let mut total = 0;
        let mut keep = 0;
        for result in &results {
            total += result.chunk.text.chars().count();
            if keep > 0 && total > limit {
                break;
            }
            keep += 1;
        }
        results.truncate(keep);
        results
    }
}

/// Render the stuffed prompt for `question` over the retrieved extracts.
pub fn build_prompt(question: &str, results: &[SearchResult]) -> String {
    let mut prompt = String::from(INSTRUCTIONS);
    prompt.push_str("\n\n=========\n");
    for result in results {
        prompt.push_str("Content: ");
        prompt.push_str(result.chunk.text.trim());
        prompt.push_str("\nSource: ");
        prompt.push_str(&result.chunk.source);
        prompt.push_str("\n\n");
    }
    prompt.push_str("=========\nQUESTION: ");
    prompt.push_str(question);
    prompt.push_str("\nFINAL ANSWER:");
    prompt
}

/// Split a completion into answer text and the sources it cites.
///
/// Only citations that name a retrieved extract's source are kept, in the
/// order cited and without duplicates. A citation of a chunk id
/// (`url#n`) counts as its URL.
pub fn parse_completion(completion: &str, results: &[SearchResult]) -> AnswerResult {
    let (answer, cited) = match SOURCES_MARKER.find(completion) {
        Some(marker) => {
            let tail = &completion[marker.end()..];
            let tail = match FOLLOW_UP_QUESTION.find(tail) {
                Some(follow_up) => &tail[..follow_up.start()],
                None => tail,
            };
            (&completion[..marker.start()], tail)
        }
        None => (completion, ""),
    };

    let mut sources: Vec<String> = Vec::new();
    for token in SOURCE_SEPARATOR.split(cited) {
        let Some(source) = match_source(token, results) else {
            continue;
        };
        if !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
    }

    AnswerResult { answer: answer.trim().to_string(), sources }
}

fn match_source<'a>(token: &str, results: &'a [SearchResult]) -> Option<&'a str> {
    let token = token.trim_matches(|c: char| {
        matches!(c, '[' | ']' | '(' | ')' | '<' | '>' | '"' | '\'' | '.' | ';' | '*' | '`')
    });
    if token.is_empty() {
        return None;
    }
    let token = token.trim_end_matches('/');
    results.iter().map(|r| r.chunk.source.as_str()).find(|source| {
        let source_trimmed = source.trim_end_matches('/');
        token == source_trimmed
            || token.strip_prefix(source_trimmed).is_some_and(|rest| rest.starts_with('#'))
    })
}
