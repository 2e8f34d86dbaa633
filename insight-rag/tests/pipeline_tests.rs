//! End-to-end pipeline tests with in-process fakes for the loader and models.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use insight_rag::{
    Document, DocumentLoader, EmbeddingProvider, IndexStore, InsightPipeline, LanguageModel,
    ProcessStage, RagConfig, RagError, Result,
};

const VOCABULARY: &[&str] = &[
    "apple", "stock", "earnings", "rain", "weather", "interest", "rates", "bank", "central",
    "football", "match", "goal",
];

const APPLE_URL: &str = "https://news.example/markets/apple";
const WEATHER_URL: &str = "https://news.example/weather/weekend";
const HIKE_URL: &str = "https://news.example/economy/rate-hike";
const OUTLOOK_URL: &str = "https://news.example/economy/outlook";
const SPORTS_URL: &str = "https://news.example/sports/final";

struct MapLoader(HashMap<String, String>);

impl MapLoader {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self(pages.iter().map(|(url, text)| (url.to_string(), text.to_string())).collect())
    }
}

#[async_trait]
impl DocumentLoader for MapLoader {
    async fn load(&self, url: &str) -> Result<Document> {
        self.0.get(url).map(|text| Document::new(url, text.clone())).ok_or_else(|| {
            RagError::Fetch { url: url.to_string(), message: "connection refused".into() }
        })
    }
}

/// Bag-of-words embedder over a fixed vocabulary, plus a constant bias term.
struct KeywordEmbedder {
    model: &'static str,
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self { model: "keyword-test" }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; VOCABULARY.len() + 1];
        for word in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if let Some(i) = VOCABULARY.iter().position(|v| *v == word) {
                vector[i] += 1.0;
            }
        }
        vector[VOCABULARY.len()] = 1.0;
        Ok(vector)
    }

    fn model(&self) -> &str {
        self.model
    }
}

/// Answers with the best extract and cites the first `cite` sources in the prompt.
struct CitingLlm {
    cite: usize,
    prompts: Mutex<Vec<String>>,
}

impl CitingLlm {
    fn new(cite: usize) -> Self {
        Self { cite, prompts: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl LanguageModel for CitingLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let answer = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Content: "))
            .unwrap_or("I don't know.")
            .to_string();
        let mut cited: Vec<&str> = Vec::new();
        for source in prompt.lines().filter_map(|line| line.strip_prefix("Source: ")) {
            if !cited.contains(&source) && cited.len() < self.cite {
                cited.push(source);
            }
        }
        Ok(format!("{answer}\nSOURCES: {}", cited.join(", ")))
    }

    fn name(&self) -> &str {
        "citing-test"
    }
}

struct Harness {
    pipeline: InsightPipeline,
    llm: Arc<CitingLlm>,
    _dir: tempfile::TempDir,
}

fn harness(pages: &[(&str, &str)], config: RagConfig, cite: usize) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(CitingLlm::new(cite));
    let pipeline = InsightPipeline::builder()
        .config(config)
        .loader(Arc::new(MapLoader::new(pages)))
        .embedding_provider(Arc::new(KeywordEmbedder::default()))
        .llm(llm.clone())
        .store(Arc::new(IndexStore::new(dir.path().join("insight_store.json"))))
        .build()
        .unwrap();
    Harness { pipeline, llm, _dir: dir }
}

fn news_pages() -> Vec<(&'static str, &'static str)> {
    vec![
        (APPLE_URL, "Apple's stock rose 5% after strong earnings."),
        (WEATHER_URL, "Heavy rain expected across the region this weekend."),
    ]
}

#[tokio::test]
async fn answers_from_the_relevant_article_and_cites_it() {
    let h = harness(&news_pages(), RagConfig::default(), 1);

    let report = h.pipeline.process_urls(&[APPLE_URL, WEATHER_URL, ""]).await.unwrap();
    assert_eq!(report.documents, vec![APPLE_URL, WEATHER_URL]);
    assert_eq!(report.chunks, 2);
    assert_eq!(report.dimensions, VOCABULARY.len() + 1);

    let answer = h.pipeline.ask("What happened to Apple's stock?").await.unwrap();
    assert!(answer.answer.contains("5%"), "unexpected answer: {}", answer.answer);
    assert_eq!(answer.sources, vec![APPLE_URL]);
}

#[tokio::test]
async fn top_k_limits_the_extracts_and_the_sources() {
    let pages = [
        (HIKE_URL, "The central bank raised interest rates by half a point."),
        (OUTLOOK_URL, "Interest rates will stay high, economists say."),
        (SPORTS_URL, "The football match ended with a late goal."),
    ];
    let config = RagConfig::builder().top_k(2).build().unwrap();
    let h = harness(&pages, config, usize::MAX);

    h.pipeline.process_urls(&[HIKE_URL, OUTLOOK_URL, SPORTS_URL]).await.unwrap();
    let answer =
        h.pipeline.ask("What did the central bank do with interest rates?").await.unwrap();

    assert_eq!(answer.sources, vec![HIKE_URL, OUTLOOK_URL]);
    let prompts = h.llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(!prompts[0].contains(SPORTS_URL));
}

#[tokio::test]
async fn asking_before_processing_reports_a_missing_index() {
    let h = harness(&news_pages(), RagConfig::default(), 1);

    let err = h.pipeline.ask("Anything new?").await.unwrap_err();
    assert!(matches!(err, RagError::IndexNotFound { .. }), "unexpected error: {err}");
    assert!(h.llm.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn blank_input_is_rejected_without_touching_the_store() {
    let h = harness(&news_pages(), RagConfig::default(), 1);

    let err = h.pipeline.process_urls(&["", "  ", ""]).await.unwrap_err();
    assert!(matches!(err, RagError::Validation(_)));
    assert!(!h.pipeline.store().exists().await);

    let err = h.pipeline.ask("   ").await.unwrap_err();
    assert!(matches!(err, RagError::Validation(_)));
}

#[tokio::test]
async fn reprocessing_the_same_urls_is_idempotent() {
    let h = harness(&news_pages(), RagConfig::default(), 1);

    h.pipeline.process_urls(&[APPLE_URL, WEATHER_URL]).await.unwrap();
    let first = h.pipeline.store().load().await.unwrap();
    let first_answer = h.pipeline.ask("What happened to Apple's stock?").await.unwrap();

    h.pipeline.process_urls(&[APPLE_URL, WEATHER_URL]).await.unwrap();
    let second = h.pipeline.store().load().await.unwrap();
    let second_answer = h.pipeline.ask("What happened to Apple's stock?").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first_answer, second_answer);
}

#[tokio::test]
async fn failed_processing_keeps_the_previous_index() {
    let h = harness(&news_pages(), RagConfig::default(), 1);
    h.pipeline.process_urls(&[APPLE_URL]).await.unwrap();

    let err = h
        .pipeline
        .process_urls(&[WEATHER_URL, "https://news.example/offline"])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Fetch { .. }));

    let index = h.pipeline.store().load().await.unwrap();
    assert_eq!(index.sources(), vec![APPLE_URL]);
}

#[tokio::test]
async fn processing_replaces_rather_than_appends() {
    let h = harness(&news_pages(), RagConfig::default(), 1);
    h.pipeline.process_urls(&[APPLE_URL]).await.unwrap();
    h.pipeline.process_urls(&[WEATHER_URL]).await.unwrap();

    let index = h.pipeline.store().load().await.unwrap();
    assert_eq!(index.sources(), vec![WEATHER_URL]);
}

#[tokio::test]
async fn asking_with_another_embedding_model_requires_reprocessing() {
    let h = harness(&news_pages(), RagConfig::default(), 1);
    h.pipeline.process_urls(&[APPLE_URL]).await.unwrap();

    let llm = Arc::new(CitingLlm::new(1));
    let switched = InsightPipeline::builder()
        .loader(Arc::new(MapLoader::new(&news_pages())))
        .embedding_provider(Arc::new(KeywordEmbedder { model: "keyword-other" }))
        .llm(llm.clone())
        .store(Arc::new(IndexStore::new(h.pipeline.store().path())))
        .build()
        .unwrap();

    let err = switched.ask("What happened to Apple's stock?").await.unwrap_err();
    match &err {
        RagError::EmbeddingModelMismatch { indexed, configured } => {
            assert_eq!(indexed, "keyword-test");
            assert_eq!(configured, "keyword-other");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("process the URLs again"));
    assert!(llm.prompts.lock().unwrap().is_empty());

    switched.process_urls(&[APPLE_URL]).await.unwrap();
    let answer = switched.ask("What happened to Apple's stock?").await.unwrap();
    assert_eq!(answer.sources, vec![APPLE_URL]);
}

#[tokio::test]
async fn progress_stages_are_reported_in_order() {
    let h = harness(&news_pages(), RagConfig::default(), 1);
    let mut stages = Vec::new();

    h.pipeline
        .process_urls_with_progress(&[APPLE_URL], |stage| stages.push(stage))
        .await
        .unwrap();

    assert_eq!(
        stages,
        vec![
            ProcessStage::Loading,
            ProcessStage::Splitting,
            ProcessStage::Embedding,
            ProcessStage::Saving
        ]
    );
}

#[tokio::test]
async fn long_articles_are_chunked_with_traceable_sources() {
    let paragraph = "Apple's stock climbed on earnings. ".repeat(20);
    let long_text = format!("{paragraph}\n\n{paragraph}");
    let pages = [(APPLE_URL, long_text.as_str())];
    let config = RagConfig::builder().chunk_size(400).build().unwrap();
    let h = harness(&pages, config, 1);

    let report = h.pipeline.process_urls(&[APPLE_URL]).await.unwrap();
    assert!(report.chunks >= 2);

    let index = h.pipeline.store().load().await.unwrap();
    for (i, chunk) in index.entries().iter().enumerate() {
        assert_eq!(chunk.source, APPLE_URL);
        assert_eq!(chunk.chunk_index, i);
        assert!(chunk.text.chars().count() <= 400);
    }
}
