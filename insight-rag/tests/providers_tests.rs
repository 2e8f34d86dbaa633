//! HTTP-level tests for the web loader and the model backends, run against
//! in-process axum servers.

use axum::{
    Json, Router,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use insight_rag::{DocumentLoader, RagError, WebLoader};
use serde_json::{Value, json};

async fn spawn(app: Router) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    (format!("http://{}", addr), handle)
}

const ARTICLE_HTML: &str = r#"<!doctype html>
<html>
<head><title>Central bank lifts rates</title></head>
<body>
  <nav><a href="/">Home</a> | <a href="/markets">Markets</a></nav>
  <article>
    <h1>Central bank lifts rates</h1>
    <p>The central bank raised interest rates by half a point on Wednesday, its third increase this year,
       citing persistent inflation, a tight labour market, and strong consumer spending.</p>
    <p>Economists had expected the move, although some warned that higher borrowing costs, combined with
       slowing exports, could weigh on growth, investment, and hiring in the coming months.</p>
    <p>Markets reacted calmly, with bond yields edging higher, the currency firming slightly, and stocks
       closing almost unchanged after a volatile morning session.</p>
  </article>
  <footer>Copyright News Example</footer>
</body>
</html>"#;

fn news_site() -> Router {
    Router::new()
        .route("/plain", get(|| async { "Apple's stock rose 5% after strong earnings." }))
        .route(
            "/article",
            get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], ARTICLE_HTML) }),
        )
        .route(
            "/report.pdf",
            get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.4") }),
        )
        .route("/empty", get(|| async { "   \n " }))
        .route("/gone", get(|| async { (StatusCode::NOT_FOUND, "not here") }))
}

#[tokio::test]
async fn plain_text_is_used_verbatim() {
    let (base, handle) = spawn(news_site()).await;
    let loader = WebLoader::new().unwrap();

    let url = format!("{base}/plain");
    let doc = loader.load(&url).await.unwrap();
    assert_eq!(doc.url, url);
    assert_eq!(doc.text, "Apple's stock rose 5% after strong earnings.");

    handle.abort();
}

#[tokio::test]
async fn html_is_reduced_to_article_text() {
    let (base, handle) = spawn(news_site()).await;
    let loader = WebLoader::new().unwrap();

    let doc = loader.load(&format!("{base}/article")).await.unwrap();
    assert!(doc.text.contains("raised interest rates"), "unexpected text: {}", doc.text);
    assert!(!doc.text.contains("<p>"));

    handle.abort();
}

#[tokio::test]
async fn unusable_pages_are_fetch_errors() {
    let (base, handle) = spawn(news_site()).await;
    let loader = WebLoader::new().unwrap();

    for path in ["report.pdf", "empty", "gone"] {
        let url = format!("{base}/{path}");
        let err = loader.load(&url).await.unwrap_err();
        assert!(
            matches!(err, RagError::Fetch { url: ref failed, .. } if *failed == url),
            "unexpected error for {path}: {err}"
        );
    }

    handle.abort();
}

#[cfg(feature = "ollama")]
mod ollama {
    use std::time::Duration;

    use insight_rag::ollama::{OllamaEmbeddingProvider, OllamaLanguageModel};
    use insight_rag::{EmbeddingProvider, LanguageModel};

    use super::*;

    async fn embed(Json(body): Json<Value>) -> impl IntoResponse {
        if body["model"] != "llama3" {
            let error = json!({"error": format!("model '{}' not found", body["model"])});
            return (StatusCode::NOT_FOUND, Json(error));
        }
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .map(|text| vec![text.as_str().unwrap_or_default().len() as f32, 1.0])
                    .collect()
            })
            .unwrap_or_default();
        (StatusCode::OK, Json(json!({"model": "llama3", "embeddings": embeddings})))
    }

    async fn generate(Json(body): Json<Value>) -> Json<Value> {
        assert_eq!(body["stream"], false);
        let prompt = body["prompt"].as_str().unwrap_or_default();
        Json(json!({
            "model": body["model"],
            "response": format!("echo: {prompt}"),
            "done": true
        }))
    }

    fn ollama_server() -> Router {
        Router::new().route("/api/embed", post(embed)).route("/api/generate", post(generate))
    }

    #[tokio::test]
    async fn embeds_batches_in_input_order() {
        let (base, handle) = spawn(ollama_server()).await;
        let provider =
            OllamaEmbeddingProvider::new("llama3").unwrap().with_base_url(format!("{base}/"));

        let vectors = provider.embed_batch(&["a", "abc", "ab"]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 1.0], vec![3.0, 1.0], vec![2.0, 1.0]]);
        assert_eq!(provider.embed("abcd").await.unwrap(), vec![4.0, 1.0]);
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());

        handle.abort();
    }

    #[tokio::test]
    async fn server_errors_carry_ollama_message() {
        let (base, handle) = spawn(ollama_server()).await;
        let provider = OllamaEmbeddingProvider::new("missing").unwrap().with_base_url(base);

        let err = provider.embed("text").await.unwrap_err();
        match err {
            RagError::Embedding { provider, message } => {
                assert_eq!(provider, "Ollama");
                assert!(message.contains("not found"), "unexpected message: {message}");
            }
            other => panic!("unexpected error: {other}"),
        }

        handle.abort();
    }

    #[tokio::test]
    async fn generates_non_streaming_completions() {
        let (base, handle) = spawn(ollama_server()).await;
        let llm =
            OllamaLanguageModel::new("llama3").unwrap().with_base_url(base).with_temperature(0.0);

        assert_eq!(llm.generate("hello").await.unwrap(), "echo: hello");
        assert_eq!(llm.name(), "llama3");

        handle.abort();
    }

    #[tokio::test]
    async fn unreachable_server_is_a_generation_error() {
        let llm = OllamaLanguageModel::new("llama3").unwrap().with_base_url("http://127.0.0.1:9");
        let err = llm.generate("hello").await.unwrap_err();
        assert!(matches!(err, RagError::Generation { .. }));
    }

    #[tokio::test]
    async fn configured_timeout_bounds_each_request() {
        let slow = Router::new().route(
            "/api/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"response": "too late"}))
            }),
        );
        let (base, handle) = spawn(slow).await;
        let llm = OllamaLanguageModel::new("llama3")
            .unwrap()
            .with_base_url(base)
            .with_timeout(Duration::from_millis(200))
            .unwrap();

        let err = llm.generate("hello").await.unwrap_err();
        match err {
            RagError::Generation { message, .. } => {
                assert!(message.starts_with("request failed"), "unexpected message: {message}");
            }
            other => panic!("unexpected error: {other}"),
        }

        handle.abort();
    }
}

#[cfg(feature = "openai")]
mod openai {
    use axum::http::HeaderMap;
    use insight_rag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
    use insight_rag::{EmbeddingProvider, LanguageModel};

    use super::*;

    const API_KEY: &str = "sk-test";

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())
            == Some("Bearer sk-test")
    }

    fn unauthorized() -> (StatusCode, Json<Value>) {
        let error = json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        });
        (StatusCode::UNAUTHORIZED, Json(error))
    }

    async fn embeddings(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        if !authorized(&headers) {
            return unauthorized();
        }
        let mut data: Vec<Value> = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .enumerate()
                    .map(|(index, text)| {
                        let len = text.as_str().unwrap_or_default().len() as f32;
                        json!({"object": "embedding", "index": index, "embedding": [len, 1.0]})
                    })
                    .collect()
            })
            .unwrap_or_default();
        if body["model"] == "truncating-model" {
            data.pop();
        }
        (StatusCode::OK, Json(json!({"object": "list", "model": body["model"], "data": data})))
    }

    async fn chat_completions(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        if !authorized(&headers) {
            return unauthorized();
        }
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["temperature"], 0.0);
        let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
        let content =
            if prompt == "refuse" { Value::Null } else { json!(format!("echo: {prompt}")) };
        let choice = json!({"index": 0, "message": {"role": "assistant", "content": content}});
        (StatusCode::OK, Json(json!({"model": body["model"], "choices": [choice]})))
    }

    fn openai_server() -> Router {
        Router::new()
            .route("/v1/embeddings", post(embeddings))
            .route("/v1/chat/completions", post(chat_completions))
    }

    #[tokio::test]
    async fn embeds_batches_in_input_order() {
        let (base, handle) = spawn(openai_server()).await;
        let provider =
            OpenAIEmbeddingProvider::new(API_KEY).unwrap().with_base_url(format!("{base}/v1/"));

        let vectors = provider.embed_batch(&["a", "abc", "ab"]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 1.0], vec![3.0, 1.0], vec![2.0, 1.0]]);
        assert_eq!(provider.embed("abcd").await.unwrap(), vec![4.0, 1.0]);
        assert_eq!(provider.model(), "text-embedding-3-small");

        handle.abort();
    }

    #[tokio::test]
    async fn short_batches_are_rejected() {
        let (base, handle) = spawn(openai_server()).await;
        let provider = OpenAIEmbeddingProvider::new(API_KEY)
            .unwrap()
            .with_model("truncating-model")
            .with_base_url(format!("{base}/v1"));

        let err = provider.embed_batch(&["a", "b"]).await.unwrap_err();
        match err {
            RagError::Embedding { message, .. } => {
                assert_eq!(message, "requested 2 embeddings, received 1");
            }
            other => panic!("unexpected error: {other}"),
        }

        handle.abort();
    }

    #[tokio::test]
    async fn api_errors_carry_openai_message() {
        let (base, handle) = spawn(openai_server()).await;
        let provider =
            OpenAIEmbeddingProvider::new("sk-wrong").unwrap().with_base_url(format!("{base}/v1"));

        let err = provider.embed("text").await.unwrap_err();
        match err {
            RagError::Embedding { provider, message } => {
                assert_eq!(provider, "OpenAI");
                assert!(message.contains("401"), "unexpected message: {message}");
                assert!(message.contains("Incorrect API key"), "unexpected message: {message}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let llm = OpenAIChatModel::new("sk-wrong").unwrap().with_base_url(format!("{base}/v1"));
        let err = llm.generate("hello").await.unwrap_err();
        assert!(
            matches!(err, RagError::Generation { ref message, .. } if message.contains("API key")),
            "unexpected error: {err}"
        );

        handle.abort();
    }

    #[tokio::test]
    async fn chat_completions_return_message_content() {
        let (base, handle) = spawn(openai_server()).await;
        let llm = OpenAIChatModel::new(API_KEY)
            .unwrap()
            .with_model("gpt-4o")
            .with_base_url(format!("{base}/v1"));

        assert_eq!(llm.generate("hello").await.unwrap(), "echo: hello");
        assert_eq!(llm.name(), "gpt-4o");

        let err = llm.generate("refuse").await.unwrap_err();
        assert!(matches!(err, RagError::Generation { .. }));

        handle.abort();
    }

    #[test]
    fn blank_api_key_is_a_config_error() {
        assert!(matches!(OpenAIEmbeddingProvider::new("  "), Err(RagError::Config(_))));
        assert!(matches!(OpenAIChatModel::new(""), Err(RagError::Config(_))));
    }
}
