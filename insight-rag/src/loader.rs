//! Fetching article text from URLs.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, info};
use url::Url;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Loads the text behind a URL.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Fetch one URL and return its text as a [`Document`].
    async fn load(&self, url: &str) -> Result<Document>;

    /// Fetch every URL in order.
    ///
    /// Stops at the first failure; no partial result is returned.
    async fn load_all(&self, urls: &[String]) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(urls.len());
        for url in urls {
            documents.push(self.load(url).await?);
        }
        Ok(documents)
    }
}

/// Default timeout for fetching a single page.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("insight-owl/", env!("CARGO_PKG_VERSION"));

/// A [`DocumentLoader`] that fetches pages over HTTP.
///
/// HTML pages are reduced to their main article text; plain-text
/// responses are used as-is. Anything else is rejected.
#[derive(Debug, Clone)]
pub struct WebLoader {
    client: reqwest::Client,
}

impl WebLoader {
    /// Create a loader with the default timeout and user agent.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a loader with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentLoader for WebLoader {
    async fn load(&self, url: &str) -> Result<Document> {
        let fetch_error = |message: String| RagError::Fetch { url: url.to_string(), message };

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(url, error = %e, "request failed");
            fetch_error(format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(url, %status, "unexpected status");
            return Err(fetch_error(format!("server returned {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let final_url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(format!("failed to read response body: {e}")))?;

        debug!(url, content_type = %content_type, bytes = body.len(), "fetched page");

        let (title, text) = if content_type.contains("text/html")
            || content_type.contains("application/xhtml")
        {
            extract_article(&body, &final_url).map_err(fetch_error)?
        } else if content_type.starts_with("text/plain") {
            (None, String::from_utf8_lossy(&body).into_owned())
        } else {
            return Err(fetch_error(format!("unsupported content type '{content_type}'")));
        };

        if text.trim().is_empty() {
            return Err(fetch_error("no text content".to_string()));
        }

        info!(url, chars = text.chars().count(), "loaded document");
        let document = Document::new(url, text);
        Ok(match title {
            Some(title) => document.with_title(title),
            None => document,
        })
    }
}

/// Pull the main article text and title out of an HTML body.
fn extract_article(
    body: &[u8],
    url: &Url,
) -> std::result::Result<(Option<String>, String), String> {
    let mut cursor = Cursor::new(body);
    let product = readability::extractor::extract(&mut cursor, url)
        .map_err(|e| format!("failed to extract article content: {e}"))?;
    let title = Some(product.title.trim().to_string()).filter(|t| !t.is_empty());
    Ok((title, product.text))
}
