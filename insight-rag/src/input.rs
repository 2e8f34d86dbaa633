//! Validation of operator input: the URL fields and the question.

use url::Url;

use crate::error::{RagError, Result};

/// Number of URL fields offered to the operator.
pub const MAX_URL_FIELDS: usize = 3;

/// Turn raw URL fields into the list of URLs to process.
///
/// Blank fields are skipped, so filling one or two of the three fields is
/// fine. Every non-blank field must be an absolute `http` or `https` URL.
/// Duplicates are dropped, keeping the first occurrence.
///
/// # Errors
///
/// - [`RagError::Validation`] if more than [`MAX_URL_FIELDS`] fields are
///   given or every field is blank.
/// - [`RagError::InvalidUrl`] for the first field that does not parse.
pub fn collect_urls<S: AsRef<str>>(fields: &[S]) -> Result<Vec<String>> {
    if fields.len() > MAX_URL_FIELDS {
        return Err(RagError::Validation(format!(
            "at most {MAX_URL_FIELDS} URLs can be processed at once, got {}",
            fields.len()
        )));
    }

    let mut urls: Vec<String> = Vec::with_capacity(fields.len());
    for field in fields {
        let raw = field.as_ref().trim();
        if raw.is_empty() {
            continue;
        }
        let url = parse_http_url(raw)?;
        if !urls.contains(&url) {
            urls.push(url);
        }
    }

    if urls.is_empty() {
        return Err(RagError::Validation("at least one URL is required".to_string()));
    }
    Ok(urls)
}

fn parse_http_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw)
        .map_err(|e| RagError::InvalidUrl { url: raw.to_string(), reason: e.to_string() })?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(RagError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            });
        }
    }
    if parsed.host_str().is_none() {
        return Err(RagError::InvalidUrl { url: raw.to_string(), reason: "missing host".into() });
    }
    Ok(parsed.to_string())
}

/// Trim a question and reject it if nothing is left.
pub fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(RagError::Validation("question must not be empty".to_string()));
    }
    Ok(trimmed)
}
