//! Language model trait used by the answering chain.

use async_trait::async_trait;

use crate::error::Result;

/// A text-completion backend.
///
/// The answering chain hands it one fully rendered prompt and expects the
/// raw completion back; parsing the answer and sources is the chain's job.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logs.
    fn name(&self) -> &str;
}
