//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use insight_rag::{DEFAULT_INDEX_PATH, ModelConfig, Provider, RagConfig};

use crate::telemetry::LogFormat;

/// Default port for `insight serve`.
pub const DEFAULT_PORT: u16 = 8501;

#[derive(Parser, Debug)]
#[command(
    name = "insight",
    about = "Index a few news articles and ask questions about them, with sources",
    version
)]
pub struct Cli {
    /// File the index is written to and read from
    #[arg(long, global = true, env = "INSIGHT_INDEX_PATH", default_value = DEFAULT_INDEX_PATH)]
    pub index_path: PathBuf,

    /// Model backend: ollama or openai (default: $INSIGHT_PROVIDER, then ollama)
    #[arg(long, global = true, value_parser = parse_provider)]
    pub provider: Option<Provider>,

    /// Completion model (default: $INSIGHT_MODEL, then the provider default)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Embedding model (default: $INSIGHT_EMBEDDING_MODEL, then the provider default)
    #[arg(long, global = true)]
    pub embedding_model: Option<String>,

    /// Base URL of the model server
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Maximum chunk size in characters
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Number of chunks retrieved per question
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Fetch up to three article URLs and rebuild the index from them
    Process {
        /// Article URL; repeat for up to three
        #[arg(long = "url", required = true)]
        urls: Vec<String>,
    },

    /// Ask a question about the processed articles
    Ask {
        /// The question; several words may be passed unquoted
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Interactive session: set URLs, process them and ask questions
    Console,

    /// Serve the web form and JSON API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

fn parse_provider(value: &str) -> Result<Provider, String> {
    value.parse().map_err(|e: insight_rag::RagError| e.to_string())
}

impl Cli {
    /// Pipeline parameters, with flags overriding the defaults.
    pub fn rag_config(&self) -> insight_rag::Result<RagConfig> {
        let mut builder = RagConfig::builder();
        if let Some(chunk_size) = self.chunk_size {
            builder = builder.chunk_size(chunk_size);
        }
        if let Some(top_k) = self.top_k {
            builder = builder.top_k(top_k);
        }
        builder.build()
    }

    /// Model settings from the process environment, with flags taking precedence.
    pub fn model_config(&self) -> insight_rag::Result<ModelConfig> {
        self.model_config_with(|key| std::env::var(key).ok())
    }

    /// Same as [`model_config`](Self::model_config) with an explicit variable source.
    pub fn model_config_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> insight_rag::Result<ModelConfig> {
        ModelConfig::from_lookup(|key| {
            let flag = match key {
                "INSIGHT_PROVIDER" => self.provider.map(|p| p.to_string()),
                "INSIGHT_MODEL" => self.model.clone(),
                "INSIGHT_EMBEDDING_MODEL" => self.embedding_model.clone(),
                "OLLAMA_HOST" | "OPENAI_BASE_URL" => self.base_url.clone(),
                _ => None,
            };
            flag.or_else(|| env(key))
        })
    }

    /// The question passed to `ask`, words joined by spaces.
    pub fn question(&self) -> Option<String> {
        match &self.command {
            Command::Ask { question } => Some(question.join(" ")),
            _ => None,
        }
    }
}
