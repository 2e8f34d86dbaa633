//! Wiring: turn parsed arguments into a pipeline and run the chosen command.

use std::sync::Arc;

use anyhow::Context;
use insight_rag::{IndexStore, InsightPipeline, WebLoader, build_backends};
use tracing::info;

use crate::cli::{Cli, Command};
use crate::console::{print_answer, print_report, run_console};
use crate::server::{AppState, ServerConfig, run_server};

/// Build the pipeline described by `cli`: web loader, configured model
/// backends and the index file at `--index-path`.
pub fn build_pipeline(cli: &Cli) -> anyhow::Result<InsightPipeline> {
    let rag_config = cli.rag_config().context("invalid pipeline settings")?;
    let model_config = cli.model_config().context("invalid model settings")?;
    let backends = build_backends(&model_config)?;
    let loader = WebLoader::new()?;

    let pipeline = InsightPipeline::builder()
        .config(rag_config)
        .loader(Arc::new(loader))
        .embedding_provider(backends.embedding_provider)
        .llm(backends.llm)
        .store(Arc::new(IndexStore::new(&cli.index_path)))
        .build()?;
    Ok(pipeline)
}

/// Execute the subcommand in `cli`.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&cli)?;
    info!(index_path = %cli.index_path.display(), "pipeline ready");

    match &cli.command {
        Command::Process { urls } => {
            let report = pipeline
                .process_urls_with_progress(urls, |stage| eprintln!("{stage}..."))
                .await?;
            print_report(&report);
        }
        Command::Ask { .. } => {
            let question = cli.question().unwrap_or_default();
            let answer = pipeline.ask(&question).await?;
            print_answer(&answer);
        }
        Command::Console => run_console(&pipeline).await?,
        Command::Serve { host, port } => {
            let config = ServerConfig { host: host.clone(), port: *port };
            run_server(config, AppState::new(pipeline)).await?;
        }
    }
    Ok(())
}
