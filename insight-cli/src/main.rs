use clap::Parser;
use insight_cli::{Cli, init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    run(cli).await
}
