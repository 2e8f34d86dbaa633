//! `insight-cli` provides the `insight` binary: one-shot `process` and `ask`
//! commands, an interactive console and a small web front end.

pub mod app;
pub mod cli;
pub mod console;
pub mod server;
pub mod telemetry;

pub use app::{build_pipeline, run};
pub use cli::{Cli, Command};
pub use server::{AppState, ServerConfig, app_router, run_server};
pub use telemetry::{LogFormat, init_tracing};
