pub mod cli;
pub mod commands;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod hotkey;
pub mod narration;
pub mod session;
pub mod state;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use error::NarrationError;
pub use session::ReadingSession;

pub fn run() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    tracing::info!("Starting Read From Here v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
    runtime.block_on(cli::execute(cli))
}
