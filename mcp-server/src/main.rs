use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use lotto_mcp::connection::shared_service;
use lotto_mcp::mcp_handler::{MCPHandler, stdio};
use lotto_mcp::use_cases::{DrawUseCase, GeneratorUseCase, HistoryUseCase};

#[tokio::main]
async fn main() -> Result<()> {
    let config = lotto645::config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!(db = %config.database_url, "Let's roll some lotto numbers.");

    let service = shared_service(&config)?;

    let generator_use_case = GeneratorUseCase::new(Arc::clone(&service));
    let history_use_case = HistoryUseCase::new(Arc::clone(&service));
    let draw_use_case = DrawUseCase::new(service);

    let handler = MCPHandler::new(
        Arc::new(generator_use_case),
        Arc::new(history_use_case),
        Arc::new(draw_use_case),
    );

    let (reader, writer) = stdio();

    handler.serve(reader, writer).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    Ok(())
}
