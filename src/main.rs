use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use servicemap::cli::Cli;
use servicemap::core::Engine;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting servicemap v{}", env!("CARGO_PKG_VERSION"));

    // Create the core engine with configuration
    let engine = Engine::new(cli.config.as_deref()).await?;

    // Execute the requested command
    cli.execute(engine).await
}
