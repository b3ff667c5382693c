//! medscan command-line entry point.

use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medscan::cli::{self, Cli};
use medscan::config::LoggingConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = cli::load_config(&cli).await?;
    init_logging(cli.verbose, &config.logging)?;

    cli::run(cli, config).await
}

/// RUST_LOG wins, then `logging.level`, then the verbosity default.
fn init_logging(verbose: bool, logging: &LoggingConfig) -> anyhow::Result<()> {
    let default_filter = match &logging.level {
        Some(level) => level.clone(),
        None if verbose => "medscan=info".to_string(),
        None => "medscan=warn".to_string(),
    };

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}
