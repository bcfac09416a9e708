use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use firecrawl_skills::cli::Cli;
use firecrawl_skills::commands;
use firecrawl_skills::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::load().context("loading firecrawl.toml")?,
    };

    commands::run(cli, config).await
}

/// `RUST_LOG` wins over `-v` when set.
fn setup_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("firecrawl_skills=info,warn"),
        2 => EnvFilter::new("firecrawl_skills=debug,info"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
