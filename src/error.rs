use thiserror::Error;

use crate::firecrawl::FirecrawlError;
use crate::waiter::WaitError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("FIRECRAWL_API_KEY is not set. Export it or add `api_key` to firecrawl.toml.")]
    MissingApiKey,

    #[error("Firecrawl error: {0}")]
    Firecrawl(#[from] FirecrawlError),

    #[error("Wait error: {0}")]
    Wait(#[from] WaitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
