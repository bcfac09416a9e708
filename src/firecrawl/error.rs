//! Error types for the Firecrawl API client.
//!
//! [`FirecrawlError`] covers rate limiting, HTTP errors, network failures,
//! undecodable bodies and requests rejected locally by option validation.
//! Any of these, returned from a status check, means the status is unavailable.

use thiserror::Error;

use super::options::OptionsError;

/// Errors that can occur while talking to the Firecrawl API.
#[derive(Debug, Error)]
pub enum FirecrawlError {
    /// The server returned HTTP 429.
    /// `retry_after_ms` comes from the `Retry-After` header when present.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Any other non-2xx response (401 bad key, 404 unknown job, 5xx).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Underlying transport failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The body could not be decoded into the expected shape.
    #[error("failed to parse API response: {0}")]
    ParseError(String),

    /// A 2xx response carrying `"success": false`.
    #[error("request was not successful: {0}")]
    Unsuccessful(String),

    /// The request options failed validation and nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] OptionsError),
}
