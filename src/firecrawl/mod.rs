pub mod client;
pub mod error;
pub mod options;
pub mod types;

pub use client::{FirecrawlClient, JobEndpoint, JobKind};
pub use error::FirecrawlError;
pub use options::{
    Action, CrawlOptions, Format, JsonOptions, OptionsError, ScrapeOptions, ScrollDirection,
    SearchOptions,
};
pub use types::{
    JobState, JobStatus, JobSubmission, PageMetadata, ScrapeData, SearchResult,
};
