//! Typed client for the Firecrawl API and a waiter for its asynchronous
//! batch-scrape and crawl jobs.
//!
//! ```no_run
//! use firecrawl_skills::firecrawl::{CrawlOptions, FirecrawlClient};
//! use firecrawl_skills::waiter::{JobWaiter, LogProgress};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FirecrawlClient::new("fc-...".to_string())?;
//! let outcome = client
//!     .crawl_and_wait(
//!         "https://docs.example.com",
//!         &CrawlOptions::default(),
//!         &JobWaiter::default(),
//!         &LogProgress,
//!     )
//!     .await?;
//! println!("{}", outcome.state());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod firecrawl;
pub mod schemas;
pub mod ui;
pub mod waiter;
