//! Command line interface built on clap.
//!
//! [`Cli`] carries the global flags (`--config`, `-v`) and one [`Command`].
//! Commands that wait on a job share [`WaitArgs`]; commands that produce
//! data share [`OutputArgs`].

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;

use crate::firecrawl::{Format, JobKind};
use crate::schemas;

/// Scrape, crawl and search the web through the Firecrawl API.
#[derive(Debug, Parser)]
#[command(name = "firecrawl-skills", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file (defaults to ./firecrawl.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More output; repeat for debug logs.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape a single page.
    Scrape {
        url: String,

        /// Output formats; repeatable.
        #[arg(long = "format", short, value_enum, default_values_t = [FormatArg::Markdown])]
        formats: Vec<FormatArg>,

        /// Keep only the main content of the page.
        #[arg(long)]
        only_main_content: bool,

        /// Tags to keep; repeatable.
        #[arg(long = "include-tag")]
        include_tags: Vec<String>,

        /// Tags to strip; repeatable.
        #[arg(long = "exclude-tag")]
        exclude_tags: Vec<String>,

        /// Milliseconds to let the page render before capture.
        #[arg(long)]
        wait_for: Option<u64>,

        /// Selectors to click before capture; repeatable.
        #[arg(long = "click")]
        clicks: Vec<String>,

        /// Selector that must appear before capture.
        #[arg(long)]
        wait_for_selector: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Extract structured data from a page with an LLM.
    Extract {
        url: String,

        /// Built-in schema to extract against.
        #[arg(long, value_enum)]
        schema: Option<SchemaArg>,

        /// What to extract. Required without --schema.
        #[arg(long, required_unless_present = "schema")]
        prompt: Option<String>,

        #[arg(long)]
        system_prompt: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Crawl a site starting from a URL.
    Crawl {
        url: String,

        /// Maximum number of pages.
        #[arg(long, default_value_t = 100)]
        limit: u32,

        #[arg(long)]
        max_depth: Option<u32>,

        /// Path patterns to follow; repeatable.
        #[arg(long = "include-path")]
        include_paths: Vec<String>,

        /// Path patterns to skip; repeatable.
        #[arg(long = "exclude-path")]
        exclude_paths: Vec<String>,

        #[arg(long)]
        allow_external_links: bool,

        /// Output formats for every crawled page; repeatable.
        #[arg(long = "format", short, value_enum, default_values_t = [FormatArg::Markdown])]
        formats: Vec<FormatArg>,

        /// Submit only; print the job id without waiting.
        #[arg(long)]
        no_wait: bool,

        #[command(flatten)]
        wait: WaitArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Scrape many pages as one asynchronous job.
    Batch {
        #[arg(required = true)]
        urls: Vec<String>,

        #[arg(long = "format", short, value_enum, default_values_t = [FormatArg::Markdown])]
        formats: Vec<FormatArg>,

        /// Submit only; print the job id without waiting.
        #[arg(long)]
        no_wait: bool,

        #[command(flatten)]
        wait: WaitArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the current status of a batch or crawl job.
    Status {
        job_id: String,

        #[arg(long, value_enum, default_value_t = KindArg::Crawl)]
        kind: KindArg,
    },

    /// Wait for a previously submitted job to finish.
    Wait {
        job_id: String,

        #[arg(long, value_enum, default_value_t = KindArg::Crawl)]
        kind: KindArg,

        #[command(flatten)]
        wait: WaitArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Search the web.
    Search {
        query: String,

        #[arg(long, default_value_t = 5)]
        limit: u32,

        /// Also scrape each hit as markdown.
        #[arg(long)]
        scrape: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print usage examples.
    Examples,
}

/// Overrides for the waiter settings from the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct WaitArgs {
    /// Seconds between status checks.
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Seconds to wait before giving up.
    #[arg(long)]
    pub max_wait: Option<u64>,

    /// Print the wait report as JSON when done.
    #[arg(long)]
    pub report: bool,
}

impl WaitArgs {
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval.map(Duration::from_secs)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct OutputArgs {
    /// Save results as pretty JSON.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Save results as CSV.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Markdown,
    Html,
    RawHtml,
    Links,
    Screenshot,
    ScreenshotFullPage,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => Format::Markdown,
            FormatArg::Html => Format::Html,
            FormatArg::RawHtml => Format::RawHtml,
            FormatArg::Links => Format::Links,
            FormatArg::Screenshot => Format::Screenshot,
            FormatArg::ScreenshotFullPage => Format::ScreenshotFullPage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Batch,
    Crawl,
}

impl From<KindArg> for JobKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Batch => JobKind::Batch,
            KindArg::Crawl => JobKind::Crawl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaArg {
    News,
    Product,
    Company,
}

impl SchemaArg {
    pub fn schema(self) -> Value {
        match self {
            SchemaArg::News => schemas::news_schema(),
            SchemaArg::Product => schemas::product_schema(),
            SchemaArg::Company => schemas::company_details_schema(),
        }
    }

    /// Prompt used when none is given on the command line.
    pub fn default_prompt(self) -> &'static str {
        match self {
            SchemaArg::News => "Extract the news articles listed on this page",
            SchemaArg::Product => "Extract the product details from this page",
            SchemaArg::Company => "Extract the company details from this page",
        }
    }
}
