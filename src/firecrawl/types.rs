//! Request and response shapes for the Firecrawl v1 API.
//!
//! Responses are deserialized leniently: counters default to zero and unknown
//! job states are kept verbatim so the waiter can treat them as non-terminal.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::options::{CrawlOptions, ScrapeOptions, SearchOptions};
use crate::waiter::JobId;

#[derive(Debug, Serialize)]
pub(crate) struct ScrapeRequest<'a> {
    pub url: &'a str,
    #[serde(flatten)]
    pub options: &'a ScrapeOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchScrapeRequest<'a> {
    pub urls: &'a [String],
    #[serde(flatten)]
    pub options: &'a ScrapeOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct CrawlRequest<'a> {
    pub url: &'a str,
    #[serde(flatten)]
    pub options: &'a CrawlOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub query: &'a str,
    #[serde(flatten)]
    pub options: &'a SearchOptions,
}

/// Envelope returned by `POST /v1/scrape`.
#[derive(Debug, Deserialize)]
pub(crate) struct ScrapeResponse {
    pub success: bool,
    pub data: Option<ScrapeData>,
    pub error: Option<String>,
}

/// Envelope returned by `POST /v1/search`.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<SearchResult>,
    pub error: Option<String>,
}

/// One scraped page. Only the requested formats are populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    /// URL of the captured screenshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Object produced by LLM extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
}

impl ScrapeData {
    /// Links found on the page, empty when the links format was not requested.
    pub fn links(&self) -> &[String] {
        self.links.as_deref().unwrap_or(&[])
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref()?.title.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(
        rename = "sourceURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Everything else the page exposed (og:*, keywords, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw reply to a batch or crawl submission. A rejected job carries an
/// error message and no id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionResponse {
    pub success: bool,
    #[serde(default)]
    pub id: Option<JobId>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "invalidURLs")]
    pub invalid_urls: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Acknowledgement of an asynchronous batch or crawl submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    pub success: bool,
    pub id: JobId,
    /// Status URL for the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "invalidURLs", skip_serializing_if = "Option::is_none")]
    pub invalid_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

/// State reported by a status check. Anything other than `completed` or
/// `failed` means the job is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Pending,
    Scraping,
    Completed,
    Failed,
    Other(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Pending => "pending",
            JobState::Scraping => "scraping",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Other(s) => s,
        }
    }
}

impl From<String> for JobState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => JobState::Pending,
            "scraping" => JobState::Scraping,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            _ => JobState::Other(value),
        }
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot returned by `GET /v1/batch/scrape/{id}` and `GET /v1/crawl/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(rename = "status")]
    pub state: JobState,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Cursor for the next page of results on large jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JobStatus {
    pub fn new(state: JobState, completed: u64, total: u64) -> Self {
        Self {
            state,
            completed,
            total,
            credits_used: None,
            expires_at: None,
            next: None,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Appends the documents of a follow-up page and takes over its cursor.
    /// Returns how many documents were added.
    pub fn append_page(&mut self, page: JobStatus) -> usize {
        self.next = page.next;
        let items = match page.data {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => return 0,
        };
        let added = items.len();
        match &mut self.data {
            Some(Value::Array(existing)) => existing.extend(items),
            slot => *slot = Some(Value::Array(items)),
        }
        added
    }

    /// Decodes the payload as scraped pages. A missing payload yields no pages.
    pub fn documents(&self) -> Result<Vec<ScrapeData>, serde_json::Error> {
        match &self.data {
            Some(data) => serde_json::from_value(data.clone()),
            None => Ok(Vec::new()),
        }
    }
}
