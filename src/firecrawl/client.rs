use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use super::error::FirecrawlError;
use super::options::{CrawlOptions, OptionsError, ScrapeOptions, SearchOptions, validate_url};
use super::types::{
    BatchScrapeRequest, CrawlRequest, JobStatus, JobSubmission, ScrapeData, ScrapeRequest,
    ScrapeResponse, SearchRequest, SearchResponse, SearchResult, SubmissionResponse,
};
use crate::waiter::{JobId, JobWaiter, ProgressReporter, StatusCheck, WaitOutcome};

pub const API_URL: &str = "https://api.firecrawl.dev";

/// Request timeout used by [`FirecrawlClient::new`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct FirecrawlClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl FirecrawlClient {
    pub fn new(api_key: String) -> Result<Self, FirecrawlError> {
        Self::with_base_url(api_key, API_URL.to_string(), DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client pointing at a custom base URL (self-hosted instances, tests).
    pub fn with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, FirecrawlError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Scrapes a single page (HTML, PDF, ...) synchronously.
    #[instrument(skip(self, options))]
    pub async fn scrape(
        &self,
        url: &str,
        options: &ScrapeOptions,
    ) -> Result<ScrapeData, FirecrawlError> {
        validate_url(url)?;
        options.validate()?;

        let body: ScrapeResponse = self
            .send(self.post("/v1/scrape").json(&ScrapeRequest { url, options }))
            .await?;
        if !body.success {
            return Err(FirecrawlError::Unsuccessful(
                body.error.unwrap_or_else(|| "scrape failed".to_string()),
            ));
        }
        body.data
            .ok_or_else(|| FirecrawlError::ParseError("scrape response has no data".to_string()))
    }

    /// Submits an asynchronous batch scrape and returns its job id.
    #[instrument(skip(self, urls, options), fields(url_count = urls.len()))]
    pub async fn batch_scrape(
        &self,
        urls: &[String],
        options: &ScrapeOptions,
    ) -> Result<JobSubmission, FirecrawlError> {
        if urls.is_empty() {
            return Err(OptionsError::NoUrls.into());
        }
        for url in urls {
            validate_url(url)?;
        }
        options.validate()?;

        let submission = self
            .submit(
                self.post("/v1/batch/scrape")
                    .json(&BatchScrapeRequest { urls, options }),
            )
            .await?;
        info!(job_id = %submission.id, "batch scrape submitted");
        Ok(submission)
    }

    /// Current status of a batch scrape. A finished job's documents are
    /// collected from every result page.
    pub async fn batch_scrape_status(&self, job_id: &JobId) -> Result<JobStatus, FirecrawlError> {
        self.job_status(&format!("/v1/batch/scrape/{job_id}")).await
    }

    /// Submits an asynchronous crawl starting at `url`.
    #[instrument(skip(self, options))]
    pub async fn crawl(
        &self,
        url: &str,
        options: &CrawlOptions,
    ) -> Result<JobSubmission, FirecrawlError> {
        validate_url(url)?;
        options.validate()?;

        let submission = self
            .submit(self.post("/v1/crawl").json(&CrawlRequest { url, options }))
            .await?;
        info!(job_id = %submission.id, "crawl submitted");
        Ok(submission)
    }

    pub async fn crawl_status(&self, job_id: &JobId) -> Result<JobStatus, FirecrawlError> {
        self.job_status(&format!("/v1/crawl/{job_id}")).await
    }

    #[instrument(skip(self, options))]
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, FirecrawlError> {
        if query.trim().is_empty() {
            return Err(OptionsError::BlankQuery.into());
        }
        options.validate()?;

        let body: SearchResponse = self
            .send(self.post("/v1/search").json(&SearchRequest { query, options }))
            .await?;
        if !body.success {
            return Err(FirecrawlError::Unsuccessful(
                body.error.unwrap_or_else(|| "search failed".to_string()),
            ));
        }
        Ok(body.data)
    }

    /// Status-check endpoint for one kind of asynchronous job.
    pub fn jobs(&self, kind: JobKind) -> JobEndpoint<'_> {
        JobEndpoint { client: self, kind }
    }

    /// Submits a batch scrape and waits for it to finish.
    pub async fn batch_scrape_and_wait(
        &self,
        urls: &[String],
        options: &ScrapeOptions,
        waiter: &JobWaiter,
        progress: &impl ProgressReporter,
    ) -> Result<WaitOutcome, FirecrawlError> {
        let submission = self.batch_scrape(urls, options).await?;
        Ok(waiter
            .wait(&submission.id, &self.jobs(JobKind::Batch), progress)
            .await)
    }

    /// Submits a crawl and waits for it to finish.
    pub async fn crawl_and_wait(
        &self,
        url: &str,
        options: &CrawlOptions,
        waiter: &JobWaiter,
        progress: &impl ProgressReporter,
    ) -> Result<WaitOutcome, FirecrawlError> {
        let submission = self.crawl(url, options).await?;
        Ok(waiter
            .wait(&submission.id, &self.jobs(JobKind::Crawl), progress)
            .await)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.post(format!("{}{path}", self.base_url)))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.get(format!("{}{path}", self.base_url)))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
    }

    async fn submit(&self, request: RequestBuilder) -> Result<JobSubmission, FirecrawlError> {
        let body: SubmissionResponse = self.send(request).await?;
        if !body.success {
            return Err(FirecrawlError::Unsuccessful(
                body.error
                    .unwrap_or_else(|| "job was not accepted".to_string()),
            ));
        }
        let id = body.id.ok_or_else(|| {
            FirecrawlError::ParseError("accepted job has no id".to_string())
        })?;
        Ok(JobSubmission {
            success: true,
            id,
            url: body.url,
            invalid_urls: body.invalid_urls,
        })
    }

    /// Large finished jobs are paginated: the status holds the first page of
    /// documents and a `next` URL for the rest.
    async fn job_status(&self, path: &str) -> Result<JobStatus, FirecrawlError> {
        let mut status: JobStatus = self.send(self.get(path)).await?;
        if !status.is_terminal() {
            return Ok(status);
        }

        while let Some(next) = status.next.clone() {
            let url = if next.starts_with("http://") || next.starts_with("https://") {
                next
            } else {
                format!("{}{next}", self.base_url)
            };
            let page: JobStatus = self.send(self.authorized(self.client.get(&url))).await?;
            let added = status.append_page(page);
            debug!(%url, added, "fetched result page");
            if added == 0 {
                status.next = None;
            }
        }
        Ok(status)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, FirecrawlError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(%status, url = %response.url(), "firecrawl response");

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(FirecrawlError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(FirecrawlError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| FirecrawlError::ParseError(e.to_string()))
    }
}

/// The two kinds of asynchronous job the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Batch,
    Crawl,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Batch => write!(f, "batch scrape"),
            JobKind::Crawl => write!(f, "crawl"),
        }
    }
}

/// A [`StatusCheck`] bound to one job kind of a client.
pub struct JobEndpoint<'a> {
    client: &'a FirecrawlClient,
    kind: JobKind,
}

impl StatusCheck for JobEndpoint<'_> {
    async fn check_status(&self, job_id: &JobId) -> Result<JobStatus, FirecrawlError> {
        match self.kind {
            JobKind::Batch => self.client.batch_scrape_status(job_id).await,
            JobKind::Crawl => self.client.crawl_status(job_id).await,
        }
    }
}
