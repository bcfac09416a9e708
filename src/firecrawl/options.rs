//! Typed request options for scrape, crawl and search calls.
//!
//! Every option the wrapper knows about is enumerated here and serialized in
//! the camelCase shape the v1 API expects. Options are validated before a
//! request leaves the process; see [`ScrapeOptions::validate`].

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Wait inserted after each click in [`ScrapeOptions::dynamic`].
pub const CLICK_SETTLE_MS: u64 = 1000;

/// Initial wait used by [`ScrapeOptions::dynamic`] when the caller has no preference.
pub const DEFAULT_DYNAMIC_WAIT_MS: u64 = 3000;

/// Default page budget for a crawl.
pub const DEFAULT_CRAWL_LIMIT: u32 = 100;

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 5;

const MAX_SEARCH_LIMIT: u32 = 100;

/// Rejections raised by option validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("at least one output format is required")]
    NoFormats,

    #[error("format `{0}` requested more than once")]
    DuplicateFormat(Format),

    #[error("the json format requires json options")]
    JsonFormatWithoutOptions,

    #[error("json options were given but the json format was not requested")]
    JsonOptionsWithoutFormat,

    #[error("json options need a schema or a prompt")]
    EmptyJsonOptions,

    #[error("tag names must not be blank")]
    BlankTag,

    #[error("tag `{0}` is both included and excluded")]
    ConflictingTag(String),

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("action #{index} is invalid: {reason}")]
    InvalidAction { index: usize, reason: String },

    #[error("at least one URL is required")]
    NoUrls,

    #[error("URL must start with http:// or https://, got `{0}`")]
    InvalidUrl(String),

    #[error("crawl limit must be greater than zero")]
    ZeroLimit,

    #[error("search limit must be between 1 and 100, got {0}")]
    SearchLimit(u32),

    #[error("search query must not be blank")]
    BlankQuery,
}

/// Output formats the API can return for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "markdown")]
    Markdown,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "rawHtml")]
    RawHtml,
    #[serde(rename = "links")]
    Links,
    #[serde(rename = "screenshot")]
    Screenshot,
    #[serde(rename = "screenshot@fullPage")]
    ScreenshotFullPage,
    #[serde(rename = "json")]
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Markdown => "markdown",
            Format::Html => "html",
            Format::RawHtml => "rawHtml",
            Format::Links => "links",
            Format::Screenshot => "screenshot",
            Format::ScreenshotFullPage => "screenshot@fullPage",
            Format::Json => "json",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

/// A browser interaction performed before the page is captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    /// Wait a fixed time or until a selector appears. Exactly one must be set.
    Wait {
        #[serde(skip_serializing_if = "Option::is_none")]
        milliseconds: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    Click {
        selector: String,
    },
    Write {
        text: String,
    },
    Press {
        key: String,
    },
    Scroll {
        direction: ScrollDirection,
    },
    Screenshot {
        #[serde(rename = "fullPage", default)]
        full_page: bool,
    },
}

impl Action {
    pub fn wait_ms(milliseconds: u64) -> Self {
        Action::Wait {
            milliseconds: Some(milliseconds),
            selector: None,
        }
    }

    pub fn wait_for(selector: impl Into<String>) -> Self {
        Action::Wait {
            milliseconds: None,
            selector: Some(selector.into()),
        }
    }

    pub fn click(selector: impl Into<String>) -> Self {
        Action::Click {
            selector: selector.into(),
        }
    }

    fn check(&self) -> Result<(), String> {
        match self {
            Action::Wait {
                milliseconds: Some(_),
                selector: Some(_),
            } => Err("wait takes either milliseconds or a selector, not both".into()),
            Action::Wait {
                milliseconds: None,
                selector: None,
            } => Err("wait needs milliseconds or a selector".into()),
            Action::Wait {
                milliseconds: Some(0),
                ..
            } => Err("wait milliseconds must be greater than zero".into()),
            Action::Wait {
                selector: Some(s), ..
            }
            | Action::Click { selector: s } => non_blank(s, "selector"),
            Action::Write { text } => non_blank(text, "text"),
            Action::Press { key } => non_blank(key, "key"),
            _ => Ok(()),
        }
    }
}

fn non_blank(value: &str, what: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{what} must not be blank"))
    } else {
        Ok(())
    }
}

/// LLM extraction settings, sent as `jsonOptions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonOptions {
    /// JSON schema the extracted object must follow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Options for a single page scrape; also used per page by batch and crawl jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOptions {
    pub formats: Vec<Format>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_main_content: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_tags: Vec<String>,
    /// Delay before capture, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<u64>,
    /// Server-side timeout, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_options: Option<JsonOptions>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            formats: vec![Format::Markdown],
            only_main_content: None,
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            wait_for: None,
            timeout: None,
            actions: Vec::new(),
            json_options: None,
        }
    }
}

impl ScrapeOptions {
    /// Replaces the requested formats.
    pub fn with_formats(mut self, formats: impl IntoIterator<Item = Format>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }

    /// Adds a viewport or full-page screenshot.
    pub fn with_screenshot(mut self, full_page: bool) -> Self {
        let format = if full_page {
            Format::ScreenshotFullPage
        } else {
            Format::Screenshot
        };
        self.push_format(format);
        self
    }

    /// Markdown scrape restricted to (or stripped of) the given tags.
    pub fn filtered(
        include_tags: impl IntoIterator<Item = impl Into<String>>,
        exclude_tags: impl IntoIterator<Item = impl Into<String>>,
        only_main_content: bool,
    ) -> Self {
        Self {
            include_tags: include_tags.into_iter().map(Into::into).collect(),
            exclude_tags: exclude_tags.into_iter().map(Into::into).collect(),
            only_main_content: only_main_content.then_some(true),
            ..Self::default()
        }
    }

    /// Markdown plus a free-form LLM extraction driven by `prompt`.
    pub fn extract_with_prompt(prompt: impl Into<String>, system_prompt: Option<String>) -> Self {
        Self {
            formats: vec![Format::Markdown, Format::Json],
            json_options: Some(JsonOptions {
                schema: None,
                prompt: Some(prompt.into()),
                system_prompt,
            }),
            ..Self::default()
        }
    }

    /// Schema-constrained extraction over the main content only.
    pub fn structured(
        schema: Value,
        prompt: impl Into<String>,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            formats: vec![Format::Json],
            only_main_content: Some(true),
            json_options: Some(JsonOptions {
                schema: Some(schema),
                prompt: Some(prompt.into()),
                system_prompt,
            }),
            ..Self::default()
        }
    }

    /// Appends browser actions to run before capture.
    pub fn with_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Scrape of a client-rendered page: wait, click each selector and let it
    /// settle, then optionally wait for a selector to appear.
    pub fn dynamic(
        wait_ms: u64,
        click_selectors: impl IntoIterator<Item = impl Into<String>>,
        wait_for_selector: Option<String>,
    ) -> Self {
        let mut actions = vec![Action::wait_ms(wait_ms)];
        for selector in click_selectors {
            actions.push(Action::click(selector));
            actions.push(Action::wait_ms(CLICK_SETTLE_MS));
        }
        if let Some(selector) = wait_for_selector {
            actions.push(Action::wait_for(selector));
        }
        Self::default().with_actions(actions)
    }

    fn push_format(&mut self, format: Format) {
        if !self.formats.contains(&format) {
            self.formats.push(format);
        }
    }

    /// Checks the options for combinations the API would reject or ignore.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.formats.is_empty() {
            return Err(OptionsError::NoFormats);
        }
        let mut seen = HashSet::new();
        for format in &self.formats {
            if !seen.insert(format) {
                return Err(OptionsError::DuplicateFormat(*format));
            }
        }

        let wants_json = self.formats.contains(&Format::Json);
        match (&self.json_options, wants_json) {
            (None, true) => return Err(OptionsError::JsonFormatWithoutOptions),
            (Some(_), false) => return Err(OptionsError::JsonOptionsWithoutFormat),
            (Some(opts), true) if opts.schema.is_none() && opts.prompt.is_none() => {
                return Err(OptionsError::EmptyJsonOptions);
            }
            _ => {}
        }

        if self
            .include_tags
            .iter()
            .chain(&self.exclude_tags)
            .any(|t| t.trim().is_empty())
        {
            return Err(OptionsError::BlankTag);
        }
        if let Some(tag) = self
            .include_tags
            .iter()
            .find(|t| self.exclude_tags.contains(t))
        {
            return Err(OptionsError::ConflictingTag(tag.clone()));
        }

        if self.timeout == Some(0) {
            return Err(OptionsError::ZeroTimeout);
        }

        for (index, action) in self.actions.iter().enumerate() {
            action
                .check()
                .map_err(|reason| OptionsError::InvalidAction { index, reason })?;
        }

        Ok(())
    }
}

/// Options for a site crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOptions {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_paths: Vec<String>,
    pub allow_external_links: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_subdomains: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_options: Option<ScrapeOptions>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_CRAWL_LIMIT,
            max_depth: None,
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
            allow_external_links: false,
            allow_subdomains: None,
            scrape_options: Some(ScrapeOptions::default()),
        }
    }
}

impl CrawlOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.limit == 0 {
            return Err(OptionsError::ZeroLimit);
        }
        match &self.scrape_options {
            Some(opts) => opts.validate(),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_options: Option<ScrapeOptions>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            scrape_options: None,
        }
    }
}

impl SearchOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.limit == 0 || self.limit > MAX_SEARCH_LIMIT {
            return Err(OptionsError::SearchLimit(self.limit));
        }
        match &self.scrape_options {
            Some(opts) => opts.validate(),
            None => Ok(()),
        }
    }
}

/// Rejects anything that is not an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<(), OptionsError> {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        Err(OptionsError::InvalidUrl(url.to_string()))
    }
}
