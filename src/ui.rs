//! Terminal output: spinners while a job runs and colored summaries.
//!
//! [`JobProgress`] plugs into [`JobWaiter`](crate::waiter::JobWaiter) as a
//! [`ProgressReporter`] and keeps a spinner updated with `completed/total`.

use std::sync::Mutex;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::firecrawl::{ScrapeData, SearchResult};
use crate::waiter::{JobId, ProgressReporter, WaitOutcome, WaitReport, WaitState};

/// Spinner shown while waiting on a batch or crawl job.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    report: Mutex<Option<WaitReport>>,
}

impl JobProgress {
    /// Animated spinner on a terminal, hidden bar otherwise so piped output
    /// carries no control sequences.
    pub fn new(description: &str, interactive: bool) -> Self {
        if interactive {
            return Self::start(description);
        }
        let progress = Self::hidden();
        progress.pb.set_message(format!("{description}: submitted"));
        progress
    }

    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(format!("{description}: submitted"));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            report: Mutex::new(None),
        }
    }

    /// Draws nothing; outcome lines from [`complete`](Self::complete) still print.
    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            report: Mutex::new(None),
        }
    }

    fn style_for(&self, state: WaitState) -> &Style {
        match state {
            WaitState::Completed => &self.green,
            WaitState::Failed | WaitState::Unavailable | WaitState::Interrupted => &self.red,
            _ => &self.yellow,
        }
    }

    /// Stops the spinner and prints one line describing how the wait ended.
    pub fn complete(&self, outcome: &WaitOutcome) {
        self.pb.finish_and_clear();
        let style = self.style_for(outcome.state());
        match outcome {
            WaitOutcome::Completed(status) => println!(
                "  {} Job completed ({}/{} pages)",
                style.apply_to("✓"),
                status.completed,
                status.total
            ),
            WaitOutcome::Failed(status) => println!(
                "  {} Job failed after {}/{} pages",
                style.apply_to("✗"),
                status.completed,
                status.total
            ),
            WaitOutcome::TimedOut(status) => println!(
                "  {} Timed out waiting; job is {} at {}/{}",
                style.apply_to("⏱"),
                status.state,
                status.completed,
                status.total
            ),
            WaitOutcome::Cancelled(status) => println!(
                "  {} Wait cancelled; job was {} at {}/{}",
                style.apply_to("↯"),
                status.state,
                status.completed,
                status.total
            ),
            WaitOutcome::Interrupted { last, reason } => println!(
                "  {} Lost contact with job at {}/{}: {reason}",
                style.apply_to("✗"),
                last.completed,
                last.total
            ),
            WaitOutcome::Unavailable { reason } => println!(
                "  {} Job status unavailable: {reason}",
                style.apply_to("✗")
            ),
        }
    }

    /// The report of the finished wait, once there is one.
    pub fn take_report(&self) -> Option<WaitReport> {
        self.report.lock().ok()?.take()
    }

    /// Prints the wait report as pretty JSON.
    pub fn print_report(&self, report: &WaitReport) {
        let style = self.style_for(report.state);
        println!();
        println!("{}", style.apply_to("─── Wait Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}

impl ProgressReporter for JobProgress {
    fn progress(&self, job_id: &JobId, completed: u64, total: u64) {
        self.pb
            .set_message(format!("Job {job_id}: {completed}/{total} completed"));
    }

    fn finished(&self, report: &WaitReport) {
        tracing::debug!(
            job_id = %report.job_id,
            state = %report.state,
            checks = report.checks,
            "wait finished"
        );
        if let Ok(mut slot) = self.report.lock() {
            *slot = Some(report.clone());
        }
    }
}

/// Prints a short summary of a scraped page.
pub fn print_scrape(url: &str, data: &ScrapeData) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    println!("{}", bold.apply_to(data.title().unwrap_or(url)));
    println!("{}", dim.apply_to(url));
    if let Some(markdown) = &data.markdown {
        println!("  markdown: {} chars", markdown.chars().count());
    }
    if !data.links().is_empty() {
        println!("  links: {}", data.links().len());
    }
    if let Some(screenshot) = &data.screenshot {
        println!("  screenshot: {screenshot}");
    }
    if let Some(json) = &data.json {
        println!(
            "{}",
            serde_json::to_string_pretty(json).unwrap_or_default()
        );
    }
}

pub fn print_search_results(query: &str, results: &[SearchResult]) {
    let bold = Style::new().bold();
    let cyan = Style::new().cyan();
    println!(
        "{} result(s) for {}",
        results.len(),
        bold.apply_to(format!("\"{query}\""))
    );
    for (i, result) in results.iter().enumerate() {
        println!(
            "{:>3}. {}",
            i + 1,
            result.title.as_deref().unwrap_or("(untitled)")
        );
        println!("     {}", cyan.apply_to(&result.url));
        if let Some(description) = &result.description {
            println!("     {description}");
        }
    }
}

/// Shell snippets printed by the `examples` command.
pub const EXAMPLES: &str = "\
Scrape a page as markdown:
  firecrawl-skills scrape https://example.com

Pull structured data with a built-in schema:
  firecrawl-skills extract https://example.com/product --schema product

Crawl a docs site and wait for it:
  firecrawl-skills crawl https://docs.example.com --limit 50 --max-depth 2

Batch scrape several pages into CSV:
  firecrawl-skills batch https://a.example https://b.example --csv pages.csv

Check on a job you started earlier:
  firecrawl-skills status <job-id> --kind crawl
  firecrawl-skills wait <job-id> --kind batch --poll-interval 10

Search the web and scrape the hits:
  firecrawl-skills search \"rust async runtimes\" --limit 5 --scrape
";

pub fn print_examples() {
    println!("{EXAMPLES}");
}
