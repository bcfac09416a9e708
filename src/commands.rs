//! Runs one parsed [`Command`] against the API.

use anyhow::{Context, Result, anyhow, bail};
use console::Term;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{Cli, Command, FormatArg, OutputArgs, WaitArgs};
use crate::config::AppConfig;
use crate::export;
use crate::firecrawl::options::DEFAULT_DYNAMIC_WAIT_MS;
use crate::firecrawl::{
    CrawlOptions, FirecrawlClient, Format, JobKind, ScrapeData, ScrapeOptions, SearchOptions,
};
use crate::ui::{self, JobProgress};
use crate::waiter::{JobId, JobWaiter, StatusCheck as _, WaitOutcome};

pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    if let Command::Examples = cli.command {
        ui::print_examples();
        return Ok(());
    }

    let client = config.client()?;
    info!(api_url = %client.base_url(), api_key = %config.masked_api_key(), "using Firecrawl");

    match cli.command {
        Command::Scrape {
            url,
            formats,
            only_main_content,
            include_tags,
            exclude_tags,
            wait_for,
            clicks,
            wait_for_selector,
            output,
        } => {
            let mut options = if clicks.is_empty() && wait_for_selector.is_none() {
                let mut options = ScrapeOptions::filtered(include_tags, exclude_tags, only_main_content);
                options.wait_for = wait_for;
                options
            } else {
                let mut options = ScrapeOptions::dynamic(
                    wait_for.unwrap_or(DEFAULT_DYNAMIC_WAIT_MS),
                    clicks,
                    wait_for_selector,
                );
                options.include_tags = include_tags;
                options.exclude_tags = exclude_tags;
                options.only_main_content = only_main_content.then_some(true);
                options
            };
            options = options.with_formats(to_formats(&formats));

            let data = client.scrape(&url, &options).await?;
            ui::print_scrape(&url, &data);
            save_documents(std::slice::from_ref(&data), &output)?;
        }

        Command::Extract {
            url,
            schema,
            prompt,
            system_prompt,
            output,
        } => {
            let options = match schema {
                Some(schema) => ScrapeOptions::structured(
                    schema.schema(),
                    prompt.unwrap_or_else(|| schema.default_prompt().to_string()),
                    system_prompt,
                ),
                None => {
                    let prompt = prompt.ok_or_else(|| anyhow!("--prompt or --schema is required"))?;
                    ScrapeOptions::extract_with_prompt(prompt, system_prompt)
                }
            };

            let data = client.scrape(&url, &options).await?;
            let extracted = data.json.clone().unwrap_or(Value::Null);
            println!("{}", serde_json::to_string_pretty(&extracted)?);
            save_value(&extracted, &output)?;
        }

        Command::Crawl {
            url,
            limit,
            max_depth,
            include_paths,
            exclude_paths,
            allow_external_links,
            formats,
            no_wait,
            wait,
            output,
        } => {
            let options = crawl_options(
                limit,
                max_depth,
                include_paths,
                exclude_paths,
                allow_external_links,
                &formats,
            );
            let submission = client.crawl(&url, &options).await?;
            println!("Crawl started: {}", submission.id);
            if !no_wait {
                wait_for_job(&client, &config, JobKind::Crawl, &submission.id, &wait, &output)
                    .await?;
            }
        }

        Command::Batch {
            urls,
            formats,
            no_wait,
            wait,
            output,
        } => {
            let options = ScrapeOptions::default().with_formats(to_formats(&formats));
            let submission = client.batch_scrape(&urls, &options).await?;
            println!("Batch scrape started: {}", submission.id);
            if let Some(invalid) = submission.invalid_urls.as_deref()
                && !invalid.is_empty()
            {
                warn!(count = invalid.len(), "skipped invalid URLs: {}", invalid.join(", "));
            }
            if !no_wait {
                wait_for_job(&client, &config, JobKind::Batch, &submission.id, &wait, &output)
                    .await?;
            }
        }

        Command::Status { job_id, kind } => {
            let job_id = JobId::new(job_id)?;
            let status = client.jobs(kind.into()).check_status(&job_id).await?;
            println!(
                "{} {job_id}: {} ({}/{})",
                JobKind::from(kind),
                status.state,
                status.completed,
                status.total
            );
            if let Some(credits) = status.credits_used {
                println!("  credits used: {credits}");
            }
            if let Some(expires_at) = &status.expires_at {
                println!("  expires at: {expires_at}");
            }
        }

        Command::Wait {
            job_id,
            kind,
            wait,
            output,
        } => {
            let job_id = JobId::new(job_id)?;
            wait_for_job(&client, &config, kind.into(), &job_id, &wait, &output).await?;
        }

        Command::Search {
            query,
            limit,
            scrape,
            output,
        } => {
            let options = SearchOptions {
                limit,
                scrape_options: scrape.then(ScrapeOptions::default),
            };
            let results = client.search(&query, &options).await?;
            ui::print_search_results(&query, &results);
            save_value(&serde_json::to_value(&results)?, &output)?;
        }

        Command::Examples => {}
    }

    Ok(())
}

/// Waits on a job until it ends or Ctrl-C is pressed, then saves whatever
/// data the last status carried. Any outcome but completion is an error.
async fn wait_for_job(
    client: &FirecrawlClient,
    config: &AppConfig,
    kind: JobKind,
    job_id: &JobId,
    args: &WaitArgs,
    output: &OutputArgs,
) -> Result<()> {
    let defaults = config.waiter()?;
    let waiter = JobWaiter::new(
        args.poll_interval().unwrap_or(defaults.poll_interval()),
        args.max_wait().unwrap_or(defaults.max_wait()),
    )?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let progress = JobProgress::new(&format!("{kind} {job_id}"), Term::stderr().is_term());
    let outcome = waiter
        .wait_with_cancel(job_id, &client.jobs(kind), &progress, &cancel)
        .await;
    ctrl_c.abort();

    progress.complete(&outcome);
    if args.report
        && let Some(report) = progress.take_report()
    {
        progress.print_report(&report);
    }

    if let Some(status) = outcome.status() {
        let documents = status
            .documents()
            .context("job status carried malformed documents")?;
        if !documents.is_empty() {
            save_documents(&documents, output)?;
        }
    }

    match outcome {
        WaitOutcome::Completed(_) => Ok(()),
        other => bail!("{kind} {job_id} ended as {}", other.state()),
    }
}

fn crawl_options(
    limit: u32,
    max_depth: Option<u32>,
    include_paths: Vec<String>,
    exclude_paths: Vec<String>,
    allow_external_links: bool,
    formats: &[FormatArg],
) -> CrawlOptions {
    CrawlOptions {
        limit,
        max_depth,
        include_paths,
        exclude_paths,
        allow_external_links,
        scrape_options: Some(ScrapeOptions::default().with_formats(to_formats(formats))),
        ..CrawlOptions::default()
    }
}

fn to_formats(formats: &[FormatArg]) -> Vec<Format> {
    formats.iter().copied().map(Format::from).collect()
}

fn save_documents(documents: &[ScrapeData], output: &OutputArgs) -> Result<()> {
    if let Some(path) = &output.output {
        export::save_json(documents, path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Saved {} document(s) to {}", documents.len(), path.display());
    }
    if let Some(path) = &output.csv {
        let rows = export::rows_from_documents(documents);
        let written = export::save_csv(&rows, path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Saved {written} row(s) to {}", path.display());
    }
    Ok(())
}

fn save_value(value: &Value, output: &OutputArgs) -> Result<()> {
    if let Some(path) = &output.output {
        export::save_json(value, path).with_context(|| format!("writing {}", path.display()))?;
        println!("Saved to {}", path.display());
    }
    if let Some(path) = &output.csv {
        let rows = export::rows_from_value(value);
        let written =
            export::save_csv(&rows, path).with_context(|| format!("writing {}", path.display()))?;
        println!("Saved {written} row(s) to {}", path.display());
    }
    Ok(())
}
