//! `changelog report`: merged pull requests and in-progress issues.

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::info;
use transport::HttpTransport;

use aggregator::Aggregator;
use github::GitHubClient;
use report::Timestamp;
use zenhub::ZenHubClient;

use crate::config::Config;
use crate::output::Destination;
use crate::render::{render, OutputFormat};

pub struct ReportOptions<'a> {
    pub since: &'a str,
    pub output: &'a str,
    pub format: OutputFormat,
    pub today: NaiveDate,
}

pub async fn handle_report(
    options: ReportOptions<'_>,
    repositories: &[String],
    config: &Config,
    transport: Arc<dyn HttpTransport>,
) -> anyhow::Result<Destination> {
    let since = Timestamp::start_of_day(options.since).context("invalid value for the 'since' date")?;

    // Resolve every setting before the first request goes out.
    let github = Arc::new(GitHubClient::new(Arc::clone(&transport), config.github_settings()?));
    let zenhub = Arc::new(ZenHubClient::new(transport, config.zenhub_settings()?));
    let aggregator = Aggregator::new(github.clone(), github, zenhub, config.aggregator_settings()?);

    let report = aggregator.build_report(repositories, since).await;
    info!(
        repositories_with_merges = report.merged_pull_requests.len(),
        repositories_in_progress = report.in_progress_issues.len(),
        "report built"
    );

    let rendered = render(&report, options.format).context("failed to render report")?;
    let destination = Destination::resolve(options.output, options.today, options.format);
    destination
        .write(&rendered)
        .with_context(|| format!("failed to write report to {destination}"))?;
    Ok(destination)
}
