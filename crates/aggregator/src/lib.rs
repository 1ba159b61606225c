//! Changelog aggregation engine.
//!
//! This crate sequences calls between the domain rules in the [`report`] crate
//! and the query ports implemented by infrastructure crates (GitHub, ZenHub).
//! It contains no wire formats and no domain rules of its own.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.**
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`walker`] | Cursor walkers for merged pull requests and milestone issues |
//! | [`classifier`] | Workflow-stage filtering of milestone issues |
//! | [`fanout`] | One task per repository, joined before returning |
//!
//! [`Aggregator`] ties them together and produces a [`Report`].

pub mod classifier;
pub mod fanout;
pub mod walker;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use report::{
    AcceptedStages, AggregateResult, IssueEventQuery, IssueRecord, MilestoneIssueQuery, PageSize,
    PullRequestFilter, PullRequestQuery, PullRequestRecord, Report, Timestamp,
};
use tracing::{debug, info};

pub use classifier::retain_in_progress;
pub use fanout::{fan_out, join_per_repository};
pub use walker::{collect_milestone_issues, walk_merged_pull_requests};

/// Tunables for an [`Aggregator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorSettings {
    /// Records per pull request page.
    pub pull_request_page_size: PageSize,
    /// Records per milestone issue page.
    pub issue_page_size: PageSize,
    /// State and ordering of the pull request query.
    pub pull_request_filter: PullRequestFilter,
    /// Stages that count as "in progress".
    pub accepted_stages: AcceptedStages,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            pull_request_page_size: PageSize::default(),
            issue_page_size: PageSize::default(),
            pull_request_filter: PullRequestFilter::merged(),
            accepted_stages: AcceptedStages::default(),
        }
    }
}

/// Builds [`Report`]s from the three query ports.
#[derive(Clone)]
pub struct Aggregator {
    pull_requests: Arc<dyn PullRequestQuery>,
    milestones: Arc<dyn MilestoneIssueQuery>,
    events: Arc<dyn IssueEventQuery>,
    settings: AggregatorSettings,
}

impl Aggregator {
    pub fn new(
        pull_requests: Arc<dyn PullRequestQuery>,
        milestones: Arc<dyn MilestoneIssueQuery>,
        events: Arc<dyn IssueEventQuery>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            pull_requests,
            milestones,
            events,
            settings,
        }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Pull requests merged strictly after `boundary`, per repository.
    pub async fn merged_pull_requests(
        &self,
        repositories: &[String],
        boundary: Timestamp,
    ) -> AggregateResult<PullRequestRecord> {
        let query = Arc::clone(&self.pull_requests);
        let filter = self.settings.pull_request_filter;
        let page_size = self.settings.pull_request_page_size;

        let merged = fan_out(repositories, "merged pull requests", move |repository| {
            let query = Arc::clone(&query);
            async move {
                walk_merged_pull_requests(query.as_ref(), &repository, filter, boundary, page_size)
                    .await
            }
        })
        .await;

        info!(
            repositories = merged.len(),
            pull_requests = merged.record_count(),
            since = %boundary,
            "collected merged pull requests"
        );
        merged
    }

    /// Open issues of each repository's current milestone that sit in an
    /// accepted workflow stage.
    pub async fn in_progress_issues(&self, repositories: &[String]) -> AggregateResult<IssueRecord> {
        let milestones = Arc::clone(&self.milestones);
        let events = Arc::clone(&self.events);
        let page_size = self.settings.issue_page_size;
        let accepted = self.settings.accepted_stages.clone();

        let issues = fan_out(repositories, "in-progress issues", move |repository| {
            let milestones = Arc::clone(&milestones);
            let events = Arc::clone(&events);
            let accepted = accepted.clone();
            async move {
                let mut current =
                    collect_milestone_issues(milestones.as_ref(), &repository, page_size).await?;
                debug!(
                    repository_database_id = %current.repository_database_id,
                    milestone = %current.milestone.title,
                    candidates = current.issues.len(),
                    "collected milestone issues"
                );
                retain_in_progress(
                    events.as_ref(),
                    current.repository_database_id,
                    &mut current.issues,
                    &accepted,
                )
                .await?;
                Ok(current.issues)
            }
        })
        .await;

        info!(
            repositories = issues.len(),
            issues = issues.record_count(),
            "collected in-progress issues"
        );
        issues
    }

    /// Runs both aggregations concurrently.
    pub async fn build_report(&self, repositories: &[String], boundary: Timestamp) -> Report {
        let (merged_pull_requests, in_progress_issues) = tokio::join!(
            self.merged_pull_requests(repositories, boundary),
            self.in_progress_issues(repositories),
        );
        Report {
            merged_pull_requests,
            in_progress_issues,
        }
    }
}
