//! Sprint housekeeping: open, close, and roll over milestones on every
//! repository at once.

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{info, warn};

use aggregator::join_per_repository;
use github::{GitHubClient, Milestone};

pub async fn handle_new_milestone(
    github: Arc<GitHubClient>,
    repositories: &[String],
    name: &str,
    end: &str,
) -> anyhow::Result<()> {
    let due_on = NaiveDate::parse_from_str(end, "%Y-%m-%d")
        .with_context(|| format!("invalid value for the 'end' date: '{end}'"))?;
    let title = name.to_string();

    let outcomes = join_per_repository(repositories, "new milestone", move |repository| {
        let github = Arc::clone(&github);
        let title = title.clone();
        async move { github.create_milestone(&repository, &title, due_on).await }
    })
    .await;

    super::summarize("new milestone", outcomes, |repository, milestone| {
        info!(repository = %repository, milestone = %milestone.title, url = milestone.link(), "created milestone");
    })
}

/// Result of closing a milestone in one repository.
#[derive(Debug)]
pub enum CloseOutcome {
    Closed(Milestone),
    AlreadyClosed(Milestone),
}

pub async fn handle_close_milestone(
    github: Arc<GitHubClient>,
    repositories: &[String],
    name: &str,
) -> anyhow::Result<()> {
    let title = name.to_string();

    let outcomes = join_per_repository(repositories, "close milestone", move |repository| {
        let github = Arc::clone(&github);
        let title = title.clone();
        async move {
            let milestone = github.find_milestone(&repository, &title).await?;
            if !milestone.is_open() {
                return Ok(CloseOutcome::AlreadyClosed(milestone));
            }
            let closed = github.close_milestone(&repository, milestone.number).await?;
            Ok(CloseOutcome::Closed(closed))
        }
    })
    .await;

    super::summarize("close milestone", outcomes, |repository, outcome| match outcome {
        CloseOutcome::Closed(m) => {
            info!(repository = %repository, milestone = %m.title, url = m.link(), "closed milestone");
        }
        CloseOutcome::AlreadyClosed(m) => {
            warn!(repository = %repository, milestone = %m.title, "milestone is already closed");
        }
    })
}

/// Issues moved in one repository, and where to.
#[derive(Debug)]
pub struct MoveOutcome {
    pub target: Milestone,
    pub moved: usize,
}

pub async fn handle_move_issues(
    github: Arc<GitHubClient>,
    repositories: &[String],
    from: &str,
    to: &str,
) -> anyhow::Result<()> {
    let (from, to) = (from.to_string(), to.to_string());

    let outcomes = join_per_repository(repositories, "move issues", move |repository| {
        let github = Arc::clone(&github);
        let (from, to) = (from.clone(), to.clone());
        async move {
            let source = github.find_milestone(&repository, &from).await?;
            let target = github.find_milestone(&repository, &to).await?;
            let issues = github.list_open_milestone_issues(&repository, source.number).await?;

            // Stops at the first failure; issues already moved stay moved.
            for issue in &issues {
                github
                    .assign_issue_milestone(&repository, issue.number, target.number)
                    .await?;
                info!(issue = issue.link(), milestone = %target.title, "moved issue");
            }
            Ok(MoveOutcome {
                target,
                moved: issues.len(),
            })
        }
    })
    .await;

    super::summarize("move issues", outcomes, |repository, outcome| {
        info!(repository = %repository, milestone = %outcome.target.title, moved = outcome.moved, "moved open issues");
    })
}
