//! Port traits for the external query APIs.
//!
//! Infrastructure crates implement these; the aggregation engine only ever sees
//! `dyn` trait objects. Each method performs exactly one outbound request and
//! never retries.

use async_trait::async_trait;

use crate::{
    Cursor, IssueNumber, MilestoneIssuePage, Page, PageSize, PullRequestFilter, PullRequestRecord,
    ReportError, RepositoryDatabaseId, RepositoryId, WorkflowEvent,
};

/// Single-page access to a repository's pull requests.
#[async_trait]
pub trait PullRequestQuery: Send + Sync {
    /// Fetches one page of pull requests.
    ///
    /// `cursor` is `None` for the first page; afterwards it is the cursor from
    /// the previous page's [`crate::Continuation::More`].
    async fn fetch_pull_requests(
        &self,
        repository: &RepositoryId,
        filter: PullRequestFilter,
        page_size: PageSize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<PullRequestRecord>, ReportError>;
}

/// Single-page access to the open issues of a repository's current milestone.
#[async_trait]
pub trait MilestoneIssueQuery: Send + Sync {
    /// Fetches one page of open issues of the open milestone with the nearest
    /// due date.
    async fn fetch_milestone_issues(
        &self,
        repository: &RepositoryId,
        page_size: PageSize,
        cursor: Option<&Cursor>,
    ) -> Result<MilestoneIssuePage, ReportError>;
}

/// Access to the board-transition history of an issue.
#[async_trait]
pub trait IssueEventQuery: Send + Sync {
    /// Returns the issue's workflow events, most recent first.
    async fn fetch_issue_events(
        &self,
        repository: RepositoryDatabaseId,
        issue: IssueNumber,
    ) -> Result<Vec<WorkflowEvent>, ReportError>;
}
