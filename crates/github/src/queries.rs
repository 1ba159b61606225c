//! Paginated query ports backed by the GraphQL API.

use async_trait::async_trait;
use tracing::debug;

use report::{
    Continuation, Cursor, IssueRecord, MilestoneIssuePage, MilestoneIssueQuery, Page, PageSize,
    PullRequestFilter, PullRequestQuery, PullRequestRecord, ReportError, RepositoryDatabaseId,
    RepositoryId,
};

use crate::client::GitHubClient;
use crate::graphql::{
    backward_continuation, forward_continuation, GraphQlRequest, MilestoneIssueVariables,
    MilestonesRepository, PullRequestVariables, PullRequestsRepository, MILESTONE_ISSUES_QUERY,
    PULL_REQUESTS_QUERY,
};

#[async_trait]
impl PullRequestQuery for GitHubClient {
    async fn fetch_pull_requests(
        &self,
        repository: &RepositoryId,
        filter: PullRequestFilter,
        page_size: PageSize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<PullRequestRecord>, ReportError> {
        let context = format!("pull requests of {repository}");
        let request = GraphQlRequest {
            query: PULL_REQUESTS_QUERY,
            variables: PullRequestVariables {
                owner: repository.owner(),
                name: repository.name(),
                last: page_size.get(),
                states: [filter.state],
                direction: filter.direction,
                before: cursor.map(Cursor::as_str),
            },
        };

        let repo: PullRequestsRepository = self.repository_query(&request, &context).await?;
        let connection = repo.pull_requests;
        let records = connection
            .nodes
            .into_iter()
            .map(|node| node.into_record(&context))
            .collect::<Result<Vec<_>, _>>()?;
        let next = backward_continuation(connection.page_info, &context)?;

        debug!(repository = %repository, records = records.len(), more = matches!(next, Continuation::More(_)), "fetched pull request page");
        Ok(Page { records, next })
    }
}

#[async_trait]
impl MilestoneIssueQuery for GitHubClient {
    async fn fetch_milestone_issues(
        &self,
        repository: &RepositoryId,
        page_size: PageSize,
        cursor: Option<&Cursor>,
    ) -> Result<MilestoneIssuePage, ReportError> {
        let context = format!("milestone issues of {repository}");
        let request = GraphQlRequest {
            query: MILESTONE_ISSUES_QUERY,
            variables: MilestoneIssueVariables {
                owner: repository.owner(),
                name: repository.name(),
                first: page_size.get(),
                after: cursor.map(Cursor::as_str),
            },
        };

        let repo: MilestonesRepository = self.repository_query(&request, &context).await?;
        let database_id = repo
            .database_id
            .map(RepositoryDatabaseId::new)
            .ok_or_else(|| ReportError::decode(&context, "repository has no databaseId"))?;

        let Some(milestone) = repo.milestones.nodes.into_iter().next() else {
            debug!(repository = %repository, "no open milestone");
            return Ok(MilestoneIssuePage {
                repository_database_id: database_id,
                milestone: None,
                issues: Page {
                    records: Vec::new(),
                    next: Continuation::Exhausted,
                },
            });
        };

        let summary = milestone.summary();
        let records: Vec<IssueRecord> = milestone
            .issues
            .nodes
            .into_iter()
            .map(IssueRecord::from)
            .collect();
        let next = forward_continuation(milestone.issues.page_info, &context)?;

        debug!(repository = %repository, milestone = %summary.title, records = records.len(), "fetched milestone issue page");
        Ok(MilestoneIssuePage {
            repository_database_id: database_id,
            milestone: Some(summary),
            issues: Page { records, next },
        })
    }
}
