//! GraphQL request and response shapes.
//!
//! Query documents are constants. Everything that varies between calls
//! (owner, name, cursor, page size, filters) travels as a variable, so no
//! caller-supplied text is ever spliced into a query.

use serde::{Deserialize, Serialize};

use report::{
    Continuation, Cursor, IssueNumber, IssueRecord, MilestoneNumber, MilestoneSummary,
    OrderDirection, PullRequestNumber, PullRequestRecord, PullRequestState, ReportError,
    Timestamp,
};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Body of a GraphQL POST.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct GraphQlRequest<V: Serialize> {
    pub query: &'static str,
    pub variables: V,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<D> {
    pub data: Option<D>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

/// `{ "repository": ... }`, where a repository GitHub cannot resolve is `null`.
#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryData<R> {
    pub repository: Option<R>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<N, P> {
    pub page_info: P,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<N>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Nodes<N> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<N>,
}

// ---------------------------------------------------------------------------
// Merged pull requests
// ---------------------------------------------------------------------------

pub(crate) const PULL_REQUESTS_QUERY: &str = "\
query PullRequests($owner: String!, $name: String!, $last: Int!, $states: [PullRequestState!], $direction: OrderDirection!, $before: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(last: $last, states: $states, orderBy: {field: UPDATED_AT, direction: $direction}, before: $before) {
      pageInfo { startCursor hasPreviousPage }
      nodes { number title mergedAt permalink }
    }
  }
}";

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PullRequestVariables<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub last: u32,
    pub states: [PullRequestState; 1],
    pub direction: OrderDirection,
    pub before: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullRequestsRepository {
    pub pull_requests: Connection<PullRequestNode, BackwardPageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BackwardPageInfo {
    pub start_cursor: Option<String>,
    pub has_previous_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullRequestNode {
    pub number: u64,
    pub title: String,
    pub merged_at: Option<String>,
    pub permalink: String,
}

impl PullRequestNode {
    pub fn into_record(self, context: &str) -> Result<PullRequestRecord, ReportError> {
        let raw = self.merged_at.ok_or_else(|| {
            ReportError::decode(context, format!("pull request #{} has no mergedAt", self.number))
        })?;
        let merged_at = Timestamp::parse_rfc3339(&raw).map_err(|e| {
            ReportError::decode(context, format!("pull request #{}: {e}", self.number))
        })?;
        Ok(PullRequestRecord {
            number: PullRequestNumber::new(self.number),
            title: self.title,
            merged_at,
            permalink: self.permalink,
        })
    }
}

/// A backward walk continues from `startCursor` for as long as GitHub reports
/// an earlier page.
pub(crate) fn backward_continuation(
    info: BackwardPageInfo,
    context: &str,
) -> Result<Continuation, ReportError> {
    continuation(info.has_previous_page, info.start_cursor, "startCursor", context)
}

// ---------------------------------------------------------------------------
// Milestone issues
// ---------------------------------------------------------------------------

pub(crate) const MILESTONE_ISSUES_QUERY: &str = "\
query MilestoneIssues($owner: String!, $name: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    databaseId
    milestones(states: OPEN, first: 1, orderBy: {field: DUE_DATE, direction: ASC}) {
      nodes {
        number
        title
        issues(states: OPEN, first: $first, after: $after, orderBy: {field: UPDATED_AT, direction: DESC}) {
          pageInfo { endCursor hasNextPage }
          nodes { number title url }
        }
      }
    }
  }
}";

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MilestoneIssueVariables<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub first: u32,
    pub after: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MilestonesRepository {
    pub database_id: Option<u64>,
    pub milestones: Nodes<MilestoneNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MilestoneNode {
    pub number: u64,
    pub title: String,
    pub issues: Connection<IssueNode, ForwardPageInfo>,
}

impl MilestoneNode {
    pub fn summary(&self) -> MilestoneSummary {
        MilestoneSummary {
            number: MilestoneNumber::new(self.number),
            title: self.title.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ForwardPageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueNode {
    pub number: u64,
    pub title: String,
    pub url: String,
}

impl From<IssueNode> for IssueRecord {
    fn from(node: IssueNode) -> Self {
        IssueRecord {
            number: IssueNumber::new(node.number),
            title: node.title,
            url: node.url,
        }
    }
}

pub(crate) fn forward_continuation(
    info: ForwardPageInfo,
    context: &str,
) -> Result<Continuation, ReportError> {
    continuation(info.has_next_page, info.end_cursor, "endCursor", context)
}

fn continuation(
    more: bool,
    cursor: Option<String>,
    field: &str,
    context: &str,
) -> Result<Continuation, ReportError> {
    if !more {
        return Ok(Continuation::Exhausted);
    }
    cursor
        .and_then(Cursor::new)
        .map(Continuation::More)
        .ok_or_else(|| ReportError::decode(context, format!("more pages reported without a {field}")))
}
