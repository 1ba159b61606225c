//! Milestone administration over the REST v3 API.
//!
//! Used by the sprint housekeeping commands: open the next milestone, close the
//! finished one, and carry its open issues over.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use transport::HttpMethod;

use report::{IssueNumber, MilestoneNumber, ReportError, RepositoryId};

use crate::client::GitHubClient;

/// Largest page the REST API serves.
const PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneState {
    Open,
    Closed,
}

/// A milestone as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Milestone {
    pub number: MilestoneNumber,
    pub title: String,
    pub state: MilestoneState,
    /// API URL of the milestone.
    pub url: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub due_on: Option<String>,
}

impl Milestone {
    pub fn is_open(&self) -> bool {
        self.state == MilestoneState::Open
    }

    /// Browser URL when GitHub reports one, API URL otherwise.
    pub fn link(&self) -> &str {
        self.html_url.as_deref().unwrap_or(&self.url)
    }
}

/// An issue as returned by the REST issue endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MilestoneIssue {
    pub number: IssueNumber,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub milestone: Option<MilestoneRef>,
}

impl MilestoneIssue {
    pub fn link(&self) -> &str {
        self.html_url.as_deref().unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MilestoneRef {
    pub number: MilestoneNumber,
    pub title: String,
}

#[derive(Debug, Serialize)]
struct CreateMilestone<'a> {
    title: &'a str,
    state: MilestoneState,
    due_on: String,
}

#[derive(Debug, Serialize)]
struct UpdateMilestone {
    state: MilestoneState,
}

#[derive(Debug, Serialize)]
struct AssignMilestone {
    milestone: MilestoneNumber,
}

impl GitHubClient {
    /// Every milestone of `repository`, open and closed, newest first.
    pub async fn list_milestones(&self, repository: &RepositoryId) -> Result<Vec<Milestone>, ReportError> {
        let url = self.rest_url(&format!(
            "/repos/{repository}/milestones?state=all&direction=desc&per_page={PER_PAGE}"
        ));
        self.rest::<(), _>(HttpMethod::Get, url, None, &format!("milestones of {repository}"))
            .await
    }

    /// The milestone of `repository` titled exactly `title`, in any state.
    #[instrument(skip(self, repository), fields(repository = %repository))]
    pub async fn find_milestone(&self, repository: &RepositoryId, title: &str) -> Result<Milestone, ReportError> {
        let milestones = self.list_milestones(repository).await?;
        debug!(count = milestones.len(), "listed milestones");
        milestones
            .into_iter()
            .find(|m| m.title == title)
            .ok_or_else(|| ReportError::MilestoneNotFound {
                repository: repository.to_string(),
                title: title.to_string(),
            })
    }

    /// Opens a milestone due at midnight UTC on `due_on`.
    pub async fn create_milestone(
        &self,
        repository: &RepositoryId,
        title: &str,
        due_on: NaiveDate,
    ) -> Result<Milestone, ReportError> {
        let payload = CreateMilestone {
            title,
            state: MilestoneState::Open,
            due_on: format!("{}T00:00:00Z", due_on.format("%Y-%m-%d")),
        };
        let url = self.rest_url(&format!("/repos/{repository}/milestones"));
        self.rest(
            HttpMethod::Post,
            url,
            Some(&payload),
            &format!("create milestone '{title}' in {repository}"),
        )
        .await
    }

    pub async fn close_milestone(
        &self,
        repository: &RepositoryId,
        milestone: MilestoneNumber,
    ) -> Result<Milestone, ReportError> {
        let url = self.rest_url(&format!("/repos/{repository}/milestones/{milestone}"));
        self.rest(
            HttpMethod::Patch,
            url,
            Some(&UpdateMilestone {
                state: MilestoneState::Closed,
            }),
            &format!("close milestone {milestone} in {repository}"),
        )
        .await
    }

    /// Open issues attached to `milestone`.
    pub async fn list_open_milestone_issues(
        &self,
        repository: &RepositoryId,
        milestone: MilestoneNumber,
    ) -> Result<Vec<MilestoneIssue>, ReportError> {
        let url = self.rest_url(&format!(
            "/repos/{repository}/issues?state=open&milestone={milestone}&per_page={PER_PAGE}"
        ));
        self.rest::<(), _>(
            HttpMethod::Get,
            url,
            None,
            &format!("open issues of milestone {milestone} in {repository}"),
        )
        .await
    }

    pub async fn assign_issue_milestone(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        milestone: MilestoneNumber,
    ) -> Result<MilestoneIssue, ReportError> {
        let url = self.rest_url(&format!("/repos/{repository}/issues/{issue}"));
        self.rest(
            HttpMethod::Patch,
            url,
            Some(&AssignMilestone { milestone }),
            &format!("move issue {issue} of {repository} to milestone {milestone}"),
        )
        .await
    }
}
