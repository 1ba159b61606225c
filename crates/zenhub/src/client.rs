use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, trace, warn};
use transport::{HttpMethod, HttpRequest, HttpTransport};

use report::{
    IssueEventQuery, IssueNumber, ReportError, RepositoryDatabaseId, Timestamp, WorkflowEvent,
    WorkflowStage,
};

/// Connection settings for [`ZenHubClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct ZenHubSettings {
    /// API token, sent as `X-Authentication-Token`.
    pub token: String,
    /// API root, without a trailing slash.
    pub api_url: String,
}

impl ZenHubSettings {
    pub const DEFAULT_API_URL: &'static str = "https://api.zenhub.io";

    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: Self::DEFAULT_API_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for ZenHubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZenHubSettings")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct ZenHubClient {
    transport: Arc<dyn HttpTransport>,
    settings: ZenHubSettings,
}

impl ZenHubClient {
    pub fn new(transport: Arc<dyn HttpTransport>, settings: ZenHubSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    fn events_url(&self, repository: RepositoryDatabaseId, issue: IssueNumber) -> String {
        format!(
            "{}/p1/repositories/{repository}/issues/{issue}/events",
            self.settings.api_url.trim_end_matches('/')
        )
    }
}

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IssueEvent {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    from_pipeline: Option<Pipeline>,
    #[serde(default)]
    to_pipeline: Option<Pipeline>,
}

#[derive(Debug, Deserialize)]
struct Pipeline {
    name: String,
}

impl IssueEvent {
    fn into_workflow_event(self) -> WorkflowEvent {
        let created_at = self.created_at.and_then(|raw| match Timestamp::parse_rfc3339(&raw) {
            Ok(ts) => Some(ts),
            Err(e) => {
                warn!(error = %e, "ignoring unparsable event timestamp");
                None
            }
        });
        WorkflowEvent {
            target_stage: self.to_pipeline.and_then(|p| WorkflowStage::new(p.name)),
            source_stage: self.from_pipeline.and_then(|p| WorkflowStage::new(p.name)),
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

#[async_trait]
impl IssueEventQuery for ZenHubClient {
    async fn fetch_issue_events(
        &self,
        repository: RepositoryDatabaseId,
        issue: IssueNumber,
    ) -> Result<Vec<WorkflowEvent>, ReportError> {
        let context = format!("events of issue {issue} in repository {repository}");
        let request = HttpRequest::new(HttpMethod::Get, self.events_url(repository, issue))
            .with_header("X-Authentication-Token", self.settings.token.as_str())
            .with_header("Accept", "application/json");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ReportError::transport(&context, e))?;
        trace!(status = response.status, body = %response.text(), "raw response");

        if response.status != 200 {
            return Err(ReportError::Status {
                context,
                status: response.status,
                body: response.text(),
            });
        }

        let events: Vec<IssueEvent> =
            serde_json::from_slice(&response.body).map_err(|e| ReportError::decode(&context, e))?;
        debug!(
            repository = %repository,
            issue = %issue,
            events = events.len(),
            latest = events.first().and_then(|e| e.kind.as_deref()).unwrap_or("none"),
            "fetched issue events"
        );
        Ok(events.into_iter().map(IssueEvent::into_workflow_event).collect())
    }
}
