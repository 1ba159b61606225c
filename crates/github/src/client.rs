//! Authenticated access to the GitHub GraphQL and REST endpoints.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;
use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

use report::ReportError;

use crate::graphql::{GraphQlRequest, GraphQlResponse, RepositoryData};

const USER_AGENT: &str = concat!("changelog/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`GitHubClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    /// Personal access or installation token, sent as a bearer token.
    pub token: String,
    /// GraphQL endpoint.
    pub graphql_url: String,
    /// REST API root, without a trailing slash.
    pub rest_url: String,
}

impl GitHubSettings {
    pub const DEFAULT_GRAPHQL_URL: &'static str = "https://api.github.com/graphql";
    pub const DEFAULT_REST_URL: &'static str = "https://api.github.com";

    /// Settings for github.com with the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            graphql_url: Self::DEFAULT_GRAPHQL_URL.to_string(),
            rest_url: Self::DEFAULT_REST_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("token", &"<redacted>")
            .field("graphql_url", &self.graphql_url)
            .field("rest_url", &self.rest_url)
            .finish()
    }
}

/// GitHub adapter. Implements [`report::PullRequestQuery`] and
/// [`report::MilestoneIssueQuery`], and exposes REST milestone administration.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    settings: GitHubSettings,
}

impl GitHubClient {
    pub fn new(transport: Arc<dyn HttpTransport>, settings: GitHubSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &GitHubSettings {
        &self.settings
    }

    pub(crate) fn rest_url(&self, path: &str) -> String {
        format!("{}{}", self.settings.rest_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: HttpMethod, url: String, accept: &str) -> HttpRequest {
        HttpRequest::new(method, url)
            .with_header("Authorization", format!("Bearer {}", self.settings.token))
            .with_header("User-Agent", USER_AGENT)
            .with_header("Accept", accept)
    }

    async fn send(&self, request: HttpRequest, context: &str) -> Result<HttpResponse, ReportError> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ReportError::transport(context, e))?;
        trace!(context, status = response.status, body = %response.text(), "raw response");

        if !response.is_success() {
            return Err(ReportError::Status {
                context: context.to_string(),
                status: response.status,
                body: response.text(),
            });
        }
        Ok(response)
    }

    /// Runs a repository-scoped GraphQL query and returns the `repository`
    /// object.
    ///
    /// An `errors` array wins over any partial data; a `null` repository
    /// without errors is a decode failure.
    pub(crate) async fn repository_query<V, R>(
        &self,
        request: &GraphQlRequest<V>,
        context: &str,
    ) -> Result<R, ReportError>
    where
        V: Serialize,
        R: DeserializeOwned,
    {
        let body = serde_json::to_vec(request).map_err(|e| ReportError::decode(context, e))?;
        let http = self
            .request(
                HttpMethod::Post,
                self.settings.graphql_url.clone(),
                "application/json",
            )
            .with_header("Content-Type", "application/json")
            .with_body(body);

        let response = self.send(http, context).await?;
        let decoded: GraphQlResponse<RepositoryData<R>> =
            serde_json::from_slice(&response.body).map_err(|e| ReportError::decode(context, e))?;

        if !decoded.errors.is_empty() {
            let message = decoded
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ReportError::Rejected {
                context: context.to_string(),
                message,
            });
        }

        decoded
            .data
            .and_then(|data| data.repository)
            .ok_or_else(|| ReportError::decode(context, "response has no repository"))
    }

    /// Sends a REST request, with an optional JSON payload, and decodes the
    /// JSON response.
    pub(crate) async fn rest<B, D>(
        &self,
        method: HttpMethod,
        url: String,
        payload: Option<&B>,
        context: &str,
    ) -> Result<D, ReportError>
    where
        B: Serialize,
        D: DeserializeOwned,
    {
        let mut http = self.request(method, url, "application/vnd.github+json");
        if let Some(payload) = payload {
            let body = serde_json::to_vec(payload).map_err(|e| ReportError::decode(context, e))?;
            http = http
                .with_header("Content-Type", "application/json")
                .with_body(body);
        }

        let response = self.send(http, context).await?;
        serde_json::from_slice(&response.body).map_err(|e| ReportError::decode(context, e))
    }
}
