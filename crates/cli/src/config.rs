//! Configuration file support for changelog.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables prefixed with `CHANGELOG_`, nested keys joined with
//!    `__` (e.g. `CHANGELOG_GITHUB__TOKEN`, `CHANGELOG_REPORT__REPOSITORIES`)
//! 3. `./changelog.toml`
//! 4. `changelog.toml` in the XDG config directory (`~/.config/changelog/`)
//! 5. Built-in defaults
//!
//! The conventional `GITHUB_TOKEN` and `ZENHUB_TOKEN` variables are honoured
//! when no token is configured otherwise. A `.env` file in the working
//! directory is loaded into the environment before any of this runs.
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."
//!
//! [zenhub]
//! token = "..."
//!
//! [report]
//! repositories = ["fabric8-services/fabric8-auth", "fabric8-services/fabric8-cluster"]
//! output_dir = "tmp"
//! pull_request_page_size = 10
//! accepted_stages = ["In Progress", "Review/QA"]
//!
//! [http]
//! timeout_secs = 30
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config as ConfigBuilder, ConfigBuilder as Builder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

use aggregator::AggregatorSettings;
use github::GitHubSettings;
use report::{AcceptedStages, PageSize, ReportError, IN_PROGRESS, REVIEW_QA};
use zenhub::ZenHubSettings;

const FILE_NAME: &str = "changelog.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub zenhub: ZenHubConfig,
    pub report: ReportConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Also read from `GITHUB_TOKEN`.
    pub token: Option<String>,
    pub graphql_url: String,
    pub rest_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            graphql_url: GitHubSettings::DEFAULT_GRAPHQL_URL.to_string(),
            rest_url: GitHubSettings::DEFAULT_REST_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ZenHubConfig {
    /// Also read from `ZENHUB_TOKEN`.
    pub token: Option<String>,
    pub api_url: String,
}

impl Default for ZenHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: ZenHubSettings::DEFAULT_API_URL.to_string(),
        }
    }
}

/// Defaults for the `report` command and the repository list shared by all
/// commands.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub repositories: Vec<String>,
    pub output_dir: String,
    pub pull_request_page_size: u32,
    pub issue_page_size: u32,
    pub accepted_stages: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            output_dir: "tmp".to_string(),
            pull_request_page_size: PageSize::default().get(),
            issue_page_size: PageSize::default().get(),
            accepted_stages: vec![IN_PROGRESS.to_string(), REVIEW_QA.to_string()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout. Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Loads the layered configuration from files and the process environment.
    pub fn load() -> Result<Self, ReportError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
            }
        }

        let local = PathBuf::from(FILE_NAME);
        if local.exists() {
            tracing::debug!(path = FILE_NAME, "loading config");
            builder = builder.add_source(File::from(local).format(FileFormat::Toml).required(false));
        }

        let mut config = Self::build(builder, Self::environment())?;
        config.apply_token_fallbacks(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn environment() -> Environment {
        Environment::with_prefix("CHANGELOG")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("report.repositories")
            .with_list_parse_key("report.accepted_stages")
            .try_parsing(true)
    }

    fn build(builder: Builder<DefaultState>, env: Environment) -> Result<Self, ReportError> {
        builder
            .add_source(env)
            .build()
            .and_then(|settings| settings.try_deserialize::<Config>())
            .map_err(|e| ReportError::Configuration {
                message: e.to_string(),
            })
    }

    /// Fills unset tokens from `GITHUB_TOKEN` / `ZENHUB_TOKEN`.
    fn apply_token_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if self.github.token.is_none() {
            self.github.token = non_empty("GITHUB_TOKEN");
        }
        if self.zenhub.token.is_none() {
            self.zenhub.token = non_empty("ZENHUB_TOKEN");
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "changelog").map(|dirs| dirs.config_dir().join(FILE_NAME))
    }

    pub fn github_settings(&self) -> Result<GitHubSettings, ReportError> {
        Ok(GitHubSettings {
            token: required_token(self.github.token.as_deref(), "GitHub", "GITHUB_TOKEN")?,
            graphql_url: self.github.graphql_url.clone(),
            rest_url: self.github.rest_url.clone(),
        })
    }

    pub fn zenhub_settings(&self) -> Result<ZenHubSettings, ReportError> {
        Ok(ZenHubSettings {
            token: required_token(self.zenhub.token.as_deref(), "ZenHub", "ZENHUB_TOKEN")?,
            api_url: self.zenhub.api_url.clone(),
        })
    }

    pub fn aggregator_settings(&self) -> Result<AggregatorSettings, ReportError> {
        Ok(AggregatorSettings {
            pull_request_page_size: PageSize::new(self.report.pull_request_page_size)?,
            issue_page_size: PageSize::new(self.report.issue_page_size)?,
            accepted_stages: AcceptedStages::new(self.report.accepted_stages.iter().cloned())?,
            ..AggregatorSettings::default()
        })
    }
}

fn required_token(token: Option<&str>, service: &str, variable: &str) -> Result<String, ReportError> {
    match token.map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(ReportError::Configuration {
            message: format!("no {service} token configured (set {variable} or CHANGELOG_{}__TOKEN)", service.to_uppercase()),
        }),
    }
}
