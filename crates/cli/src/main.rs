//! Changelog CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: layered files, environment and flags (see
//!    [`config`]). Missing tokens are reported before any request is sent.
//! 2. **Wire observability**: `tracing-subscriber` with an `EnvFilter`
//!    (`RUST_LOG`, default `info`) and a text or JSON formatter on stderr.
//!    Every command runs inside a span carrying a fresh run id.
//! 3. **Construct infrastructure**: one shared HTTP transport, the GitHub and
//!    ZenHub clients, and the [`aggregator::Aggregator`].
//! 4. **Dispatch**: `report` renders merged pull requests and in-progress
//!    issues; the milestone commands fan out REST calls per repository.

mod commands;
mod config;
mod output;
mod render;

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;
use transport::{HttpTransport, ReqwestTransport};

use github::GitHubClient;
use report::ReportRunId;

use crate::commands::report::ReportOptions;
use crate::render::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "changelog")]
#[command(version)]
#[command(about = "Sprint changelog for a set of GitHub repositories")]
#[command(after_long_help = r#"EXAMPLES
    Report merged pull requests and work in progress since a date:
        $ changelog report --since 2019-01-08 -r fabric8-services/fabric8-auth,fabric8-services/fabric8-cluster

    Print an AsciiDoc report to stdout:
        $ changelog report --since 2019-01-08 --output - --format asciidoc

    Roll a sprint over:
        $ changelog new-milestone --name "Sprint 162" --end 2019-02-19
        $ changelog move-issues --from "Sprint 161" --to "Sprint 162"
        $ changelog close-milestone --name "Sprint 161"

ENVIRONMENT VARIABLES
    GITHUB_TOKEN                       GitHub token (or CHANGELOG_GITHUB__TOKEN)
    ZENHUB_TOKEN                       ZenHub token (or CHANGELOG_ZENHUB__TOKEN)
    CHANGELOG_REPORT__REPOSITORIES     Default repositories, comma separated
    RUST_LOG                           Log filter (default: info)
"#)]
struct Cli {
    /// Repositories to work on, as owner/name (default from configuration)
    #[arg(short, long, global = true, value_delimiter = ',')]
    repositories: Vec<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Report merged pull requests and issues in progress or review/QA
    Report {
        /// The date after which pull requests were merged (format: 2006-01-02)
        #[arg(short, long)]
        since: String,

        /// Output directory, or '-' for stdout (default from configuration)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Html)]
        format: OutputFormat,
    },
    /// Create a milestone on every repository
    NewMilestone {
        /// Title of the milestone (e.g. 'Sprint 123')
        #[arg(short, long)]
        name: String,

        /// Due date of the milestone (format: 2006-01-02)
        #[arg(short, long)]
        end: String,
    },
    /// Close the milestone with the given title on every repository
    CloseMilestone {
        /// Title of the milestone to close
        #[arg(long)]
        name: String,
    },
    /// Move all open issues from one milestone to another on every repository
    MoveIssues {
        /// Milestone to move the issues from
        #[arg(long)]
        from: String,

        /// Milestone to move the issues to
        #[arg(long)]
        to: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Report { .. } => "report",
            Commands::NewMilestone { .. } => "new-milestone",
            Commands::CloseMilestone { .. } => "close-milestone",
            Commands::MoveIssues { .. } => "move-issues",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Flag values win over configured ones. The result is sorted and free of
/// duplicates.
fn resolve_repositories(flag: &[String], configured: &[String]) -> anyhow::Result<Vec<String>> {
    let source = if flag.is_empty() { configured } else { flag };
    let mut repositories: Vec<String> = source
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    repositories.sort();
    repositories.dedup();
    if repositories.is_empty() {
        bail!("no repositories given (use --repositories or set report.repositories in changelog.toml)");
    }
    Ok(repositories)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = config::Config::load()?;
    let repositories = resolve_repositories(&cli.repositories, &config.report.repositories)?;

    let transport: Arc<dyn HttpTransport> = match config.http.timeout() {
        Some(timeout) => Arc::new(ReqwestTransport::with_timeout(timeout).context("failed to build HTTP client")?),
        None => Arc::new(ReqwestTransport::default()),
    };

    let run_id = ReportRunId::new_random();
    let span = info_span!("changelog", run_id = %run_id, command = cli.command.name());

    async move {
        info!(repositories = repositories.len(), "starting");
        match cli.command {
            Commands::Report {
                since,
                output,
                format,
            } => {
                let output = output.unwrap_or_else(|| config.report.output_dir.clone());
                let options = ReportOptions {
                    since: &since,
                    output: &output,
                    format,
                    today: chrono::Local::now().date_naive(),
                };
                let destination =
                    commands::report::handle_report(options, &repositories, &config, transport).await?;
                info!(destination = %destination, "report written");
            }
            Commands::NewMilestone { name, end } => {
                let github = Arc::new(GitHubClient::new(transport, config.github_settings()?));
                commands::milestone::handle_new_milestone(github, &repositories, &name, &end).await?;
            }
            Commands::CloseMilestone { name } => {
                let github = Arc::new(GitHubClient::new(transport, config.github_settings()?));
                commands::milestone::handle_close_milestone(github, &repositories, &name).await?;
            }
            Commands::MoveIssues { from, to } => {
                let github = Arc::new(GitHubClient::new(transport, config.github_settings()?));
                commands::milestone::handle_move_issues(github, &repositories, &from, &to).await?;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repositories_flag_is_comma_separated_and_global() {
        let cli = Cli::try_parse_from([
            "changelog",
            "report",
            "--since",
            "2019-01-01",
            "-r",
            "b/y,a/x",
            "--format",
            "asciidoc",
        ])
        .unwrap();

        assert_eq!(cli.repositories, ["b/y", "a/x"]);
        match cli.command {
            Commands::Report { since, output, format } => {
                assert_eq!(since, "2019-01-01");
                assert_eq!(output, None);
                assert_eq!(format, OutputFormat::Asciidoc);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn report_defaults_to_html() {
        let cli = Cli::try_parse_from(["changelog", "report", "-s", "2019-01-01"]).unwrap();
        assert!(matches!(cli.command, Commands::Report { format: OutputFormat::Html, .. }));
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn report_requires_since() {
        assert!(Cli::try_parse_from(["changelog", "report"]).is_err());
    }

    #[test]
    fn admin_commands_parse() {
        let cli = Cli::try_parse_from(["changelog", "move-issues", "--from", "Sprint 1", "--to", "Sprint 2"]).unwrap();
        assert_eq!(cli.command.name(), "move-issues");

        let cli = Cli::try_parse_from(["changelog", "new-milestone", "-n", "Sprint 3", "-e", "2019-02-19", "--log-format", "json"]).unwrap();
        assert_eq!(cli.command.name(), "new-milestone");
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn flag_repositories_win_and_are_sorted() {
        let configured = vec!["c/z".to_string()];
        let flag = vec!["b/y".to_string(), " a/x ".to_string(), "b/y".to_string()];

        assert_eq!(resolve_repositories(&flag, &configured).unwrap(), ["a/x", "b/y"]);
        assert_eq!(resolve_repositories(&[], &configured).unwrap(), ["c/z"]);
        assert!(resolve_repositories(&[], &[]).is_err());
    }
}
