//! Report rendering.
//!
//! Repositories appear in sorted order and records in ascending number order
//! within a repository; both orders come from the report's map types.

use std::fmt::Write as _;

use clap::ValueEnum;

use report::{AggregateResult, IssueRecord, PullRequestRecord, Report};

pub const DONE_HEADING: &str = "Done since last week";
pub const IN_PROGRESS_HEADING: &str = "Currently working on";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Html,
    Asciidoc,
    Json,
}

impl OutputFormat {
    /// File extension of a rendered report.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Asciidoc => "asciidoc",
            OutputFormat::Json => "json",
        }
    }
}

/// A line item: link target, link text, trailing title.
struct Entry<'a> {
    url: &'a str,
    number: u64,
    title: &'a str,
}

trait Entries {
    fn entries(&self) -> Vec<(String, Vec<Entry<'_>>)>;
}

impl Entries for AggregateResult<PullRequestRecord> {
    fn entries(&self) -> Vec<(String, Vec<Entry<'_>>)> {
        self.iter()
            .map(|(repository, partial)| {
                let items = partial
                    .records()
                    .map(|pr| Entry {
                        url: &pr.permalink,
                        number: pr.number.as_u64(),
                        title: &pr.title,
                    })
                    .collect();
                (repository.to_string(), items)
            })
            .collect()
    }
}

impl Entries for AggregateResult<IssueRecord> {
    fn entries(&self) -> Vec<(String, Vec<Entry<'_>>)> {
        self.iter()
            .map(|(repository, partial)| {
                let items = partial
                    .records()
                    .map(|issue| Entry {
                        url: &issue.url,
                        number: issue.number.as_u64(),
                        title: &issue.title,
                    })
                    .collect();
                (repository.to_string(), items)
            })
            .collect()
    }
}

pub fn render(report: &Report, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Asciidoc => Ok(asciidoc(report)),
        OutputFormat::Html => Ok(html(report)),
        OutputFormat::Json => serde_json::to_string_pretty(report).map(|mut s| {
            s.push('\n');
            s
        }),
    }
}

// ---------------------------------------------------------------------------
// AsciiDoc
// ---------------------------------------------------------------------------

fn asciidoc(report: &Report) -> String {
    let mut out = String::new();
    asciidoc_section(&mut out, DONE_HEADING, &report.merged_pull_requests.entries());
    out.push('\n');
    asciidoc_section(&mut out, IN_PROGRESS_HEADING, &report.in_progress_issues.entries());
    out
}

fn asciidoc_section(out: &mut String, heading: &str, groups: &[(String, Vec<Entry<'_>>)]) {
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{heading}:\n");
    for (repository, entries) in groups {
        let _ = writeln!(out, "* {repository}:");
        for entry in entries {
            let _ = writeln!(out, "** [{}[{}]] {}", entry.url, entry.number, entry.title);
        }
        out.push('\n');
    }
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

fn html(report: &Report) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Changelog</title>\n</head>\n<body>\n",
    );
    html_section(&mut out, DONE_HEADING, &report.merged_pull_requests.entries());
    html_section(&mut out, IN_PROGRESS_HEADING, &report.in_progress_issues.entries());
    out.push_str("</body>\n</html>\n");
    out
}

fn html_section(out: &mut String, heading: &str, groups: &[(String, Vec<Entry<'_>>)]) {
    let _ = writeln!(out, "<h2>{}</h2>", escape(heading));
    if groups.is_empty() {
        return;
    }
    out.push_str("<ul>\n");
    for (repository, entries) in groups {
        let _ = writeln!(out, "<li>{}:\n<ul>", escape(repository));
        for entry in entries {
            let _ = writeln!(
                out,
                "<li>[<a href=\"{}\">{}</a>] {}</li>",
                escape(entry.url),
                entry.number,
                escape(entry.title)
            );
        }
        out.push_str("</ul>\n</li>\n");
    }
    out.push_str("</ul>\n");
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use report::{IssueNumber, PartialResult, PullRequestNumber, RepositoryId, Timestamp};

    use super::*;

    fn sample() -> Report {
        let mut report = Report::default();

        let prs: PartialResult<PullRequestRecord> = [710, 709]
            .into_iter()
            .map(|n| PullRequestRecord {
                number: PullRequestNumber::new(n),
                title: format!("Change {n}"),
                merged_at: Timestamp::parse_rfc3339("2019-01-05T00:00:00Z").unwrap(),
                permalink: format!("https://github.com/f/auth/pull/{n}"),
            })
            .collect();
        report
            .merged_pull_requests
            .insert_non_empty(RepositoryId::parse("f/auth").unwrap(), prs);

        let issues: PartialResult<IssueRecord> = [IssueRecord {
            number: IssueNumber::new(59),
            title: "Cluster info <by> API & URL".to_string(),
            url: "https://github.com/f/cluster/issues/59".to_string(),
        }]
        .into_iter()
        .collect();
        report
            .in_progress_issues
            .insert_non_empty(RepositoryId::parse("f/cluster").unwrap(), issues);

        report
    }

    #[test]
    fn asciidoc_groups_by_repository_in_number_order() {
        let text = render(&sample(), OutputFormat::Asciidoc).unwrap();

        assert_eq!(
            text,
            "Done since last week:\n\n\
             * f/auth:\n\
             ** [https://github.com/f/auth/pull/709[709]] Change 709\n\
             ** [https://github.com/f/auth/pull/710[710]] Change 710\n\n\
             \n\
             Currently working on:\n\n\
             * f/cluster:\n\
             ** [https://github.com/f/cluster/issues/59[59]] Cluster info <by> API & URL\n\n"
        );
    }

    #[test]
    fn html_is_escaped() {
        let text = render(&sample(), OutputFormat::Html).unwrap();

        assert!(text.contains("<h2>Done since last week</h2>"));
        assert!(text.contains("<h2>Currently working on</h2>"));
        assert!(text.contains("Cluster info &lt;by&gt; API &amp; URL"));
        assert!(text.contains("<a href=\"https://github.com/f/auth/pull/709\">709</a>"));
        assert!(text.find("709").unwrap() < text.find("710").unwrap());
    }

    #[test]
    fn empty_report_still_has_both_headings() {
        let text = render(&Report::default(), OutputFormat::Html).unwrap();
        assert!(text.contains(DONE_HEADING));
        assert!(text.contains(IN_PROGRESS_HEADING));
        assert!(!text.contains("<ul>"));
    }

    #[test]
    fn json_exposes_both_sections() {
        let text = render(&sample(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(
            value["in_progress_issues"]["repositories"]["f/cluster"]["records"]["59"]["url"],
            "https://github.com/f/cluster/issues/59"
        );
        assert!(value["merged_pull_requests"]["repositories"]["f/auth"]["records"]
            .get("709")
            .is_some());
    }

    #[test]
    fn extensions_match_the_format_names() {
        assert_eq!(OutputFormat::Html.extension(), "html");
        assert_eq!(OutputFormat::Asciidoc.extension(), "asciidoc");
        assert_eq!(OutputFormat::Json.extension(), "json");
    }
}
