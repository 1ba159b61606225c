//! In-memory port implementations for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use report::{
    Continuation, Cursor, IssueEventQuery, IssueNumber, IssueRecord, MilestoneIssuePage,
    MilestoneIssueQuery, MilestoneNumber, MilestoneSummary, Page, PageSize, PullRequestFilter,
    PullRequestNumber, PullRequestQuery, PullRequestRecord, ReportError, RepositoryDatabaseId,
    RepositoryId, Timestamp, WorkflowEvent, WorkflowStage,
};

pub fn repo(value: &str) -> RepositoryId {
    RepositoryId::parse(value).unwrap()
}

pub fn day(value: &str) -> Timestamp {
    Timestamp::start_of_day(value).unwrap()
}

pub fn pr(number: u64, merged_at: &str) -> PullRequestRecord {
    PullRequestRecord {
        number: PullRequestNumber::new(number),
        title: format!("PR {number}"),
        merged_at: Timestamp::parse_rfc3339(merged_at).unwrap(),
        permalink: format!("https://github.com/a/x/pull/{number}"),
    }
}

pub fn issue(number: u64, title: &str) -> IssueRecord {
    IssueRecord {
        number: IssueNumber::new(number),
        title: title.to_string(),
        url: format!("https://github.com/a/x/issues/{number}"),
    }
}

/// Splits a newest-first list of merge timestamps into API-shaped pages: each
/// page ascending, pages ordered newest first. The newest record gets the
/// highest number.
pub fn paged_history(newest_first: &[String], page_size: usize) -> Vec<Vec<PullRequestRecord>> {
    let total = newest_first.len() as u64;
    let records: Vec<PullRequestRecord> = newest_first
        .iter()
        .enumerate()
        .map(|(i, stamp)| pr(total - i as u64, stamp))
        .collect();
    records
        .chunks(page_size)
        .map(|chunk| chunk.iter().rev().cloned().collect())
        .collect()
}

fn page_index(cursor: Option<&Cursor>) -> usize {
    cursor
        .and_then(|c| c.as_str().strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn continuation_after(index: usize, pages: usize) -> Continuation {
    if index + 1 < pages {
        Continuation::More(Cursor::new(format!("page-{}", index + 1)).unwrap())
    } else {
        Continuation::Exhausted
    }
}

// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePullRequests {
    pages: HashMap<String, Vec<Vec<PullRequestRecord>>>,
    failing: HashSet<String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakePullRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, repository: &str, pages: Vec<Vec<PullRequestRecord>>) -> Self {
        self.pages.insert(repository.to_string(), pages);
        self
    }

    pub fn failing(mut self, repository: &str) -> Self {
        self.failing.insert(repository.to_string());
        self
    }

    pub fn calls(&self, repository: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(repository)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PullRequestQuery for FakePullRequests {
    async fn fetch_pull_requests(
        &self,
        repository: &RepositoryId,
        _filter: PullRequestFilter,
        _page_size: PageSize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<PullRequestRecord>, ReportError> {
        let key = repository.to_string();
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;

        if self.failing.contains(&key) {
            return Err(ReportError::Status {
                context: key,
                status: 502,
                body: "Bad Gateway".to_string(),
            });
        }

        let pages = self.pages.get(&key).cloned().unwrap_or_default();
        let index = page_index(cursor);
        Ok(Page {
            records: pages.get(index).cloned().unwrap_or_default(),
            next: continuation_after(index, pages.len()),
        })
    }
}

// ---------------------------------------------------------------------------

struct MilestoneFixture {
    database_id: u64,
    title: Option<String>,
    pages: Vec<Vec<IssueRecord>>,
}

#[derive(Default)]
pub struct FakeMilestones {
    repositories: HashMap<String, MilestoneFixture>,
    failing: HashSet<String>,
}

impl FakeMilestones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_milestone(
        mut self,
        repository: &str,
        database_id: u64,
        title: &str,
        pages: Vec<Vec<IssueRecord>>,
    ) -> Self {
        self.repositories.insert(
            repository.to_string(),
            MilestoneFixture {
                database_id,
                title: Some(title.to_string()),
                pages,
            },
        );
        self
    }

    pub fn without_milestone(mut self, repository: &str, database_id: u64) -> Self {
        self.repositories.insert(
            repository.to_string(),
            MilestoneFixture {
                database_id,
                title: None,
                pages: Vec::new(),
            },
        );
        self
    }

    pub fn failing(mut self, repository: &str) -> Self {
        self.failing.insert(repository.to_string());
        self
    }
}

#[async_trait]
impl MilestoneIssueQuery for FakeMilestones {
    async fn fetch_milestone_issues(
        &self,
        repository: &RepositoryId,
        _page_size: PageSize,
        cursor: Option<&Cursor>,
    ) -> Result<MilestoneIssuePage, ReportError> {
        let key = repository.to_string();
        if self.failing.contains(&key) {
            return Err(ReportError::transport(key, "connection reset"));
        }
        let fixture = self
            .repositories
            .get(&key)
            .ok_or_else(|| ReportError::decode(key.clone(), "repository not found"))?;

        let index = page_index(cursor);
        Ok(MilestoneIssuePage {
            repository_database_id: RepositoryDatabaseId::new(fixture.database_id),
            milestone: fixture.title.as_ref().map(|title| MilestoneSummary {
                number: MilestoneNumber::new(1),
                title: title.clone(),
            }),
            issues: Page {
                records: fixture.pages.get(index).cloned().unwrap_or_default(),
                next: continuation_after(index, fixture.pages.len()),
            },
        })
    }
}

// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeEvents {
    events: HashMap<u64, Vec<WorkflowEvent>>,
    failing: HashSet<u64>,
    calls: AtomicUsize,
}

impl FakeEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers moves into `stages`, most recent first.
    pub fn with_moves(mut self, issue: u64, stages: &[&str]) -> Self {
        let events = stages
            .iter()
            .map(|stage| WorkflowEvent {
                target_stage: WorkflowStage::new(*stage),
                source_stage: None,
                created_at: None,
            })
            .collect();
        self.events.insert(issue, events);
        self
    }

    pub fn failing(mut self, issue: u64) -> Self {
        self.failing.insert(issue);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueEventQuery for FakeEvents {
    async fn fetch_issue_events(
        &self,
        repository: RepositoryDatabaseId,
        issue: IssueNumber,
    ) -> Result<Vec<WorkflowEvent>, ReportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&issue.as_u64()) {
            return Err(ReportError::transport(
                format!("events for issue {issue} of repository {repository}"),
                "connection reset",
            ));
        }
        Ok(self.events.get(&issue.as_u64()).cloned().unwrap_or_default())
    }
}
