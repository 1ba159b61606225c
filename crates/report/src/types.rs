//! Shared value types for the changelog aggregation domain.
//!
//! Records are immutable snapshots of remote state. Pages, partial results and
//! aggregates are the containers the aggregation engine moves them through.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Cursor, IssueNumber, MilestoneNumber, PullRequestNumber, ReportError, RepositoryDatabaseId,
    RepositoryId, WorkflowStage,
};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Parses an RFC 3339 timestamp such as `2019-01-05T10:00:00Z`.
    pub fn parse_rfc3339(value: &str) -> Result<Self, ReportError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| ReportError::InvalidDate {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// Parses a `YYYY-MM-DD` calendar date as midnight UTC of that day.
    pub fn start_of_day(value: &str) -> Result<Self, ReportError> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map(|date| Self(date.and_time(NaiveTime::MIN).and_utc()))
            .map_err(|e| ReportError::InvalidDate {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// Returns `true` if `self` is strictly later than `boundary`.
    pub fn is_after(self, boundary: Timestamp) -> bool {
        self.0 > boundary.0
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A record that can be accumulated into a [`PartialResult`].
pub trait Record {
    /// Per-repository unique key.
    type Key: Ord + Copy + std::fmt::Debug;

    /// Returns this record's key.
    fn key(&self) -> Self::Key;
}

/// A merged pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    /// Pull request number, unique within its repository.
    pub number: PullRequestNumber,
    /// Pull request title.
    pub title: String,
    /// When the pull request was merged.
    pub merged_at: Timestamp,
    /// Browser URL of the pull request.
    pub permalink: String,
}

impl Record for PullRequestRecord {
    type Key = PullRequestNumber;

    fn key(&self) -> Self::Key {
        self.number
    }
}

/// An open issue attached to a milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Issue number, unique within its repository.
    pub number: IssueNumber,
    /// Issue title.
    pub title: String,
    /// Browser URL of the issue.
    pub url: String,
}

impl Record for IssueRecord {
    type Key = IssueNumber;

    fn key(&self) -> Self::Key {
        self.number
    }
}

/// A single board transition reported for an issue.
///
/// Not every event moves the issue: estimate changes, for example, carry no
/// target stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// The stage the issue was moved into, if this event is a move.
    pub target_stage: Option<WorkflowStage>,
    /// The stage the issue was moved out of, if known.
    pub source_stage: Option<WorkflowStage>,
    /// When the event happened, if reported.
    pub created_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// What the API said about pages beyond the one just returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// More records can be requested by passing this cursor back.
    More(Cursor),
    /// The API explicitly reported there is nothing further.
    Exhausted,
}

impl Continuation {
    /// Returns the cursor to resume from, if any.
    pub fn cursor(&self) -> Option<&Cursor> {
        match self {
            Continuation::More(cursor) => Some(cursor),
            Continuation::Exhausted => None,
        }
    }
}

/// One page of records returned by a paginated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<R> {
    /// Records in the order the API returned them.
    pub records: Vec<R>,
    /// Where to resume.
    pub next: Continuation,
}

/// Number of records requested per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageSize(u32);

impl PageSize {
    /// Largest page GitHub's GraphQL API will serve.
    pub const MAX: u32 = 100;

    /// Creates a [`PageSize`], rejecting `0` and values above [`PageSize::MAX`].
    pub fn new(value: u32) -> Result<Self, ReportError> {
        if (1..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ReportError::InvalidPageSize { value })
        }
    }

    /// Returns the page size as an integer.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(10)
    }
}

impl TryFrom<u32> for PageSize {
    type Error = ReportError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> Self {
        size.0
    }
}

/// Pull request state filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

/// Ordering direction for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Filter parameters for a pull request page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestFilter {
    pub state: PullRequestState,
    pub direction: OrderDirection,
}

impl PullRequestFilter {
    /// Merged pull requests, ordered oldest-updated first within a page.
    pub fn merged() -> Self {
        Self {
            state: PullRequestState::Merged,
            direction: OrderDirection::Asc,
        }
    }
}

impl Default for PullRequestFilter {
    fn default() -> Self {
        Self::merged()
    }
}

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

/// The milestone a page of issues was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneSummary {
    pub number: MilestoneNumber,
    pub title: String,
}

/// One page of a milestone-issues query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneIssuePage {
    /// Numeric identifier of the repository, needed by the event API.
    pub repository_database_id: RepositoryDatabaseId,
    /// The nearest-due open milestone, or `None` if the repository has none.
    pub milestone: Option<MilestoneSummary>,
    /// Open issues of that milestone. Empty when there is no milestone.
    pub issues: Page<IssueRecord>,
}

/// All open issues of a repository's current milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneIssues {
    pub repository_database_id: RepositoryDatabaseId,
    pub milestone: MilestoneSummary,
    pub issues: PartialResult<IssueRecord>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Records of one repository, keyed by record number.
///
/// Doubles as the pagination accumulator: [`PartialResult::insert_if_absent`]
/// keeps the first record seen for a key, which is how records repeated at a
/// page boundary are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "R: Serialize, R::Key: Serialize",
    deserialize = "R: Deserialize<'de>, R::Key: Deserialize<'de>"
))]
pub struct PartialResult<R: Record> {
    records: BTreeMap<R::Key, R>,
}

impl<R: Record> PartialResult<R> {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Inserts `record` unless its key is already present.
    ///
    /// Returns `true` if the record was inserted.
    pub fn insert_if_absent(&mut self, record: R) -> bool {
        use std::collections::btree_map::Entry;

        match self.records.entry(record.key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Returns `true` if a record with `key` is present.
    pub fn contains(&self, key: &R::Key) -> bool {
        self.records.contains_key(key)
    }

    /// Returns the record stored under `key`.
    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.records.get(key)
    }

    /// Removes the record stored under `key`.
    pub fn remove(&mut self, key: &R::Key) -> Option<R> {
        self.records.remove(key)
    }

    /// Keeps only the records for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&R) -> bool) {
        self.records.retain(|_, record| keep(record));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = R::Key> + '_ {
        self.records.keys().copied()
    }

    /// Records in ascending key order.
    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }
}

impl<R: Record> Default for PartialResult<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> FromIterator<R> for PartialResult<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut result = Self::new();
        for record in iter {
            result.insert_if_absent(record);
        }
        result
    }
}

/// Per-repository results of one aggregation.
///
/// Repositories whose partial result is empty are never stored: absence from
/// the map means "nothing to report", whether because nothing qualified or
/// because the repository's task failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "R: Serialize, R::Key: Serialize",
    deserialize = "R: Deserialize<'de>, R::Key: Deserialize<'de>"
))]
pub struct AggregateResult<R: Record> {
    repositories: BTreeMap<RepositoryId, PartialResult<R>>,
}

impl<R: Record> AggregateResult<R> {
    /// Creates an empty aggregate.
    pub fn new() -> Self {
        Self {
            repositories: BTreeMap::new(),
        }
    }

    /// Stores `partial` under `repository` unless it is empty.
    ///
    /// Returns `true` if the partial result was stored.
    pub fn insert_non_empty(&mut self, repository: RepositoryId, partial: PartialResult<R>) -> bool {
        if partial.is_empty() {
            return false;
        }
        self.repositories.insert(repository, partial);
        true
    }

    /// Returns the partial result for `repository`.
    pub fn get(&self, repository: &RepositoryId) -> Option<&PartialResult<R>> {
        self.repositories.get(repository)
    }

    /// Returns `true` if `repository` contributed at least one record.
    pub fn contains(&self, repository: &RepositoryId) -> bool {
        self.repositories.contains_key(repository)
    }

    /// Repositories with results, in ascending order.
    pub fn repositories(&self) -> impl Iterator<Item = &RepositoryId> {
        self.repositories.keys()
    }

    /// `(repository, partial result)` pairs in ascending repository order.
    pub fn iter(&self) -> impl Iterator<Item = (&RepositoryId, &PartialResult<R>)> {
        self.repositories.iter()
    }

    /// Number of repositories with results.
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Total number of records across every repository.
    pub fn record_count(&self) -> usize {
        self.repositories.values().map(PartialResult::len).sum()
    }
}

impl<R: Record> Default for AggregateResult<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the rendering stage needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Pull requests merged after the boundary, per repository.
    pub merged_pull_requests: AggregateResult<PullRequestRecord>,
    /// Current-milestone issues in an accepted stage, per repository.
    pub in_progress_issues: AggregateResult<IssueRecord>,
}
