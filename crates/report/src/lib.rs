//! Core domain for the changelog aggregator.
//!
//! This crate contains every domain concept, newtype identifier, record and
//! result type, and the error taxonomy used throughout the workspace.
//! Infrastructure crates implement the port traits defined here; they never
//! add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RepositoryId`, `IssueNumber`, `Cursor`, etc.) |
//! | [`types`] | Records, pages, partial and aggregate results, `Report` |
//! | [`stages`] | Workflow-stage acceptance rules |
//! | [`ports`] | Traits for the paginated query and issue-event APIs |
//! | [`errors`] | `ReportError` and its categories |

pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod stages;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{ErrorCategory, ReportError};
pub use identifiers::{
    Cursor, IssueNumber, MilestoneNumber, PullRequestNumber, ReportRunId, RepositoryDatabaseId,
    RepositoryId, WorkflowStage,
};
pub use ports::{IssueEventQuery, MilestoneIssueQuery, PullRequestQuery};
pub use stages::{AcceptedStages, StageDecision, IN_PROGRESS, REVIEW_QA};
pub use types::{
    AggregateResult, Continuation, IssueRecord, MilestoneIssuePage, MilestoneIssues,
    MilestoneSummary, OrderDirection, Page, PageSize, PartialResult, PullRequestFilter,
    PullRequestRecord, PullRequestState, Record, Report, Timestamp, WorkflowEvent,
};
