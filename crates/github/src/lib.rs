//! GitHub infrastructure adapter.
//!
//! Implements the paginated query ports defined in the [`report`] crate
//! (`PullRequestQuery`, `MilestoneIssueQuery`) over the GraphQL API, and the
//! REST milestone administration used by the sprint housekeeping commands.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! Authentication, query documents, wire shapes and pagination cursors are
//! handled here; the [`report`] and `aggregator` crates never see them.
//!
//! All HTTP goes through a [`transport::HttpTransport`], so tests substitute
//! `transport::MockTransport` for the network.

mod client;
mod graphql;
pub mod milestones;
mod queries;

pub use client::{GitHubClient, GitHubSettings};
pub use milestones::{Milestone, MilestoneIssue, MilestoneRef, MilestoneState};
