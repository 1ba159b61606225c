//! ZenHub infrastructure adapter.
//!
//! Implements [`report::IssueEventQuery`] over the ZenHub REST API: one
//! request per issue, returning the board transitions most recent first.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Authentication, endpoint layout and the event wire shape
//! live here; the classification rule itself lives in [`report::stages`].

mod client;

pub use client::{ZenHubClient, ZenHubSettings};
