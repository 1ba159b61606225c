//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging (for example)
//! an [`IssueNumber`] with a [`PullRequestNumber`] even though both are `u64` under
//! the hood.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ReportError;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy, Ord), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// The per-repository number of a pull request.
    PullRequestNumber
}

u64_id! {
    /// The per-repository number of an issue.
    IssueNumber
}

u64_id! {
    /// The per-repository number of a milestone, as used by the REST API.
    MilestoneNumber
}

u64_id! {
    /// GitHub's numeric database identifier for a repository.
    ///
    /// ZenHub addresses repositories by this value rather than by name.
    RepositoryDatabaseId
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Opaque pagination token returned by a paginated API.
    ///
    /// Only ever passed back to the API that produced it.
    Cursor
}

string_id! {
    /// A named position in the ZenHub board (e.g. `"In Progress"`).
    WorkflowStage
}

// ---------------------------------------------------------------------------
// Repository identifier
// ---------------------------------------------------------------------------

/// Identifies a GitHub repository in `"owner/name"` format.
///
/// Construction goes through [`RepositoryId::parse`], which enforces that exactly
/// one `/` separates two non-empty parts. Malformed identifiers are therefore
/// rejected before any network call can be made with them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryId {
    owner: String,
    name: String,
}

impl RepositoryId {
    /// Parses an `"owner/name"` string.
    pub fn parse(value: &str) -> Result<Self, ReportError> {
        let trimmed = value.trim();
        let invalid = || ReportError::InvalidRepository {
            value: value.to_string(),
        };

        let (owner, name) = trimmed.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// The account or organisation owning the repository.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name within its owner.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryId {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepositoryId {
    type Error = ReportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepositoryId> for String {
    fn from(id: RepositoryId) -> Self {
        id.to_string()
    }
}

// Ordered as the "owner/name" string so that rendered output follows the same
// order as a sorted repository list.
impl Ord for RepositoryId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.owner
            .as_bytes()
            .iter()
            .chain(b"/")
            .chain(self.name.as_bytes())
            .cmp(
                other
                    .owner
                    .as_bytes()
                    .iter()
                    .chain(b"/")
                    .chain(other.name.as_bytes()),
            )
    }
}

impl PartialOrd for RepositoryId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single invocation of the CLI.
///
/// Generated fresh for every run and attached to the top-level tracing span so
/// that all log lines from concurrent repository tasks can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportRunId(Uuid);

impl ReportRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ReportRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
