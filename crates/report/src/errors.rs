//! Error taxonomy for the changelog aggregation domain.
//!
//! Every failure in the workspace, whether it originates in input parsing, HTTP
//! transport, response decoding, or a domain condition, is expressed as a
//! [`ReportError`]. Nothing in this workspace retries: an error is logged by the
//! task that hit it and that task contributes nothing to the aggregate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Coarse classification of a [`ReportError`].
///
/// Used for structured logging: every per-repository failure is reported with
/// its category so validation problems can be told apart from flaky transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed caller input (repository identifier, date, page size).
    Validation,
    /// Network failure, non-success HTTP status, or a rejected query.
    Transport,
    /// The response body did not have the expected shape.
    Decode,
    /// A legitimate state of the remote data that yields no result.
    Domain,
    /// Missing or invalid configuration.
    Configuration,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Decode => "decode",
            ErrorCategory::Domain => "domain",
            ErrorCategory::Configuration => "configuration",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while aggregating repository state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// A repository identifier is not of the form `owner/name`.
    #[error("'{value}' is not a valid GitHub repository (format: '<owner>/<name>')")]
    InvalidRepository {
        /// The rejected input.
        value: String,
    },

    /// A date or timestamp could not be parsed.
    #[error("invalid date '{value}': {reason}")]
    InvalidDate {
        /// The rejected input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A page size outside the range the query API accepts.
    #[error("invalid page size {value} (expected 1..=100)")]
    InvalidPageSize {
        /// The rejected value.
        value: u32,
    },

    /// The request could not be sent or its response could not be read.
    #[error("{context}: transport failure: {message}")]
    Transport {
        /// What was being requested (repository, issue, endpoint).
        context: String,
        /// Underlying transport diagnostic.
        message: String,
    },

    /// The remote API answered with a non-success status.
    #[error("{context}: request failed with status {status}: {body}")]
    Status {
        /// What was being requested.
        context: String,
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The remote API answered successfully but reported errors for the query.
    #[error("{context}: query rejected: {message}")]
    Rejected {
        /// What was being requested.
        context: String,
        /// Error messages reported by the API, joined.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("{context}: unexpected response: {message}")]
    Decode {
        /// What was being requested.
        context: String,
        /// Decoder diagnostic.
        message: String,
    },

    /// The repository has no open milestone to collect issues from.
    #[error("repository '{repository}' has no open milestone")]
    NoOpenMilestone {
        /// The repository that was queried.
        repository: String,
    },

    /// No milestone with the requested title exists in the repository.
    #[error("unable to find milestone with title '{title}' in repository '{repository}'")]
    MilestoneNotFound {
        /// The repository that was queried.
        repository: String,
        /// The requested milestone title.
        title: String,
    },

    /// Configuration is missing or invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl ReportError {
    /// Returns the coarse category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::InvalidRepository { .. }
            | ReportError::InvalidDate { .. }
            | ReportError::InvalidPageSize { .. } => ErrorCategory::Validation,
            ReportError::Transport { .. }
            | ReportError::Status { .. }
            | ReportError::Rejected { .. } => ErrorCategory::Transport,
            ReportError::Decode { .. } => ErrorCategory::Decode,
            ReportError::NoOpenMilestone { .. } | ReportError::MilestoneNotFound { .. } => {
                ErrorCategory::Domain
            }
            ReportError::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Shorthand for a [`ReportError::Decode`].
    pub fn decode(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ReportError::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for a [`ReportError::Transport`].
    pub fn transport(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ReportError::Transport {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
