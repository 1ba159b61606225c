//! Workflow-stage classification rules.
//!
//! An issue counts as "in progress" when the most recent board transition
//! reported for it moved it into one of the [`AcceptedStages`]. Only the first
//! event of the list (the most recent) is consulted.

use serde::{Deserialize, Serialize};

use crate::{ReportError, WorkflowEvent, WorkflowStage};

/// The "In Progress" board column.
pub const IN_PROGRESS: &str = "In Progress";

/// The "Review/QA" board column.
pub const REVIEW_QA: &str = "Review/QA";

/// Set of stages an issue must have most recently moved into to be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AcceptedStages(Vec<WorkflowStage>);

impl AcceptedStages {
    /// Creates a set from stage names.
    ///
    /// Returns [`ReportError::Configuration`] if no non-empty name is given.
    pub fn new<I, S>(names: I) -> Result<Self, ReportError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut stages: Vec<WorkflowStage> = Vec::new();
        for stage in names.into_iter().filter_map(WorkflowStage::new) {
            if !stages.contains(&stage) {
                stages.push(stage);
            }
        }
        if stages.is_empty() {
            return Err(ReportError::Configuration {
                message: "at least one accepted workflow stage is required".to_string(),
            });
        }
        Ok(Self(stages))
    }

    /// Returns `true` if `stage` is in the set (exact, case-sensitive match).
    pub fn contains(&self, stage: &WorkflowStage) -> bool {
        self.0.contains(stage)
    }

    /// The stages in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkflowStage> {
        self.0.iter()
    }
}

impl Default for AcceptedStages {
    fn default() -> Self {
        Self(
            [IN_PROGRESS, REVIEW_QA]
                .into_iter()
                .filter_map(WorkflowStage::new)
                .collect(),
        )
    }
}

impl TryFrom<Vec<String>> for AcceptedStages {
    type Error = ReportError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AcceptedStages> for Vec<String> {
    fn from(stages: AcceptedStages) -> Self {
        stages.0.into_iter().map(|s| s.as_str().to_string()).collect()
    }
}

/// Outcome of classifying one issue from its event history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageDecision {
    /// No events at all: the issue was never placed on the board.
    Untriaged,
    /// The latest event moved the issue into an accepted stage.
    Accepted(WorkflowStage),
    /// The latest event moved the issue elsewhere, or was not a move.
    Rejected(Option<WorkflowStage>),
}

impl StageDecision {
    /// Classifies an issue from its events, most recent first.
    pub fn from_events(events: &[WorkflowEvent], accepted: &AcceptedStages) -> Self {
        let Some(latest) = events.first() else {
            return StageDecision::Untriaged;
        };
        match &latest.target_stage {
            Some(stage) if accepted.contains(stage) => StageDecision::Accepted(stage.clone()),
            other => StageDecision::Rejected(other.clone()),
        }
    }

    /// Returns `true` if the issue should stay in the report.
    pub fn is_retained(&self) -> bool {
        matches!(self, StageDecision::Accepted(_))
    }
}
