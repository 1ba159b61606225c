//! Secondary state classification of milestone issues.

use report::{
    AcceptedStages, IssueEventQuery, IssueNumber, IssueRecord, PartialResult, ReportError,
    RepositoryDatabaseId, StageDecision,
};
use tracing::debug;

/// Removes from `issues` every issue whose latest workflow event did not move it
/// into one of the `accepted` stages.
///
/// Issues are classified one after another, one event request each. The first
/// failed request aborts the whole pass; `issues` may then be partially
/// filtered and must be discarded by the caller.
pub async fn retain_in_progress(
    events: &dyn IssueEventQuery,
    repository: RepositoryDatabaseId,
    issues: &mut PartialResult<IssueRecord>,
    accepted: &AcceptedStages,
) -> Result<(), ReportError> {
    let candidates: Vec<IssueNumber> = issues.keys().collect();

    for number in candidates {
        let history = events.fetch_issue_events(repository, number).await?;
        let decision = StageDecision::from_events(&history, accepted);
        debug!(repository = %repository, issue = %number, ?decision, "classified issue");

        if !decision.is_retained() {
            issues.remove(&number);
        }
    }

    Ok(())
}
