pub mod milestone;
pub mod report;

use std::collections::BTreeMap;

use anyhow::bail;
use ::report::{ReportError, RepositoryId};
use tracing::error;

/// Logs every failed repository and fails the command if there was any.
///
/// `on_success` is called once per repository that completed.
pub(crate) fn summarize<T>(
    operation: &str,
    outcomes: BTreeMap<RepositoryId, Result<T, ReportError>>,
    mut on_success: impl FnMut(&RepositoryId, T),
) -> anyhow::Result<()> {
    let total = outcomes.len();
    let mut failed = 0;
    for (repository, outcome) in outcomes {
        match outcome {
            Ok(value) => on_success(&repository, value),
            Err(e) => {
                failed += 1;
                error!(operation, repository = %repository, category = %e.category(), error = %e, "repository failed");
            }
        }
    }
    if failed > 0 {
        bail!("{operation}: {failed} of {total} repositories failed");
    }
    Ok(())
}
