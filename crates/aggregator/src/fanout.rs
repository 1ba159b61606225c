//! Per-repository fan-out.
//!
//! One `tokio` task is spawned per repository and every task is awaited before
//! the caller sees any result. Each task owns exactly one repository key and
//! returns its own private result; results are merged only after the join, so no
//! two tasks ever touch the same entry and no lock is needed.
//!
//! There is no concurrency cap and no timeout: fan-out width equals the number
//! of distinct repositories, and a stalled request delays the join.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use report::{AggregateResult, ErrorCategory, PartialResult, Record, ReportError, RepositoryId};
use tracing::{debug, error, info_span, warn, Instrument};

/// Runs `work` once per distinct, well-formed repository and waits for all of
/// them.
///
/// Identifiers that do not parse are logged and skipped before any task is
/// spawned. A task that panics is logged and left out of the returned map.
pub async fn join_per_repository<I, S, T, F, Fut>(
    repositories: I,
    operation: &'static str,
    work: F,
) -> BTreeMap<RepositoryId, Result<T, ReportError>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    T: Send + 'static,
    F: Fn(RepositoryId) -> Fut,
    Fut: Future<Output = Result<T, ReportError>> + Send + 'static,
{
    let mut distinct = BTreeSet::new();
    for raw in repositories {
        match RepositoryId::parse(raw.as_ref()) {
            Ok(repository) => {
                distinct.insert(repository);
            }
            Err(e) => error!(operation, error = %e, "skipping repository"),
        }
    }

    let mut handles = Vec::with_capacity(distinct.len());
    for repository in distinct {
        let span = info_span!("repository", operation, repository = %repository);
        let handle = tokio::spawn(work(repository.clone()).instrument(span));
        handles.push((repository, handle));
    }

    let mut outcomes = BTreeMap::new();
    for (repository, handle) in handles {
        match handle.await {
            Ok(result) => {
                outcomes.insert(repository, result);
            }
            Err(e) => {
                error!(operation, repository = %repository, error = %e, "repository task did not complete");
            }
        }
    }
    outcomes
}

/// Runs `work` per repository and merges the successful, non-empty partial
/// results into one [`AggregateResult`].
///
/// A failed repository is logged and omitted; it never affects its siblings.
pub async fn fan_out<I, S, R, F, Fut>(
    repositories: I,
    operation: &'static str,
    work: F,
) -> AggregateResult<R>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    R: Record + Send + 'static,
    R::Key: Send,
    F: Fn(RepositoryId) -> Fut,
    Fut: Future<Output = Result<PartialResult<R>, ReportError>> + Send + 'static,
{
    let outcomes = join_per_repository(repositories, operation, work).await;

    let mut aggregate = AggregateResult::new();
    for (repository, outcome) in outcomes {
        match outcome {
            Ok(partial) => {
                let count = partial.len();
                if aggregate.insert_non_empty(repository.clone(), partial) {
                    debug!(operation, repository = %repository, count, "repository contributed records");
                } else {
                    debug!(operation, repository = %repository, "repository has nothing to report");
                }
            }
            Err(e) => log_failure(operation, &repository, &e),
        }
    }
    aggregate
}

fn log_failure(operation: &'static str, repository: &RepositoryId, err: &ReportError) {
    let category = err.category();
    match category {
        ErrorCategory::Domain => {
            warn!(operation, repository = %repository, %category, error = %err, "repository skipped");
        }
        _ => {
            error!(operation, repository = %repository, %category, error = %err, "repository failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use report::{IssueRecord, PullRequestFilter, Timestamp};

    use super::*;
    use crate::testing::{day, issue, pr, FakePullRequests};
    use crate::walker::walk_merged_pull_requests;

    #[tokio::test]
    async fn failing_repository_does_not_affect_siblings() {
        let fake = Arc::new(
            FakePullRequests::new()
                .with_pages("a/x", vec![vec![pr(1, "2019-01-05T00:00:00Z")]])
                .failing("a/y")
                .with_pages("a/z", vec![vec![pr(7, "2019-01-06T00:00:00Z")]]),
        );
        let boundary = day("2019-01-01");

        let aggregate = fan_out(["a/x", "a/y", "a/z"], "merged pull requests", |repo| {
            let fake = Arc::clone(&fake);
            async move {
                walk_merged_pull_requests(
                    fake.as_ref(),
                    &repo,
                    PullRequestFilter::merged(),
                    boundary,
                    Default::default(),
                )
                .await
            }
        })
        .await;

        let keys: Vec<String> = aggregate.repositories().map(ToString::to_string).collect();
        assert_eq!(keys, ["a/x", "a/z"]);
    }

    #[tokio::test]
    async fn invalid_identifiers_never_reach_the_work_function() {
        let started = Arc::new(AtomicUsize::new(0));

        let outcomes = join_per_repository(["a/x", "not-a-repo", "a/x/y"], "probe", |repo| {
            let started = Arc::clone(&started);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ReportError>(repo.to_string())
            }
        })
        .await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_repositories_run_once() {
        let started = Arc::new(AtomicUsize::new(0));

        let outcomes = join_per_repository(["a/x", "a/x", " a/x"], "probe", |_| {
            let started = Arc::clone(&started);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ReportError>(())
            }
        })
        .await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.len(), 1);
    }

    #[tokio::test]
    async fn panicking_task_is_omitted() {
        let outcomes = join_per_repository(["a/x", "a/y"], "probe", |repo| async move {
            if repo.name() == "y" {
                panic!("boom");
            }
            Ok::<_, ReportError>(1)
        })
        .await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes.contains_key(&RepositoryId::parse("a/x").unwrap()));
    }

    #[tokio::test]
    async fn empty_results_are_absent_from_the_aggregate() {
        let aggregate: AggregateResult<IssueRecord> =
            fan_out(["a/x", "a/y"], "issues", |repo| async move {
                let mut partial = PartialResult::new();
                if repo.name() == "x" {
                    partial.insert_if_absent(issue(1, "only"));
                }
                Ok(partial)
            })
            .await;

        assert_eq!(aggregate.len(), 1);
        assert!(aggregate.contains(&RepositoryId::parse("a/x").unwrap()));
        assert!(!aggregate.contains(&RepositoryId::parse("a/y").unwrap()));
    }

    #[tokio::test]
    async fn every_task_finishes_before_returning() {
        let finished = Arc::new(AtomicUsize::new(0));
        let repos: Vec<String> = (0..16).map(|i| format!("org/repo-{i}")).collect();

        let outcomes = join_per_repository(&repos, "probe", |_| {
            let finished = Arc::clone(&finished);
            async move {
                tokio::task::yield_now().await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ReportError>(Timestamp::now())
            }
        })
        .await;

        assert_eq!(outcomes.len(), 16);
        assert_eq!(finished.load(Ordering::SeqCst), 16);
    }
}
