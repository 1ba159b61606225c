//! Cursor walkers: drive a single-page query across as many pages as needed.
//!
//! Two modes exist:
//!
//! - [`walk_merged_pull_requests`] walks *backwards* from the most recent page
//!   and stops at the first page that contributes nothing newer than the
//!   boundary.
//! - [`collect_milestone_issues`] walks *forwards* through every page of the
//!   current milestone's open issues.
//!
//! Within one repository pages are fetched strictly one after another, since
//! each request needs the previous page's cursor.

use report::{
    Continuation, Cursor, MilestoneIssueQuery, MilestoneIssues, PageSize, PartialResult,
    PullRequestFilter, PullRequestQuery, PullRequestRecord, ReportError, RepositoryId, Timestamp,
};
use tracing::{debug, trace};

/// Collects every pull request of `repository` merged strictly after `boundary`.
///
/// Each page holds the `page_size` most recently updated records before the
/// previous page, in ascending order, so records are examined last to first.
/// A record is taken when it is newer than the boundary and its number has not
/// been seen yet. The walk ends on the first page that takes nothing, or when
/// the API reports there are no earlier pages.
///
/// The stopping rule assumes timestamps decrease from page to page. A page made
/// up entirely of records already taken is indistinguishable from having crossed
/// the boundary and also ends the walk; this approximation is intentional.
pub async fn walk_merged_pull_requests(
    query: &dyn PullRequestQuery,
    repository: &RepositoryId,
    filter: PullRequestFilter,
    boundary: Timestamp,
    page_size: PageSize,
) -> Result<PartialResult<PullRequestRecord>, ReportError> {
    let mut accumulated = PartialResult::new();
    let mut cursor: Option<Cursor> = None;
    let mut pages = 0usize;

    loop {
        let page = query
            .fetch_pull_requests(repository, filter, page_size, cursor.as_ref())
            .await?;
        pages += 1;

        let taken = take_newest_first(&mut accumulated, page.records, boundary);
        debug!(
            repository = %repository,
            page = pages,
            taken,
            total = accumulated.len(),
            "processed pull request page"
        );

        if taken == 0 {
            break;
        }
        match page.next {
            Continuation::More(next) => cursor = Some(next),
            Continuation::Exhausted => break,
        }
    }

    debug!(repository = %repository, pages, merged = accumulated.len(), "pull request walk finished");
    Ok(accumulated)
}

/// Inserts qualifying records, last to first. Returns how many were inserted.
fn take_newest_first(
    accumulated: &mut PartialResult<PullRequestRecord>,
    records: Vec<PullRequestRecord>,
    boundary: Timestamp,
) -> usize {
    let mut taken = 0;
    for record in records.into_iter().rev() {
        let qualifies = record.merged_at.is_after(boundary);
        trace!(
            number = %record.number,
            merged_at = %record.merged_at,
            qualifies,
            title = %record.title,
            "examining pull request"
        );
        if qualifies && accumulated.insert_if_absent(record) {
            taken += 1;
        }
    }
    taken
}

/// Collects every open issue of the open milestone with the nearest due date.
///
/// Returns [`ReportError::NoOpenMilestone`] if the repository has none.
pub async fn collect_milestone_issues(
    query: &dyn MilestoneIssueQuery,
    repository: &RepositoryId,
    page_size: PageSize,
) -> Result<MilestoneIssues, ReportError> {
    let mut issues = PartialResult::new();
    let mut cursor: Option<Cursor> = None;

    loop {
        let page = query
            .fetch_milestone_issues(repository, page_size, cursor.as_ref())
            .await?;

        let Some(milestone) = page.milestone else {
            return Err(ReportError::NoOpenMilestone {
                repository: repository.to_string(),
            });
        };

        for issue in page.issues.records {
            issues.insert_if_absent(issue);
        }
        debug!(
            repository = %repository,
            milestone = %milestone.title,
            total = issues.len(),
            "processed milestone issue page"
        );

        match page.issues.next {
            Continuation::More(next) => cursor = Some(next),
            Continuation::Exhausted => {
                return Ok(MilestoneIssues {
                    repository_database_id: page.repository_database_id,
                    milestone,
                    issues,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        day, issue, paged_history, pr, repo, FakeMilestones, FakePullRequests,
    };

    fn size(n: u32) -> PageSize {
        PageSize::new(n).unwrap()
    }

    #[tokio::test]
    async fn keeps_only_records_after_the_boundary() {
        let fake = FakePullRequests::new().with_pages(
            "a/x",
            vec![vec![pr(1, "2018-12-20T10:00:00Z"), pr(2, "2019-01-05T10:00:00Z")]],
        );

        let merged = walk_merged_pull_requests(
            &fake,
            &repo("a/x"),
            PullRequestFilter::merged(),
            day("2019-01-01"),
            size(10),
        )
        .await
        .unwrap();

        assert_eq!(merged.keys().map(|k| k.as_u64()).collect::<Vec<_>>(), [2]);
    }

    #[tokio::test]
    async fn boundary_timestamp_is_excluded() {
        let fake = FakePullRequests::new().with_pages(
            "a/x",
            vec![vec![pr(1, "2019-01-01T00:00:00Z"), pr(2, "2019-01-01T00:00:01Z")]],
        );

        let merged = walk_merged_pull_requests(
            &fake,
            &repo("a/x"),
            PullRequestFilter::merged(),
            day("2019-01-01"),
            size(10),
        )
        .await
        .unwrap();

        assert!(!merged.contains(&report::PullRequestNumber::new(1)));
        assert!(merged.contains(&report::PullRequestNumber::new(2)));
    }

    #[tokio::test]
    async fn terminates_within_page_bound() {
        // 7 qualifying records, 5 older ones, pages of 3.
        let mut stamps: Vec<String> = (1..=7)
            .rev()
            .map(|d| format!("2019-02-{d:02}T12:00:00Z"))
            .collect();
        stamps.extend((20..25).rev().map(|d| format!("2018-12-{d:02}T12:00:00Z")));
        let fake = FakePullRequests::new().with_pages("a/x", paged_history(&stamps, 3));

        let merged = walk_merged_pull_requests(
            &fake,
            &repo("a/x"),
            PullRequestFilter::merged(),
            day("2019-01-01"),
            size(3),
        )
        .await
        .unwrap();

        assert_eq!(merged.len(), 7);
        // ceil(7 / 3) + 1
        assert!(fake.calls("a/x") <= 4, "fetched {} pages", fake.calls("a/x"));
    }

    #[tokio::test]
    async fn exact_multiple_of_page_size_needs_one_extra_page() {
        let stamps: Vec<String> = (1..=6)
            .rev()
            .map(|d| format!("2019-02-{d:02}T12:00:00Z"))
            .chain(["2018-06-01T00:00:00Z".to_string()])
            .collect();
        let fake = FakePullRequests::new().with_pages("a/x", paged_history(&stamps, 3));

        let merged = walk_merged_pull_requests(
            &fake,
            &repo("a/x"),
            PullRequestFilter::merged(),
            day("2019-01-01"),
            size(3),
        )
        .await
        .unwrap();

        assert_eq!(merged.len(), 6);
        assert_eq!(fake.calls("a/x"), 3);
    }

    #[tokio::test]
    async fn stops_when_the_api_reports_no_earlier_pages() {
        let fake = FakePullRequests::new().with_pages(
            "a/x",
            vec![
                vec![pr(3, "2019-03-01T00:00:00Z"), pr(4, "2019-03-02T00:00:00Z")],
                vec![pr(1, "2019-02-01T00:00:00Z"), pr(2, "2019-02-02T00:00:00Z")],
            ],
        );

        let merged = walk_merged_pull_requests(
            &fake,
            &repo("a/x"),
            PullRequestFilter::merged(),
            day("2019-01-01"),
            size(2),
        )
        .await
        .unwrap();

        assert_eq!(merged.len(), 4);
        assert_eq!(fake.calls("a/x"), 2);
    }

    #[tokio::test]
    async fn a_page_of_repeated_records_ends_the_walk() {
        let fake = FakePullRequests::new().with_pages(
            "a/x",
            vec![
                vec![pr(3, "2019-03-01T00:00:00Z"), pr(4, "2019-03-02T00:00:00Z")],
                vec![pr(3, "2019-03-01T00:00:00Z"), pr(4, "2019-03-02T00:00:00Z")],
                vec![pr(1, "2019-02-01T00:00:00Z"), pr(2, "2019-02-02T00:00:00Z")],
            ],
        );

        let merged = walk_merged_pull_requests(
            &fake,
            &repo("a/x"),
            PullRequestFilter::merged(),
            day("2019-01-01"),
            size(2),
        )
        .await
        .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(fake.calls("a/x"), 2);
    }

    #[tokio::test]
    async fn boundary_record_repeated_on_next_page_is_kept_once() {
        let fake = FakePullRequests::new().with_pages(
            "a/x",
            vec![
                vec![pr(3, "2019-03-01T00:00:00Z"), pr(4, "2019-03-02T00:00:00Z")],
                vec![pr(2, "2019-02-01T00:00:00Z"), pr(3, "2019-03-01T00:00:00Z")],
                vec![pr(1, "2018-02-01T00:00:00Z"), pr(2, "2019-02-01T00:00:00Z")],
            ],
        );

        let merged = walk_merged_pull_requests(
            &fake,
            &repo("a/x"),
            PullRequestFilter::merged(),
            day("2019-01-01"),
            size(2),
        )
        .await
        .unwrap();

        assert_eq!(
            merged.keys().map(|k| k.as_u64()).collect::<Vec<_>>(),
            [2, 3, 4]
        );
    }

    #[tokio::test]
    async fn repeated_walks_agree() {
        let stamps: Vec<String> = (1..=9)
            .rev()
            .map(|d| format!("2019-01-{d:02}T08:00:00Z"))
            .collect();
        let fake = FakePullRequests::new().with_pages("a/x", paged_history(&stamps, 4));
        let boundary = day("2019-01-03");

        let first = walk_merged_pull_requests(
            &fake,
            &repo("a/x"),
            PullRequestFilter::merged(),
            boundary,
            size(4),
        )
        .await
        .unwrap();
        let second = walk_merged_pull_requests(
            &fake,
            &repo("a/x"),
            PullRequestFilter::merged(),
            boundary,
            size(4),
        )
        .await
        .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
    }

    #[tokio::test]
    async fn page_errors_propagate() {
        let fake = FakePullRequests::new().failing("a/x");

        let err = walk_merged_pull_requests(
            &fake,
            &repo("a/x"),
            PullRequestFilter::merged(),
            day("2019-01-01"),
            size(2),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ReportError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn collects_every_milestone_page() {
        let fake = FakeMilestones::new().with_milestone(
            "a/x",
            144640567,
            "Sprint 160",
            vec![
                vec![issue(59, "Endpoint to obtain cluster info"), issue(60, "Docs")],
                vec![issue(61, "Tests")],
            ],
        );

        let collected = collect_milestone_issues(&fake, &repo("a/x"), size(2))
            .await
            .unwrap();

        assert_eq!(collected.repository_database_id.as_u64(), 144640567);
        assert_eq!(collected.milestone.title, "Sprint 160");
        assert_eq!(
            collected.issues.keys().map(|k| k.as_u64()).collect::<Vec<_>>(),
            [59, 60, 61]
        );
    }

    #[tokio::test]
    async fn missing_milestone_is_reported() {
        let fake = FakeMilestones::new().without_milestone("a/x", 1);

        let err = collect_milestone_issues(&fake, &repo("a/x"), size(2))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ReportError::NoOpenMilestone {
                repository: "a/x".to_string()
            }
        );
    }
}
