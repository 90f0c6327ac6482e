//! Incremental scan engine.
//!
//! Brings the local cache up to date with the currently-open issues of one
//! repository: load the prior scan baseline, walk the upstream pages under a
//! hard cap, filter out pull requests, write each page through to the store
//! as an atomic batch, then record fresh scan metadata and classify the
//! outcome.
//!
//! The paged loop is strictly sequential: each page's round-trip and store
//! write completes before the next page is requested, so only one page of
//! issues is held in memory at a time. Concurrent scans of *different*
//! repositories never interfere (all keys are repo-scoped). Concurrent scans
//! of the *same* repository are not coordinated: both may read the same
//! baseline and double-count `new_fetched`, though the stored rows stay
//! correct because upserts are idempotent.

use chrono::Utc;
use thiserror::Error;

use crate::github::{FetchError, IssueSource};
use crate::models::{Issue, ScanState, ScanStatus, ScanSummary};
use crate::store::IssueStore;

/// Issues requested per page.
pub const PAGE_SIZE: u32 = 100;

/// Hard cap on pages walked in one invocation. Bounds worst-case API usage
/// against a large, active repository; repeated incremental scans still
/// converge to completeness.
pub const MAX_PAGES: u32 = 10;

/// Terminal failures of a scan invocation.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Upstream reported 404 for the first page: the repository does not
    /// exist. Nothing was written.
    #[error("repository not found: {repo}")]
    RepoNotFound { repo: String },

    /// An unexpected upstream response aborted the scan mid-loop. Pages
    /// already written stay committed; no scan state was recorded.
    #[error("scan of {repo} aborted")]
    Fetch {
        repo: String,
        #[source]
        source: FetchError,
    },

    #[error("storage error")]
    Store(#[from] sqlx::Error),
}

/// Run one scan of `repo` against `source`, writing through to `store`.
///
/// Returns the outcome summary; see [`ScanError`] for the failure modes.
/// Re-invoking after a failure is safe: upserts are idempotent, so pages
/// replayed on retry do not duplicate rows.
pub async fn run_scan(
    store: &IssueStore,
    source: &dyn IssueSource,
    repo: &str,
) -> Result<ScanSummary, ScanError> {
    // Resolve baseline: an existing scan bounds the fetch from below, so
    // already-seen issues are never re-transferred.
    let baseline = store.get_scan_state(repo).await?;
    let since = baseline.as_ref().map(|state| state.last_scanned_at);
    let before_count = store.count_issues(repo).await?;

    let mut issues_fetched: i64 = 0;

    for page in 1..=MAX_PAGES {
        let records = match source.fetch_page(repo, page, PAGE_SIZE, since).await {
            Ok(records) => records,
            Err(FetchError::RepoNotFound) if page == 1 => {
                return Err(ScanError::RepoNotFound {
                    repo: repo.to_string(),
                });
            }
            Err(source) => {
                return Err(ScanError::Fetch {
                    repo: repo.to_string(),
                    source,
                });
            }
        };

        let raw_len = records.len();
        let issues: Vec<Issue> = records
            .into_iter()
            .filter(|record| !record.is_pull_request)
            .map(|record| record.into_issue(repo))
            .collect();

        // Write-through before requesting the next page: partial progress
        // survives a later failure.
        if !issues.is_empty() {
            store.upsert_issues(repo, &issues).await?;
            issues_fetched += issues.len() as i64;
        }

        // A short raw page means upstream is exhausted; a page that filters
        // down to nothing means there is no issue content left to walk.
        if issues.is_empty() || raw_len < PAGE_SIZE as usize {
            break;
        }
    }

    // Recompute from the store, not the in-loop tally: incremental scans add
    // to a pre-existing count.
    let total_issues = store.count_issues(repo).await?;
    let now = Utc::now();

    store
        .put_scan_state(&ScanState {
            repo: repo.to_string(),
            last_scanned_at: now,
            total_issues,
        })
        .await?;

    let new_fetched = total_issues - before_count;
    let status = if baseline.is_none() {
        ScanStatus::FirstScan
    } else if new_fetched > 0 {
        ScanStatus::Updated
    } else {
        ScanStatus::NoChanges
    };

    Ok(ScanSummary {
        repo: repo.to_string(),
        status,
        new_fetched,
        issues_fetched,
        last_scanned_at: now,
    })
}
