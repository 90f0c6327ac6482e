//! Scan engine behavior against a simulated upstream.
//!
//! Each test gets an isolated temp-file database and an in-memory fake
//! issue source, so nothing here touches the network.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

use issue_lens::github::{FetchError, IssueSource, RemoteIssue};
use issue_lens::models::{Issue, ScanStatus};
use issue_lens::scan::{run_scan, ScanError, MAX_PAGES, PAGE_SIZE};
use issue_lens::store::IssueStore;
use issue_lens::{db, migrate};

async fn temp_store() -> (TempDir, IssueStore) {
    let tmp = TempDir::new().unwrap();
    let pool = db::connect(&tmp.path().join("ilens.sqlite")).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    (tmp, IssueStore::new(pool))
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Build a remote record; `id` doubles as the issue number and offsets the
/// creation time so every issue has a distinct second-resolution timestamp.
fn remote_issue(id: i64, created_at: DateTime<Utc>) -> RemoteIssue {
    RemoteIssue {
        id,
        number: id,
        title: format!("Issue {}", id),
        body: format!("Body of issue {}", id),
        url: format!("https://github.com/acme/app/issues/{}", id),
        created_at,
        is_pull_request: false,
    }
}

/// Newest-created-first corpus of `count` plain issues.
fn corpus(count: i64) -> Vec<RemoteIssue> {
    (0..count)
        .map(|i| remote_issue(count - i, base_time() - Duration::seconds(i)))
        .collect()
}

/// Simulated upstream serving a fixed corpus, newest-created first.
///
/// Mirrors the real API's paging: `since` bounds results from below, pages
/// are `per_page`-sized slices. Counts requests so tests can assert how
/// many round-trips a scan performed.
struct FakeSource {
    corpus: Vec<RemoteIssue>,
    requests: AtomicU32,
    /// When false, `since` is ignored, modeling upstream re-sending records
    /// the cache already holds.
    honor_since: bool,
}

impl FakeSource {
    fn new(corpus: Vec<RemoteIssue>) -> Self {
        Self {
            corpus,
            requests: AtomicU32::new(0),
            honor_since: true,
        }
    }

    fn requests(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueSource for FakeSource {
    async fn fetch_page(
        &self,
        _repo: &str,
        page: u32,
        per_page: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteIssue>, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let bounded: Vec<RemoteIssue> = self
            .corpus
            .iter()
            .filter(|record| match since {
                Some(since) if self.honor_since => record.created_at > since,
                _ => true,
            })
            .cloned()
            .collect();

        let start = ((page - 1) * per_page) as usize;
        Ok(bounded
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect())
    }
}

/// Upstream that 404s every request.
struct NotFoundSource;

#[async_trait]
impl IssueSource for NotFoundSource {
    async fn fetch_page(
        &self,
        _repo: &str,
        _page: u32,
        _per_page: u32,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteIssue>, FetchError> {
        Err(FetchError::RepoNotFound)
    }
}

/// Upstream that serves pages from the corpus until `fail_from_page`, then
/// returns a server error.
struct FlakySource {
    inner: FakeSource,
    fail_from_page: u32,
}

#[async_trait]
impl IssueSource for FlakySource {
    async fn fetch_page(
        &self,
        repo: &str,
        page: u32,
        per_page: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteIssue>, FetchError> {
        if page >= self.fail_from_page {
            return Err(FetchError::Status {
                status: 500,
                body: "upstream exploded".to_string(),
            });
        }
        self.inner.fetch_page(repo, page, per_page, since).await
    }
}

#[tokio::test]
async fn test_first_scan_paginates_until_exhaustion() {
    let (_tmp, store) = temp_store().await;
    let source = FakeSource::new(corpus(250));

    let summary = run_scan(&store, &source, "acme/app").await.unwrap();

    // 100 + 100 + 50: the short third page terminates the walk.
    assert_eq!(source.requests(), 3);
    assert_eq!(summary.status, ScanStatus::FirstScan);
    assert_eq!(summary.issues_fetched, 250);
    assert_eq!(summary.new_fetched, 250);
    assert_eq!(store.count_issues("acme/app").await.unwrap(), 250);

    let state = store.get_scan_state("acme/app").await.unwrap().unwrap();
    assert_eq!(state.total_issues, 250);
}

#[tokio::test]
async fn test_first_scan_of_empty_repo_records_state() {
    let (_tmp, store) = temp_store().await;
    let source = FakeSource::new(Vec::new());

    let summary = run_scan(&store, &source, "acme/empty").await.unwrap();

    assert_eq!(summary.status, ScanStatus::FirstScan);
    assert_eq!(summary.issues_fetched, 0);
    assert_eq!(summary.new_fetched, 0);

    let state = store.get_scan_state("acme/empty").await.unwrap().unwrap();
    assert_eq!(state.total_issues, 0);
}

#[tokio::test]
async fn test_incremental_scan_converges() {
    let (_tmp, store) = temp_store().await;

    // First pass caches 20 issues created at/before the baseline.
    let mut all = corpus(20);
    let source = FakeSource::new(all.clone());
    let first = run_scan(&store, &source, "acme/app").await.unwrap();
    assert_eq!(first.status, ScanStatus::FirstScan);

    // Five new issues appear after the baseline timestamp.
    let baseline = store
        .get_scan_state("acme/app")
        .await
        .unwrap()
        .unwrap()
        .last_scanned_at;
    for i in 1..=5 {
        all.insert(0, remote_issue(100 + i, baseline + Duration::seconds(i)));
    }

    let source = FakeSource::new(all);
    let second = run_scan(&store, &source, "acme/app").await.unwrap();

    assert_eq!(second.status, ScanStatus::Updated);
    assert_eq!(second.new_fetched, 5);
    assert_eq!(second.issues_fetched, 5);
    assert_eq!(store.count_issues("acme/app").await.unwrap(), 25);
}

#[tokio::test]
async fn test_no_change_scan_still_advances_timestamp() {
    let (_tmp, store) = temp_store().await;
    let source = FakeSource::new(corpus(10));

    let first = run_scan(&store, &source, "acme/app").await.unwrap();
    assert_eq!(first.status, ScanStatus::FirstScan);
    let first_state = store.get_scan_state("acme/app").await.unwrap().unwrap();

    // Timestamps persist at second resolution; make sure the clock moves.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let second = run_scan(&store, &source, "acme/app").await.unwrap();
    assert_eq!(second.status, ScanStatus::NoChanges);
    assert_eq!(second.new_fetched, 0);

    let second_state = store.get_scan_state("acme/app").await.unwrap().unwrap();
    assert!(second_state.last_scanned_at > first_state.last_scanned_at);
    assert_eq!(second_state.total_issues, 10);
}

#[tokio::test]
async fn test_pull_requests_are_excluded() {
    let (_tmp, store) = temp_store().await;

    let mut records = corpus(10);
    for record in records.iter_mut().take(3) {
        record.is_pull_request = true;
    }
    let source = FakeSource::new(records);

    let summary = run_scan(&store, &source, "acme/app").await.unwrap();

    assert_eq!(summary.issues_fetched, 7);
    assert_eq!(summary.new_fetched, 7);
    assert_eq!(store.count_issues("acme/app").await.unwrap(), 7);
}

#[tokio::test]
async fn test_page_cap_bounds_one_invocation() {
    let (_tmp, store) = temp_store().await;
    let source = FakeSource::new(corpus(1_500));

    let summary = run_scan(&store, &source, "acme/huge").await.unwrap();

    assert_eq!(source.requests(), MAX_PAGES);
    let cap = (MAX_PAGES * PAGE_SIZE) as i64;
    assert_eq!(summary.issues_fetched, cap);
    assert_eq!(store.count_issues("acme/huge").await.unwrap(), cap);
}

#[tokio::test]
async fn test_reupserted_rows_are_fetched_but_not_new() {
    let (_tmp, store) = temp_store().await;

    let old = corpus(3);
    let source = FakeSource::new(old.clone());
    run_scan(&store, &source, "acme/app").await.unwrap();

    // Upstream re-sends the cached rows alongside two genuinely new ones
    // (its `since` filter keys on update time, not creation time).
    let mut resent = vec![
        remote_issue(201, base_time() + Duration::seconds(20)),
        remote_issue(202, base_time() + Duration::seconds(10)),
    ];
    resent.extend(old);
    let mut source = FakeSource::new(resent);
    source.honor_since = false;

    let summary = run_scan(&store, &source, "acme/app").await.unwrap();

    assert_eq!(summary.status, ScanStatus::Updated);
    assert_eq!(summary.issues_fetched, 5);
    assert_eq!(summary.new_fetched, 2);
    assert_eq!(store.count_issues("acme/app").await.unwrap(), 5);
}

#[tokio::test]
async fn test_idempotent_upsert_keeps_rows_stable() {
    let (_tmp, store) = temp_store().await;

    let issues: Vec<Issue> = corpus(5)
        .into_iter()
        .map(|record| record.into_issue("acme/app"))
        .collect();

    store.upsert_issues("acme/app", &issues).await.unwrap();
    let before = store.get_issues("acme/app").await.unwrap();

    store.upsert_issues("acme/app", &issues).await.unwrap();
    store.upsert_issues("acme/app", &issues).await.unwrap();
    let after = store.get_issues("acme/app").await.unwrap();

    assert_eq!(store.count_issues("acme/app").await.unwrap(), 5);
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(after.iter()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.number, b.number);
        assert_eq!(a.title, b.title);
        assert_eq!(a.body, b.body);
        assert_eq!(a.url, b.url);
        assert_eq!(a.created_at, b.created_at);
    }
}

#[tokio::test]
async fn test_unknown_repository_writes_nothing() {
    let (_tmp, store) = temp_store().await;

    let err = run_scan(&store, &NotFoundSource, "acme/ghost")
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::RepoNotFound { .. }));
    assert_eq!(store.count_issues("acme/ghost").await.unwrap(), 0);
    assert!(store.get_scan_state("acme/ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_transport_failure_keeps_committed_pages() {
    let (_tmp, store) = temp_store().await;

    let source = FlakySource {
        inner: FakeSource::new(corpus(250)),
        fail_from_page: 2,
    };

    let err = run_scan(&store, &source, "acme/app").await.unwrap_err();
    assert!(matches!(err, ScanError::Fetch { .. }));

    // Page 1 was written through before the failure; no scan state exists,
    // so the next scan replays from scratch, safely, via idempotent upsert.
    assert_eq!(store.count_issues("acme/app").await.unwrap(), 100);
    assert!(store.get_scan_state("acme/app").await.unwrap().is_none());

    let source = FakeSource::new(corpus(250));
    let retry = run_scan(&store, &source, "acme/app").await.unwrap();
    assert_eq!(retry.status, ScanStatus::FirstScan);
    assert_eq!(store.count_issues("acme/app").await.unwrap(), 250);
    assert_eq!(retry.new_fetched, 150);
}
