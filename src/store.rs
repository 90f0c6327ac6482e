//! SQLite-backed issue store.
//!
//! [`IssueStore`] owns the two persisted tables, `issues` and `scan_state`,
//! and is the only component that touches them. The scan engine and context
//! builder go through its methods and never hold a connection or cursor
//! across calls. A single store handle is built at process startup and passed
//! in as a parameter, so tests can substitute an isolated store per test.

use sqlx::{Row, SqlitePool};

use crate::models::{Issue, ScanState};

/// SQLite implementation of the issue store.
///
/// Wraps a [`SqlitePool`] and translates every operation into one or more
/// SQL statements against the `issues` and `scan_state` tables. Cloning is
/// cheap (the pool is reference-counted).
#[derive(Clone)]
pub struct IssueStore {
    pool: SqlitePool,
}

impl IssueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Write all given issues as a single atomic batch.
    ///
    /// Rows already present under the same `(repo, id)` are fully
    /// overwritten. All-or-nothing: a failure partway rolls the whole batch
    /// back. Returns the number of issues written.
    pub async fn upsert_issues(&self, repo: &str, issues: &[Issue]) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for issue in issues {
            sqlx::query(
                r#"
                INSERT INTO issues (repo, id, number, title, body, url, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(repo, id) DO UPDATE SET
                    number = excluded.number,
                    title = excluded.title,
                    body = excluded.body,
                    url = excluded.url,
                    created_at = excluded.created_at
                "#,
            )
            .bind(repo)
            .bind(issue.id)
            .bind(issue.number)
            .bind(&issue.title)
            .bind(&issue.body)
            .bind(&issue.url)
            .bind(issue.created_at.timestamp())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(issues.len() as u64)
    }

    /// Total cached rows for `repo`.
    pub async fn count_issues(&self, repo: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM issues WHERE repo = ?")
            .bind(repo)
            .fetch_one(&self.pool)
            .await
    }

    /// All cached issues for `repo`, newest-created first.
    ///
    /// Ties on `created_at` break by `id` descending so the ordering is
    /// total and the context build deterministic.
    pub async fn get_issues(&self, repo: &str) -> Result<Vec<Issue>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT repo, id, number, title, body, url, created_at
            FROM issues
            WHERE repo = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(repo)
        .fetch_all(&self.pool)
        .await?;

        let issues = rows
            .iter()
            .map(|row| Issue {
                repo: row.get("repo"),
                id: row.get("id"),
                number: row.get("number"),
                title: row.get("title"),
                body: row.get("body"),
                url: row.get("url"),
                created_at: chrono::DateTime::from_timestamp(row.get("created_at"), 0)
                    .unwrap_or(chrono::DateTime::UNIX_EPOCH),
            })
            .collect();

        Ok(issues)
    }

    pub async fn get_scan_state(&self, repo: &str) -> Result<Option<ScanState>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT repo, last_scanned_at, total_issues FROM scan_state WHERE repo = ?",
        )
        .bind(repo)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ScanState {
            repo: row.get("repo"),
            last_scanned_at: chrono::DateTime::from_timestamp(row.get("last_scanned_at"), 0)
                .unwrap_or(chrono::DateTime::UNIX_EPOCH),
            total_issues: row.get("total_issues"),
        }))
    }

    /// Scan state for every repository ever scanned, ordered by slug.
    pub async fn list_scan_states(&self) -> Result<Vec<ScanState>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT repo, last_scanned_at, total_issues FROM scan_state ORDER BY repo",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ScanState {
                repo: row.get("repo"),
                last_scanned_at: chrono::DateTime::from_timestamp(row.get("last_scanned_at"), 0)
                    .unwrap_or(chrono::DateTime::UNIX_EPOCH),
                total_issues: row.get("total_issues"),
            })
            .collect())
    }

    pub async fn put_scan_state(&self, state: &ScanState) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO scan_state (repo, last_scanned_at, total_issues) VALUES (?, ?, ?)
            ON CONFLICT(repo) DO UPDATE SET
                last_scanned_at = excluded.last_scanned_at,
                total_issues = excluded.total_issues
            "#,
        )
        .bind(&state.repo)
        .bind(state.last_scanned_at.timestamp())
        .bind(state.total_issues)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
