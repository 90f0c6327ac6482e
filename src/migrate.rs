use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create issues table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issues (
            repo TEXT NOT NULL,
            id INTEGER NOT NULL,
            number INTEGER NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (repo, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create scan_state table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_state (
            repo TEXT PRIMARY KEY,
            last_scanned_at INTEGER NOT NULL,
            total_issues INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Index for the context builder's newest-first read path
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issues_repo_created ON issues(repo, created_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
