//! Database statistics and health overview.
//!
//! Quick summary of what's cached: total issue counts and a per-repository
//! breakdown with last-scan recency. Used by `ilens stats` to give
//! confidence that scans are landing where expected.

use anyhow::Result;
use std::path::Path;

use crate::store::IssueStore;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(store: &IssueStore, db_path: &Path) -> Result<()> {
    let total_issues: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM issues")
        .fetch_one(store.pool())
        .await?;

    let db_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    println!("issue-lens — Database Stats");
    println!("===========================");
    println!();
    println!("  Database:    {}", db_path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Issues:      {}", total_issues);

    let states = store.list_scan_states().await?;
    if !states.is_empty() {
        println!();
        println!("  By repository:");
        println!("  {:<32} {:>8}   {}", "REPOSITORY", "ISSUES", "LAST SCAN");
        println!("  {}", "-".repeat(60));

        for state in &states {
            println!(
                "  {:<32} {:>8}   {}",
                state.repo,
                state.total_issues,
                format_ts_relative(state.last_scanned_at.timestamp())
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
