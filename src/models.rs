//! Core data models used throughout issue-lens.
//!
//! These types represent the cached issues, per-repository scan metadata,
//! and scan results that flow through the scan and analysis pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One cached issue, keyed by `(repo, id)`.
///
/// `id` is the upstream-assigned identifier (stable across edits); `number`
/// is the human-facing sequence number, unique only within `repo`.
#[derive(Debug, Clone)]
pub struct Issue {
    pub repo: String,
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub body: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Per-repository scan metadata. Absent until the first scan completes,
/// overwritten after every completed scan.
#[derive(Debug, Clone)]
pub struct ScanState {
    pub repo: String,
    pub last_scanned_at: DateTime<Utc>,
    pub total_issues: i64,
}

/// Outcome classification for a single scan invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    FirstScan,
    Updated,
    NoChanges,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstScan => "first_scan",
            Self::Updated => "updated",
            Self::NoChanges => "no_changes",
        }
    }
}

/// Result of one scan, surfaced to the CLI and HTTP callers.
///
/// `issues_fetched` counts issues accepted during this pass (fetched and
/// kept past the pull-request filter); `new_fetched` is how many of those
/// were not previously cached.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub repo: String,
    pub status: ScanStatus,
    pub new_fetched: i64,
    pub issues_fetched: i64,
    pub last_scanned_at: DateTime<Utc>,
}
