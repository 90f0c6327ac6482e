//! Bounded context-window builder.
//!
//! Renders a repository's cached issues into a deterministic, size-bounded
//! text buffer suitable as a language-model prompt fragment. Newest-created
//! issues come first (recency stands in for relevance), each as a fixed
//! fragment of number, title, and a denoised body snippet. Fragments are
//! appended whole until the next one would push the buffer past the
//! character budget; completeness is traded for predictable prompt cost.
//!
//! The budget counts characters, not tokens (roughly 3-4 characters per
//! token for common tokenizers), an approximation chosen for simplicity.

use thiserror::Error;

use crate::models::Issue;
use crate::store::IssueStore;

/// Total character budget for the assembled buffer.
pub const CONTEXT_BUDGET: usize = 12_000;

/// Body snippet length per issue, in characters.
pub const BODY_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ContextError {
    /// No cached issues for the repository; the caller must scan first.
    #[error("no cached issues for {repo}; run a scan first")]
    NoCachedIssues { repo: String },

    #[error("storage error")]
    Store(#[from] sqlx::Error),
}

/// Build the bounded context buffer for `repo`.
///
/// Every included fragment is complete: truncation only ever happens at
/// the body-snippet level, never mid-fragment. The buffer may be smaller
/// than the budget (small corpus) or cover only a prefix of the corpus
/// (large corpus); both are normal.
pub async fn build_context(store: &IssueStore, repo: &str) -> Result<String, ContextError> {
    let issues = store.get_issues(repo).await?;
    if issues.is_empty() {
        return Err(ContextError::NoCachedIssues {
            repo: repo.to_string(),
        });
    }

    let mut buffer = String::new();
    let mut used_chars = 0usize;

    for issue in &issues {
        let fragment = render_fragment(issue);
        let fragment_chars = fragment.chars().count();
        if used_chars + fragment_chars > CONTEXT_BUDGET {
            break;
        }
        buffer.push_str(&fragment);
        used_chars += fragment_chars;
    }

    Ok(buffer)
}

/// Render one issue as a context fragment: number, title, body snippet.
fn render_fragment(issue: &Issue) -> String {
    format!(
        "#{} {}\n{}\n\n",
        issue.number,
        issue.title,
        snippet(&issue.body)
    )
}

/// Collapse internal whitespace runs to single spaces and truncate to the
/// first [`BODY_SNIPPET_CHARS`] characters.
fn snippet(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(BODY_SNIPPET_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn issue(number: i64, title: &str, body: &str) -> Issue {
        Issue {
            repo: "acme/app".to_string(),
            id: number,
            number,
            title: title.to_string(),
            body: body.to_string(),
            url: format!("https://github.com/acme/app/issues/{}", number),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_snippet_collapses_whitespace() {
        assert_eq!(
            snippet("line one\n\nline   two\t\tend"),
            "line one line two end"
        );
    }

    #[test]
    fn test_snippet_truncates_at_200_chars() {
        let body = "word ".repeat(100);
        let s = snippet(&body);
        assert_eq!(s.chars().count(), BODY_SNIPPET_CHARS);
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let body = "é".repeat(300);
        let s = snippet(&body);
        assert_eq!(s.chars().count(), BODY_SNIPPET_CHARS);
    }

    #[test]
    fn test_fragment_shape() {
        let fragment = render_fragment(&issue(42, "Panic in parser", "some\nbody  text"));
        assert_eq!(fragment, "#42 Panic in parser\nsome body text\n\n");
    }

    #[test]
    fn test_empty_body_fragment() {
        let fragment = render_fragment(&issue(7, "No body", ""));
        assert_eq!(fragment, "#7 No body\n\n\n");
    }
}
