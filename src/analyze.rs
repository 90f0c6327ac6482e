//! Analysis orchestration.
//!
//! Thin glue between the context builder and the completion client: build
//! the bounded issue context for a repository, wrap it with the system
//! instruction and the caller's question, and return the model's text. The
//! design logic lives in [`crate::context`]; this module only plumbs.

use anyhow::Result;

use crate::context::build_context;
use crate::llm::LlmClient;
use crate::store::IssueStore;

/// Fixed system instruction for issue analysis.
pub const SYSTEM_PROMPT: &str = "You are an assistant that analyzes open issues \
from a software repository. Answer the user's question using only the issue \
context provided. Be concise and reference issue numbers where relevant.";

/// Answer `question` about `repo`'s cached issues.
///
/// Fails with [`crate::context::ContextError::NoCachedIssues`] (inside the
/// anyhow chain, downcastable at the boundary) when nothing has been
/// scanned yet.
pub async fn run_analyze(
    store: &IssueStore,
    llm: &LlmClient,
    repo: &str,
    question: &str,
) -> Result<String> {
    let context = build_context(store, repo).await?;

    let prompt = format!(
        "Open issues for {} (newest first):\n\n{}\nQuestion: {}",
        repo, context, question
    );

    llm.complete(SYSTEM_PROMPT, &prompt).await
}
