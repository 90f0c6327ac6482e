//! JSON HTTP server.
//!
//! Exposes scanning and analysis over a small API plus an embedded
//! single-page UI at `/`. Request validation happens here; malformed
//! requests never reach the scan engine or context builder.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/scan` | Scan a repository's open issues into the cache |
//! | `POST` | `/api/analyze` | Ask the local model a question about cached issues |
//! | `GET`  | `/api/repos` | List cached repositories and their scan state |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/` | Embedded UI |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "repository not found: acme/app" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `upstream_error`
//! (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients can
//! call the API directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::analyze::run_analyze;
use crate::config::Config;
use crate::context::ContextError;
use crate::github::{valid_repo_slug, GithubClient};
use crate::llm::LlmClient;
use crate::models::ScanSummary;
use crate::scan::{run_scan, ScanError};
use crate::store::IssueStore;
use crate::{db, migrate};

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor. The store handle is built once at startup and injected here,
/// so request paths never re-establish connections.
#[derive(Clone)]
struct AppState {
    store: IssueStore,
    github: Arc<GithubClient>,
    llm: Arc<LlmClient>,
}

/// Starts the HTTP server.
///
/// Connects the database, runs the idempotent schema migrations, and binds
/// to the address configured in `[server].bind`. Runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;

    let state = AppState {
        store: IssueStore::new(pool),
        github: Arc::new(GithubClient::new(&config.github)?),
        llm: Arc::new(LlmClient::new(&config.llm)?),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_index))
        .route("/api/scan", post(handle_scan))
        .route("/api/analyze", post(handle_analyze))
        .route("/api/repos", get(handle_repos))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("issue-lens listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream_error".to_string(),
        message: message.into(),
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map scan failures to HTTP responses: unknown repository is the caller's
/// problem (404), upstream trouble is a gateway problem (502), storage
/// trouble is ours (500).
fn classify_scan_error(err: ScanError) -> AppError {
    match err {
        ScanError::RepoNotFound { .. } => not_found(err.to_string()),
        ScanError::Fetch { ref source, .. } => {
            upstream_error(format!("{}: {}", err, source))
        }
        ScanError::Store(_) => internal_error(err.to_string()),
    }
}

/// Map analysis failures: an empty cache is a 404 telling the caller to
/// scan first; anything else from the model side is a gateway error.
fn classify_analyze_error(err: anyhow::Error) -> AppError {
    match err.downcast_ref::<ContextError>() {
        Some(ContextError::NoCachedIssues { .. }) => not_found(err.to_string()),
        Some(ContextError::Store(_)) => internal_error(err.to_string()),
        None => upstream_error(err.to_string()),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET / ============

async fn handle_index() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

// ============ POST /api/scan ============

#[derive(Deserialize)]
struct ScanRequest {
    repo: String,
}

/// Handler for `POST /api/scan`.
///
/// Validates the repository slug, runs one scan invocation, and returns
/// the summary: status, counts, and the new freshness timestamp.
async fn handle_scan(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanSummary>, AppError> {
    let repo = request.repo.trim();
    if !valid_repo_slug(repo) {
        return Err(bad_request(format!(
            "repo must be an owner/name slug, got: '{}'",
            request.repo
        )));
    }

    let summary = run_scan(&state.store, state.github.as_ref(), repo)
        .await
        .map_err(classify_scan_error)?;

    Ok(Json(summary))
}

// ============ POST /api/analyze ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    repo: String,
    question: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    analysis: String,
}

/// Handler for `POST /api/analyze`.
///
/// Builds the bounded context for the repository's cached issues and asks
/// the local model the caller's question. Returns 404 with a scan-first
/// message when nothing is cached.
async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let repo = request.repo.trim();
    if !valid_repo_slug(repo) {
        return Err(bad_request(format!(
            "repo must be an owner/name slug, got: '{}'",
            request.repo
        )));
    }
    let question = request.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let analysis = run_analyze(&state.store, &state.llm, repo, question)
        .await
        .map_err(classify_analyze_error)?;

    Ok(Json(AnalyzeResponse { analysis }))
}

// ============ GET /api/repos ============

#[derive(Serialize)]
struct RepoEntry {
    repo: String,
    total_issues: i64,
    last_scanned_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct RepoListResponse {
    repos: Vec<RepoEntry>,
}

/// Handler for `GET /api/repos`: every repository ever scanned, with its
/// cached issue count and last-scan timestamp.
async fn handle_repos(State(state): State<AppState>) -> Result<Json<RepoListResponse>, AppError> {
    let states = state
        .store
        .list_scan_states()
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    let repos = states
        .into_iter()
        .map(|s| RepoEntry {
            repo: s.repo,
            total_issues: s.total_issues,
            last_scanned_at: s.last_scanned_at,
        })
        .collect();

    Ok(Json(RepoListResponse { repos }))
}
