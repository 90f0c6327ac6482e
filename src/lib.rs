//! # issue-lens
//!
//! A local-first GitHub issue cache with LLM-backed analysis.
//!
//! issue-lens scans a repository's open issues into a durable SQLite cache
//! and answers natural-language questions about them with a locally hosted
//! language model (Ollama), via a CLI and a small JSON HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │  GitHub API  │──▶│ Scan Engine  │──▶│  SQLite  │
//! │  (paginated) │   │ filter+upsert│   │  cache   │
//! └──────────────┘   └──────────────┘   └────┬─────┘
//!                                            │
//!                       ┌────────────────────┤
//!                       ▼                    ▼
//!                 ┌───────────┐       ┌─────────────┐   ┌────────┐
//!                 │    CLI    │       │    HTTP     │──▶│ Ollama │
//!                 │  (ilens)  │       │ scan/analyze│   │        │
//!                 └───────────┘       └─────────────┘   └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ilens init                              # create database
//! ilens scan rust-lang/rust               # cache open issues
//! ilens analyze rust-lang/rust "what are the common crash reports?"
//! ilens stats                             # what's cached
//! ilens serve                             # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | SQLite-backed issue store |
//! | [`github`] | Paginated upstream issue client |
//! | [`scan`] | Incremental scan engine |
//! | [`context`] | Bounded context-window builder |
//! | [`llm`] | Local completion client |
//! | [`analyze`] | Analysis orchestration |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod analyze;
pub mod config;
pub mod context;
pub mod db;
pub mod github;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod scan;
pub mod server;
pub mod stats;
pub mod store;
