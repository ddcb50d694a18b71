//! Tenderhub Server Library
//!
//! HTTP service for public tender award records. The server pulls the
//! records from an external paginated source in a background task, merges
//! them into PostgreSQL with supplier deduplication, and serves the
//! accumulated data through a filtered, sorted, paginated read API.
//!
//! # Architecture
//!
//! - **features**: vertical slices; each query is a struct, a typed error
//!   enum, and an async `handle(pool, query)` function wired to axum routes
//! - **ingest**: the background fetch-and-merge loop, its source client,
//!   merge writer, and progress estimator
//! - **middleware**: CORS, request tracing, and the availability gate that
//!   holds tender requests off with `503` + `Retry-After` until the
//!   initial ingestion completes
//!
//! # Framework Stack
//!
//! - **Axum**: HTTP routing and extraction
//! - **SQLx**: PostgreSQL access and migrations
//! - **Reqwest**: external source client
//! - **Tower / tower-http**: middleware layers
//!
//! # Example
//!
//! ```no_run
//! use tenderhub_server::config::Config;
//!
//! let config = Config::load().unwrap();
//! assert!(config.ingest.target_count() > 0);
//! ```

pub mod api;
pub mod config;
pub mod features;
pub mod ingest;
pub mod middleware;
