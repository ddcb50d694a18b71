//! Feature modules implementing the tenderhub API
//!
//! Each feature is a vertical slice with its own queries and routes. There
//! is a single feature today:
//!
//! - **tenders**: the tender read API (list with filter/sort/pagination,
//!   single lookup)
//!
//! Queries follow the handler pattern: a query struct, a typed error enum,
//! and an async `handle(pool, query)` function wired to axum in the slice's
//! `routes.rs`. The route table is written out explicitly at startup; there
//! is no runtime discovery of handlers.

pub mod shared;
pub mod tenders;

use axum::Router;

use crate::ingest::ProgressReceiver;
use crate::middleware::availability;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: sqlx::PgPool,
    /// Read side of the ingestion progress snapshot
    pub progress: ProgressReceiver,
}

/// Creates the main API router with all feature routes mounted
///
/// The tender routes sit behind the availability gate: they answer 503
/// with a `Retry-After` estimate until the initial ingestion has finished.
pub fn router(state: FeatureState) -> Router<()> {
    let tenders = tenders::tenders_routes()
        .with_state(state.db.clone())
        .layer(axum::middleware::from_fn_with_state(
            state.progress.clone(),
            availability::require_ingest_complete,
        ));

    Router::new().nest("/tenders", tenders)
}
