//! Tender API routes
//!
//! Wires the tender queries to axum HTTP handlers.
//!
//! # Route Structure
//!
//! - `GET /api/v1/tenders` - List tenders with filters, sort, and either
//!   offset (`page`) or cursor (`page_after`) pagination
//! - `GET /api/v1/tenders/:id` - Get a single tender by id

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;

use super::queries::{GetTenderError, GetTenderQuery, ListTendersError, ListTendersQuery};
use crate::api::response::{ApiResponse, ErrorResponse};

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the tenders router with all routes configured
pub fn tenders_routes() -> Router<PgPool> {
    Router::new()
        .route("/", get(list_tenders))
        .route("/:id", get(get_tender))
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// List tenders
///
/// # Endpoint
///
/// `GET /api/v1/tenders?page=1&page_size=20&sort_field=date&sort_descending=true`
///
/// # Query Parameters
///
/// - `page` / `page_size` - offset paging (page_size max 100, default 100)
/// - `page_after` - cursor paging; the sort-key value of the previous
///   page's last record (takes precedence over `page`)
/// - `supplier_id`, `date_from`, `date_to`, `awarded_value_in_euro_from`,
///   `awarded_value_in_euro_to` - optional filters, combined with AND
/// - `sort_field` (`id` | `date` | `awarded_value_in_euro`),
///   `sort_descending`
#[tracing::instrument(skip(pool, query))]
async fn list_tenders(
    State(pool): State<PgPool>,
    Query(query): Query<ListTendersQuery>,
) -> Result<Response, TenderApiError> {
    let response = super::queries::list::handle(pool, query).await?;

    let meta = json!({ "pagination": response.pagination });

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success_with_meta(response.items, meta)),
    )
        .into_response())
}

/// Get a single tender by id
///
/// # Endpoint
///
/// `GET /api/v1/tenders/:id`
///
/// # Response
///
/// - `200 OK` - Tender found
/// - `404 Not Found` - No tender with that id
#[tracing::instrument(skip(pool), fields(id = %id))]
async fn get_tender(
    State(pool): State<PgPool>,
    Path(id): Path<String>,
) -> Result<Response, TenderApiError> {
    let response = super::queries::get::handle(pool, GetTenderQuery { id }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for tender API endpoints
#[derive(Debug)]
enum TenderApiError {
    List(ListTendersError),
    Get(GetTenderError),
}

impl From<ListTendersError> for TenderApiError {
    fn from(err: ListTendersError) -> Self {
        Self::List(err)
    }
}

impl From<GetTenderError> for TenderApiError {
    fn from(err: GetTenderError) -> Self {
        Self::Get(err)
    }
}

impl IntoResponse for TenderApiError {
    fn into_response(self) -> Response {
        match self {
            TenderApiError::Get(GetTenderError::NotFound(ref id)) => {
                let error = ErrorResponse::new("NOT_FOUND", format!("Tender '{id}' not found"));
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            TenderApiError::List(ListTendersError::Database(_))
            | TenderApiError::Get(GetTenderError::Database(_)) => {
                tracing::error!("Database error while serving tenders: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for TenderApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(e) => write!(f, "{}", e),
            Self::Get(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = TenderApiError::Get(GetTenderError::NotFound("TX1".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn routes_structure() {
        let router = tenders_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
