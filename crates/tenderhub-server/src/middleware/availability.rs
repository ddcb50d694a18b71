//! Availability gating for routes that need the full tender set
//!
//! The tender endpoints are not useful until the initial ingestion has
//! finished, so they answer `503 Service Unavailable` with a `Retry-After`
//! estimate until the published remaining time reaches zero. A failed
//! ingestion run is reported distinctly: the data will stay incomplete for
//! the rest of the process lifetime, so no retry hint is given.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::ErrorResponse;
use crate::ingest::{IngestState, ProgressReceiver};

/// Reject requests until the ingestion estimate reaches zero.
pub async fn require_ingest_complete(
    State(progress): State<ProgressReceiver>,
    request: Request,
    next: Next,
) -> Response {
    let snapshot = *progress.borrow();

    if snapshot.state == IngestState::Failed {
        let error = ErrorResponse::new(
            "INGEST_FAILED",
            "Tender ingestion failed; the data set is incomplete",
        );
        return (StatusCode::SERVICE_UNAVAILABLE, Json(error)).into_response();
    }

    if !snapshot.ready() {
        let error = ErrorResponse::new(
            "LOADING",
            "Tenders are still being loaded - please retry shortly",
        );
        let mut response = (StatusCode::SERVICE_UNAVAILABLE, Json(error)).into_response();
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from(snapshot.remaining.as_secs()),
        );
        return response;
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{progress_channel, ProgressSnapshot};
    use axum::{body::Body, routing::get, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    fn gated_app(progress: ProgressReceiver) -> Router {
        Router::new()
            .route("/probe", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                progress,
                require_ingest_complete,
            ))
    }

    async fn probe(app: Router) -> axum::http::Response<Body> {
        app.oneshot(
            Request::builder()
                .uri("/probe")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn blocks_with_retry_after_while_loading() {
        let (publisher, receiver) = progress_channel();
        publisher.publish(ProgressSnapshot {
            state: IngestState::Running,
            remaining: Duration::from_secs(42),
        });

        let response = probe(gated_app(receiver)).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from(42u64)
        );
    }

    #[tokio::test]
    async fn blocks_before_first_estimate() {
        let (_publisher, receiver) = progress_channel();

        let response = probe(gated_app(receiver)).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn passes_through_once_complete() {
        let (publisher, receiver) = progress_channel();
        publisher.publish(ProgressSnapshot {
            state: IngestState::Completed,
            remaining: Duration::ZERO,
        });

        let response = probe(gated_app(receiver)).await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn failed_ingestion_blocks_without_retry_hint() {
        let (publisher, receiver) = progress_channel();
        publisher.publish(ProgressSnapshot {
            state: IngestState::Failed,
            remaining: Duration::from_secs(10),
        });

        let response = probe(gated_app(receiver)).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!response.headers().contains_key(header::RETRY_AFTER));
    }
}
