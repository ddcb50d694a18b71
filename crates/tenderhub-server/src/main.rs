//! Tenderhub Server - Main entry point

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, routing::get, Json, Router};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, time::Duration};
use tenderhub_common::logging::{init_logging, LogConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tracing::info;

use tenderhub_server::{
    config::Config,
    features,
    ingest::{self, IngestState, ProgressSnapshot, TenderDownloader, TendersClient},
    middleware,
};

/// Application state shared across the root handlers
#[derive(Clone)]
struct AppState {
    db: sqlx::PgPool,
    progress: ingest::ProgressReceiver,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; environment variables take precedence over the
    // baked-in defaults
    let log_config = LogConfig::from_env()
        .unwrap_or_default()
        .with_file_prefix("tenderhub-server");
    let log_config = if log_config.filter_directives.is_some() {
        log_config
    } else {
        log_config.with_filter_directives("tenderhub_server=debug,tower_http=debug,sqlx=info")
    };
    init_logging(&log_config)?;

    info!("Starting tenderhub server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    info!("Database connection pool established");

    // Run migrations
    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    // Start the tender downloader; the receiver side of the progress
    // channel feeds the availability gate
    let (progress_publisher, progress) = ingest::progress_channel();
    let cancel = CancellationToken::new();

    let downloader_handle = if config.ingest.enabled {
        let client = TendersClient::new(config.ingest.source_base_url.clone());
        let downloader = TenderDownloader::new(
            db_pool.clone(),
            client,
            config.ingest.clone(),
            progress_publisher,
        );
        info!(
            target_count = config.ingest.target_count(),
            "Tender downloader starting"
        );
        Some(downloader.spawn(cancel.clone()))
    } else {
        // With ingestion off the gate must not hold requests forever
        info!("Ingestion is disabled (INGEST_ENABLED=false)");
        progress_publisher.publish(ProgressSnapshot {
            state: IngestState::Idle,
            remaining: Duration::ZERO,
        });
        None
    };

    // Build the application router
    let state = AppState {
        db: db_pool.clone(),
        progress,
    };
    let app = create_router(state, &config);

    // Create socket address
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    // Stop the downloader cooperatively; an in-flight batch completes first
    cancel.cancel();
    if let Some(handle) = downloader_handle {
        if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
            tracing::warn!("Tender downloader did not stop within 5s, detaching");
        }
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        db: state.db.clone(),
        progress: state.progress.clone(),
    };

    let feature_routes = features::router(feature_state);

    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
        .nest("/api/v1", feature_routes)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
///
/// Reports database connectivity and the ingestion task's observable
/// state, so "still loading", "done", and "permanently stalled" can be
/// told apart without waiting on the tender endpoints.
async fn health_check(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let snapshot = *state.progress.borrow();

    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "ingest": {
                    "state": snapshot.state,
                    "remaining_secs": snapshot.remaining.as_secs(),
                }
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give ongoing requests time to complete
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
