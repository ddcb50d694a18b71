//! End-to-end tests for the background tender downloader
//!
//! The external source is a wiremock server; the store is the per-test
//! database provided by `#[sqlx::test]`.

mod common;

use sqlx::PgPool;
use tenderhub_server::config::IngestConfig;
use tenderhub_server::ingest::{
    progress_channel, save_batch, IngestState, TenderDownloader, TendersClient,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{page_json, raw_tender};

fn ingest_config(base_url: &str, total_pages: u32, page_size: u32) -> IngestConfig {
    IngestConfig {
        enabled: true,
        source_base_url: base_url.to_string(),
        total_pages,
        page_size,
    }
}

async fn mount_page(server: &MockServer, page: u32, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/tenders"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[sqlx::test(migrations = "../../migrations")]
async fn downloader_reaches_target_and_completes(pool: PgPool) -> sqlx::Result<()> {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        page_json(&[
            raw_tender("T0001", 1, "100.00", &[7]),
            raw_tender("T0002", 2, "200.00", &[7]),
        ]),
    )
    .await;
    mount_page(
        &server,
        2,
        page_json(&[
            raw_tender("T0003", 3, "300.00", &[8]),
            raw_tender("T0004", 4, "400.00", &[]),
        ]),
    )
    .await;

    let (publisher, progress) = progress_channel();
    let downloader = TenderDownloader::new(
        pool.clone(),
        TendersClient::new(server.uri()),
        ingest_config(&server.uri(), 2, 2),
        publisher,
    );

    downloader.spawn(CancellationToken::new()).await.unwrap();

    let snapshot = *progress.borrow();
    assert_eq!(snapshot.state, IngestState::Completed);
    assert!(snapshot.ready());

    let tenders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenders")
        .fetch_one(&pool)
        .await?;
    assert_eq!(tenders, 4);
    let suppliers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
        .fetch_one(&pool)
        .await?;
    assert_eq!(suppliers, 2);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn downloader_resumes_from_the_persisted_count(pool: PgPool) -> sqlx::Result<()> {
    // Page 1 is already persisted from an earlier run
    save_batch(
        &pool,
        &[
            raw_tender("T0001", 1, "100.00", &[7]),
            raw_tender("T0002", 2, "200.00", &[7]),
        ],
    )
    .await
    .unwrap();

    let server = MockServer::start().await;
    // The loop starts at page 2 and also looks one page ahead
    mount_page(
        &server,
        2,
        page_json(&[
            raw_tender("T0003", 3, "300.00", &[7]),
            raw_tender("T0004", 4, "400.00", &[9]),
        ]),
    )
    .await;
    mount_page(&server, 3, page_json(&[])).await;

    let (publisher, progress) = progress_channel();
    let downloader = TenderDownloader::new(
        pool.clone(),
        TendersClient::new(server.uri()),
        ingest_config(&server.uri(), 2, 2),
        publisher,
    );

    downloader.spawn(CancellationToken::new()).await.unwrap();

    assert_eq!(progress.borrow().state, IngestState::Completed);

    let tenders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenders")
        .fetch_one(&pool)
        .await?;
    assert_eq!(tenders, 4);
    // Supplier 7 was cited by both runs and still has exactly one row
    let supplier_7: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers WHERE id = 7")
        .fetch_one(&pool)
        .await?;
    assert_eq!(supplier_7, 1);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn exhausted_source_stops_and_clears_the_gate(pool: PgPool) -> sqlx::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, 1, page_json(&[raw_tender("T0001", 1, "100.00", &[])])).await;
    mount_page(&server, 2, page_json(&[])).await;
    mount_page(&server, 3, page_json(&[])).await;

    let (publisher, progress) = progress_channel();
    let downloader = TenderDownloader::new(
        pool.clone(),
        TendersClient::new(server.uri()),
        // Wants 10 records, the source only has one
        ingest_config(&server.uri(), 5, 2),
        publisher,
    );

    downloader.spawn(CancellationToken::new()).await.unwrap();

    let snapshot = *progress.borrow();
    assert_eq!(snapshot.state, IngestState::Completed);
    assert!(snapshot.ready());

    let tenders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenders")
        .fetch_one(&pool)
        .await?;
    assert_eq!(tenders, 1);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn cancellation_is_an_expected_stop(pool: PgPool) -> sqlx::Result<()> {
    let (publisher, progress) = progress_channel();
    let downloader = TenderDownloader::new(
        pool.clone(),
        // Never contacted: the loop observes the token before fetching
        TendersClient::new("http://127.0.0.1:1"),
        ingest_config("http://127.0.0.1:1", 1, 1),
        publisher,
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    downloader.spawn(cancel).await.unwrap();

    let snapshot = *progress.borrow();
    assert_eq!(snapshot.state, IngestState::Cancelled);
    // Cancelled is not completed: the gate stays closed
    assert!(!snapshot.ready());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_failure_ends_the_run_in_failed_state(pool: PgPool) -> sqlx::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenders"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (publisher, progress) = progress_channel();
    let downloader = TenderDownloader::new(
        pool.clone(),
        TendersClient::new(server.uri()),
        ingest_config(&server.uri(), 1, 1),
        publisher,
    );

    downloader.spawn(CancellationToken::new()).await.unwrap();

    assert_eq!(progress.borrow().state, IngestState::Failed);
    let tenders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenders")
        .fetch_one(&pool)
        .await?;
    assert_eq!(tenders, 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn malformed_monetary_value_fails_the_batch_and_the_run(pool: PgPool) -> sqlx::Result<()> {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        page_json(&[raw_tender("T0001", 1, "1.234,56", &[])]),
    )
    .await;
    mount_page(&server, 2, page_json(&[])).await;

    let (publisher, progress) = progress_channel();
    let downloader = TenderDownloader::new(
        pool.clone(),
        TendersClient::new(server.uri()),
        ingest_config(&server.uri(), 1, 1),
        publisher,
    );

    downloader.spawn(CancellationToken::new()).await.unwrap();

    assert_eq!(progress.borrow().state, IngestState::Failed);
    // The batch aborted uncommitted
    let tenders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenders")
        .fetch_one(&pool)
        .await?;
    assert_eq!(tenders, 0);
    Ok(())
}
