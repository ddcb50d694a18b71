//! Background tender downloader
//!
//! One long-lived task per process, spawned at startup: fetches source
//! pages two at a time, merges each combined batch through the writer, and
//! republishes the remaining-time estimate until the configured target is
//! reached or cancellation is requested.
//!
//! Failure policy is fail-stop: any fetch or merge error ends the task in
//! the `Failed` state for the rest of the process lifetime; nothing is
//! retried. Cancellation is cooperative — it is honored at the top of the
//! loop, so an in-flight fetch/merge step runs to completion first.

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::progress::{IngestState, ProgressEstimator, ProgressPublisher, ProgressSnapshot};
use super::source::{RawTender, TendersClient};
use super::writer::save_batch;
use crate::config::IngestConfig;

/// How a download run ended, short of an error
#[derive(Debug, PartialEq, Eq)]
enum RunEnd {
    /// The target count was reached (or already met at startup)
    Completed,
    /// The source ran out of records before the target
    Exhausted,
    /// Cancellation was requested
    Cancelled,
}

/// The ingestion scheduler
pub struct TenderDownloader {
    pool: PgPool,
    client: TendersClient,
    config: IngestConfig,
    progress: ProgressPublisher,
}

impl TenderDownloader {
    pub fn new(
        pool: PgPool,
        client: TendersClient,
        config: IngestConfig,
        progress: ProgressPublisher,
    ) -> Self {
        Self {
            pool,
            client,
            config,
            progress,
        }
    }

    /// Spawn the download loop as a supervised background task.
    ///
    /// The task publishes its terminal state through the progress channel;
    /// the returned handle resolves once the task has ended.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("tender downloader started");
            self.progress.publish_state(IngestState::Running);

            match self.run(&cancel).await {
                Ok(RunEnd::Completed) | Ok(RunEnd::Exhausted) => {
                    self.progress.publish(ProgressSnapshot {
                        state: IngestState::Completed,
                        remaining: std::time::Duration::ZERO,
                    });
                },
                Ok(RunEnd::Cancelled) => {
                    info!("tender downloader stopped as requested");
                    self.progress.publish_state(IngestState::Cancelled);
                },
                Err(e) => {
                    error!(error = ?e, "tender download failed; no further ingestion this run");
                    self.progress.publish_state(IngestState::Failed);
                },
            }
        })
    }

    async fn run(&self, cancel: &CancellationToken) -> anyhow::Result<RunEnd> {
        let target = self.config.target_count();
        let page_size = u64::from(self.config.page_size);

        // Baseline taken once; overlapping pages are handled by the
        // writer's skip policy, not by re-counting.
        let already_loaded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenders")
            .fetch_one(&self.pool)
            .await?;
        let already_loaded = u64::try_from(already_loaded).unwrap_or(0);
        info!(already_loaded, target, "starting tender download");

        let estimator = ProgressEstimator::new(target, already_loaded);
        let mut loaded_so_far: u64 = 0;

        while already_loaded + loaded_so_far < target {
            if cancel.is_cancelled() {
                return Ok(RunEnd::Cancelled);
            }

            let next_page = next_page_index(already_loaded + loaded_so_far, page_size);

            // Two consecutive pages, fetched concurrently; a fixed
            // throughput choice, not adaptive
            let (first, second) = tokio::try_join!(
                self.client.fetch_page(next_page),
                self.client.fetch_page(next_page + 1),
            )?;

            let batch: Vec<RawTender> =
                first.data.into_iter().chain(second.data).collect();
            if batch.is_empty() {
                warn!(page = next_page, "source exhausted before reaching target");
                return Ok(RunEnd::Exhausted);
            }

            // Counted as returned by the source, not as inserted
            let fetched = batch.len() as u64;
            let plan = save_batch(&self.pool, &batch).await?;
            loaded_so_far += fetched;

            let remaining = estimator.remaining(loaded_so_far);
            self.progress.publish(ProgressSnapshot {
                state: IngestState::Running,
                remaining,
            });

            debug!(
                loaded = already_loaded + loaded_so_far,
                inserted = plan.tenders.len(),
                skipped = plan.skipped_tenders,
                remaining_secs = remaining.as_secs(),
                "batch merged"
            );
        }

        info!(
            tenders = already_loaded + loaded_so_far,
            "downloaded all wanted tenders"
        );
        Ok(RunEnd::Completed)
    }
}

/// Page index of the next fetch, 1-based.
fn next_page_index(loaded_count: u64, page_size: u64) -> u32 {
    (1 + loaded_count / page_size.max(1)) as u32
}
