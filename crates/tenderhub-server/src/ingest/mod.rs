//! Tender ingestion
//!
//! The write side of tenderhub: a background task pulls paginated records
//! from the external tender source and merges them into the store, while
//! the read API polls the published progress snapshot.
//!
//! # Architecture
//!
//! - **source**: reqwest client for the external source's paged JSON API
//! - **writer**: deduplicating merge of a raw batch into the store, one
//!   transaction per batch
//! - **progress**: remaining-time estimator and the watch-channel snapshot
//!   shared with the availability gate
//! - **downloader**: the fetch→merge→estimate loop, supervised and
//!   cooperatively cancellable

pub mod downloader;
pub mod progress;
pub mod source;
pub mod writer;

pub use downloader::TenderDownloader;
pub use progress::{
    progress_channel, IngestState, ProgressPublisher, ProgressReceiver, ProgressSnapshot,
};
pub use source::{RawAward, RawSupplier, RawTender, SourceError, TendersClient, TendersPage};
pub use writer::{plan_batch, save_batch, BatchPlan, SaveBatchError};
