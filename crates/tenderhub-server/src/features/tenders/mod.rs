//! Tender read API
//!
//! Serves the tender records accumulated by the background ingestion task:
//! a filtered, sorted, paginated listing and a single-record lookup. This
//! slice never writes; rows are created exclusively by [`crate::ingest`].

pub mod queries;
pub mod read_model;
pub mod routes;

pub use read_model::{SupplierReadModel, TenderReadModel};
pub use routes::tenders_routes;
