//! Read operations for the tenders slice

pub mod filter;
pub mod get;
pub mod list;

pub use filter::SortField;
pub use get::{GetTenderError, GetTenderQuery};
pub use list::{ListTendersError, ListTendersQuery, ListTendersResponse};
