//! Tenderhub Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared infrastructure for the tenderhub workspace:
//!
//! - **Error Handling**: the [`CommonError`] type and [`Result`] alias
//! - **Logging**: `tracing`-based logging configuration and initialization
//!
//! # Example
//!
//! ```no_run
//! use tenderhub_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> tenderhub_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
