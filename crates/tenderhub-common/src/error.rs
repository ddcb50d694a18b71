//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for tenderhub operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised by shared infrastructure
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
